/// Model-free mask classifier based on skin-tone coverage.
///
/// Looks at the lower half of the face crop (nose and mouth). An uncovered
/// face shows mostly skin there; a mask replaces it with fabric. Colors are
/// judged in HSV space so moderate lighting changes don't flip the result.
use crate::classification::domain::face_region::FaceRegion;
use crate::classification::domain::mask_classifier::{ClassificationError, MaskClassifier};
use crate::classification::domain::verdict::Verdict;

/// Skin fraction below which the lower face is considered covered.
pub const DEFAULT_SKIN_THRESHOLD: f64 = 0.35;

const SKIN_HUE_MAX: f64 = 50.0;
const SKIN_HUE_WRAP_MIN: f64 = 340.0;
const SKIN_SAT_MIN: f64 = 0.15;
const SKIN_SAT_MAX: f64 = 0.75;
const SKIN_VALUE_MIN: f64 = 0.2;

pub struct SkinToneMaskClassifier {
    threshold: f64,
}

impl SkinToneMaskClassifier {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.01, 0.99),
        }
    }
}

impl Default for SkinToneMaskClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_SKIN_THRESHOLD)
    }
}

impl MaskClassifier for SkinToneMaskClassifier {
    fn classify(&mut self, region: &FaceRegion) -> Result<Verdict, ClassificationError> {
        let pixels = region.pixels();
        if pixels.channels() != 3 {
            return Err(ClassificationError::Unavailable(format!(
                "expected RGB region, got {} channels",
                pixels.channels()
            )));
        }

        let ratio = lower_face_skin_ratio(pixels.data(), pixels.width(), pixels.height())
            .ok_or_else(|| ClassificationError::Unavailable("empty face region".into()))?;

        let has_mask = ratio < self.threshold;
        // Distance from the decision boundary, scaled to [0, 1] on each side.
        let margin = if has_mask {
            (self.threshold - ratio) / self.threshold
        } else {
            (ratio - self.threshold) / (1.0 - self.threshold)
        };
        Ok(Verdict::new(has_mask, 0.5 + 0.5 * margin.clamp(0.0, 1.0)))
    }
}

/// Fraction of skin-colored pixels in the bottom half of an RGB crop.
fn lower_face_skin_ratio(rgb_data: &[u8], width: u32, height: u32) -> Option<f64> {
    let w = width as usize;
    let h = height as usize;
    let start_row = h / 2;
    if w == 0 || start_row >= h {
        return None;
    }

    let mut skin = 0usize;
    let mut total = 0usize;
    for row in start_row..h {
        for col in 0..w {
            let offset = (row * w + col) * 3;
            let Some(px) = rgb_data.get(offset..offset + 3) else {
                break;
            };
            let (hue, sat, val) = rgb_to_hsv(
                px[0] as f64 / 255.0,
                px[1] as f64 / 255.0,
                px[2] as f64 / 255.0,
            );
            if is_skin(hue, sat, val) {
                skin += 1;
            }
            total += 1;
        }
    }

    (total > 0).then(|| skin as f64 / total as f64)
}

fn is_skin(hue: f64, sat: f64, val: f64) -> bool {
    let hue_ok = hue <= SKIN_HUE_MAX || hue >= SKIN_HUE_WRAP_MIN;
    hue_ok && (SKIN_SAT_MIN..=SKIN_SAT_MAX).contains(&sat) && val >= SKIN_VALUE_MIN
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max > 0.0 { delta / max } else { 0.0 };

    let h = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let h = if h < 0.0 { h + 360.0 } else { h };

    (h, s, v)
}
