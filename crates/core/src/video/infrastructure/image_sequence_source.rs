use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Serves a single image, or every image in a directory, as a frame stream.
///
/// Directory entries are sorted by file name and filtered by extension.
/// Images are decoded lazily with the `image` crate and converted to RGB8.
pub struct ImageSequenceSource {
    path: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    opened: bool,
}

impl ImageSequenceSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            files: Vec::new(),
            position: 0,
            opened: false,
        }
    }

    /// Number of images found by the last [`FrameSource::open`].
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_image_path(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.files = if self.path.is_dir() {
            list_images(&self.path)?
        } else if self.path.is_file() {
            vec![self.path.clone()]
        } else {
            return Err(format!("Input not found: {}", self.path.display()).into());
        };
        self.position = 0;
        self.opened = true;
        log::debug!(
            "Opened {} image(s) from {}",
            self.files.len(),
            self.path.display()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if !self.opened {
            return Err("ImageSequenceSource: not opened".into());
        }
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };
        let img = image::open(path)
            .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?
            .into_rgb8();
        let (width, height) = img.dimensions();
        let frame = Frame::new(img.into_raw(), width, height, 3, self.position);
        self.position += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.files.clear();
        self.position = 0;
        self.opened = false;
    }
}
