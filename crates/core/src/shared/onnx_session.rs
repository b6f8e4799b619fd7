use std::path::Path;

/// Return the preferred ONNX execution providers for the current platform.
///
/// Falls back to CPU if the platform-specific provider is unavailable.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Loads an ONNX model with the platform's preferred providers.
pub fn load_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    if !model_path.exists() {
        return Err(format!("Model not found: {}", model_path.display()).into());
    }
    let session = ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!("Loaded ONNX model {}", model_path.display());
    Ok(session)
}

/// Reads the `(height, width)` of a 4-D image input, in either NCHW or NHWC
/// layout. Returns `None` for dynamic or non-image inputs.
pub fn image_input_shape(session: &ort::session::Session) -> Option<InputLayout> {
    let input = session.inputs().first()?;
    let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() else {
        return None;
    };
    if shape.len() != 4 {
        return None;
    }
    InputLayout::from_dims(shape[1], shape[2], shape[3])
}

/// Channel placement and spatial size of an image model input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputLayout {
    Nchw { height: u32, width: u32 },
    Nhwc { height: u32, width: u32 },
}

impl InputLayout {
    /// Classifies the trailing three dims of a `[N, ?, ?, ?]` shape.
    pub fn from_dims(d1: i64, d2: i64, d3: i64) -> Option<Self> {
        if d1 == 3 && d2 > 0 && d3 > 0 {
            Some(InputLayout::Nchw {
                height: d2 as u32,
                width: d3 as u32,
            })
        } else if d3 == 3 && d1 > 0 && d2 > 0 {
            Some(InputLayout::Nhwc {
                height: d1 as u32,
                width: d2 as u32,
            })
        } else {
            None
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match *self {
            InputLayout::Nchw { width, height } | InputLayout::Nhwc { width, height } => {
                (width, height)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_nchw() {
        assert_eq!(
            InputLayout::from_dims(3, 224, 224),
            Some(InputLayout::Nchw { height: 224, width: 224 })
        );
    }

    #[test]
    fn test_layout_nhwc() {
        assert_eq!(
            InputLayout::from_dims(224, 160, 3),
            Some(InputLayout::Nhwc { height: 224, width: 160 })
        );
        assert_eq!(InputLayout::from_dims(224, 160, 3).unwrap().size(), (160, 224));
    }

    #[test]
    fn test_layout_dynamic_dims_unknown() {
        assert_eq!(InputLayout::from_dims(3, -1, -1), None);
        assert_eq!(InputLayout::from_dims(-1, -1, 3), None);
    }

    #[test]
    fn test_load_session_missing_model() {
        let err = load_session(Path::new("/nonexistent/model.onnx")).unwrap_err();
        assert!(err.to_string().contains("Model not found"));
    }
}
