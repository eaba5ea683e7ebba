use gaze_core::overlay::{DEFAULT_ARROW_LENGTH, DEFAULT_AXIS_LENGTH};
use gaze_core::provider::DEFAULT_INTRA_THREADS;
use gaze_core::DEFAULT_CONFIDENCE_THRESHOLD;
use std::path::PathBuf;

/// CLI configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory containing the six ONNX model files.
    pub model_dir: PathBuf,
    /// Execution device name (`cpu`, `cuda`, `openvino`, `coreml`).
    pub device: String,
    /// V4L2 device path for live mode (default: /dev/video0).
    pub camera_device: String,
    /// Detections at or below this confidence are dropped.
    pub confidence_threshold: f32,
    /// ONNX Runtime intra-op threads per session.
    pub intra_threads: usize,
    /// Run the per-face models concurrently.
    pub parallel_face_models: bool,
    /// TTF/OTF font for overlay labels. Labels are skipped when unset.
    pub font_path: Option<PathBuf>,
    pub arrow_length: f32,
    pub axis_length: f32,
}

impl Config {
    /// Load configuration from `GAZE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            model_dir: var("GAZE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(gaze_core::default_model_dir),
            device: var("GAZE_DEVICE").unwrap_or_else(|| "cpu".to_string()),
            camera_device: var("GAZE_CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_string()),
            confidence_threshold: parse_or(var("GAZE_CONFIDENCE_THRESHOLD"), DEFAULT_CONFIDENCE_THRESHOLD),
            intra_threads: parse_or(var("GAZE_INTRA_THREADS"), DEFAULT_INTRA_THREADS),
            parallel_face_models: var("GAZE_PARALLEL_FACE_MODELS")
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
            font_path: var("GAZE_FONT_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            arrow_length: parse_or(var("GAZE_ARROW_LENGTH"), DEFAULT_ARROW_LENGTH),
            axis_length: parse_or(var("GAZE_AXIS_LENGTH"), DEFAULT_AXIS_LENGTH),
        }
    }
}

/// Parse `value`, keeping `default` when it is unset or malformed.
fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[]);
        assert_eq!(c.model_dir, PathBuf::from("models"));
        assert_eq!(c.device, "cpu");
        assert_eq!(c.camera_device, "/dev/video0");
        assert_eq!(c.confidence_threshold, 0.5);
        assert_eq!(c.intra_threads, 2);
        assert!(!c.parallel_face_models);
        assert!(c.font_path.is_none());
        assert_eq!(c.arrow_length, 100.0);
        assert_eq!(c.axis_length, 50.0);
    }

    #[test]
    fn test_overrides() {
        let c = config(&[
            ("GAZE_MODEL_DIR", "/opt/models"),
            ("GAZE_DEVICE", "cuda"),
            ("GAZE_CONFIDENCE_THRESHOLD", "0.75"),
            ("GAZE_INTRA_THREADS", "8"),
            ("GAZE_PARALLEL_FACE_MODELS", "true"),
            ("GAZE_FONT_PATH", "/usr/share/fonts/DejaVuSans.ttf"),
        ]);
        assert_eq!(c.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(c.device, "cuda");
        assert_eq!(c.confidence_threshold, 0.75);
        assert_eq!(c.intra_threads, 8);
        assert!(c.parallel_face_models);
        assert_eq!(c.font_path, Some(PathBuf::from("/usr/share/fonts/DejaVuSans.ttf")));
    }

    #[test]
    fn test_malformed_numbers_keep_default() {
        let c = config(&[("GAZE_CONFIDENCE_THRESHOLD", "high"), ("GAZE_INTRA_THREADS", "-1")]);
        assert_eq!(c.confidence_threshold, 0.5);
        assert_eq!(c.intra_threads, 2);
    }

    #[test]
    fn test_bool_parsing() {
        assert!(parse_bool("1"));
        assert!(parse_bool(" Yes "));
        assert!(parse_bool("ON"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_empty_font_path_is_unset() {
        assert!(config(&[("GAZE_FONT_PATH", "")]).font_path.is_none());
    }
}
