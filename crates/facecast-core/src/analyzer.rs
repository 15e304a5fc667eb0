//! The recognizer seam used by the frame pipeline and the encoder.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{BoundingBox, Embedding};
use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SCRFD_MODEL_FILE: &str = "det_10g.onnx";
pub const ARCFACE_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Locates faces and computes their embeddings.
pub trait FaceAnalyzer {
    /// Bounding boxes of every face in `frame`.
    fn face_locations(&mut self, frame: &RgbImage) -> Result<Vec<BoundingBox>, AnalyzerError>;

    /// One embedding per entry of `faces`, in the same order.
    fn face_encodings(
        &mut self,
        frame: &RgbImage,
        faces: &[BoundingBox],
    ) -> Result<Vec<Embedding>, AnalyzerError>;
}

/// SCRFD detection plus ArcFace embeddings.
pub struct OnnxAnalyzer {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl OnnxAnalyzer {
    /// Load both models from `model_dir`. Fails fast if either is missing.
    pub fn load(model_dir: &Path) -> Result<Self, AnalyzerError> {
        let detector = FaceDetector::load(&model_dir.join(SCRFD_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(ARCFACE_MODEL_FILE))?;
        Ok(Self { detector, recognizer })
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.detector = self.detector.with_confidence_threshold(threshold);
        self
    }
}

impl FaceAnalyzer for OnnxAnalyzer {
    fn face_locations(&mut self, frame: &RgbImage) -> Result<Vec<BoundingBox>, AnalyzerError> {
        Ok(self.detector.detect(frame)?)
    }

    fn face_encodings(
        &mut self,
        frame: &RgbImage,
        faces: &[BoundingBox],
    ) -> Result<Vec<Embedding>, AnalyzerError> {
        faces
            .iter()
            .map(|face| self.recognizer.extract(frame, face).map_err(AnalyzerError::from))
            .collect()
    }
}

/// `$XDG_DATA_HOME/facecast/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facecast")
        .join("models")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_models() {
        let dir = tempfile::tempdir().unwrap();
        let err = OnnxAnalyzer::load(dir.path()).err().unwrap();
        assert!(matches!(err, AnalyzerError::Detector(DetectorError::ModelNotFound(_))));
        assert!(err.to_string().contains(SCRFD_MODEL_FILE));
    }

    #[test]
    fn test_default_model_dir_suffix() {
        assert!(default_model_dir().ends_with("facecast/models"));
    }
}
