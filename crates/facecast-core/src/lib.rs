//! facecast-core — Face detection, recognition and per-frame labeling.
//!
//! SCRFD locates faces and ArcFace embeds them, both on ONNX Runtime.
//! Embeddings are matched against a [`KnownFaceSet`] and labeled by
//! majority vote; [`FramePipeline`] ties it together for one frame.

pub mod alignment;
pub mod analyzer;
pub mod detector;
pub mod known;
pub mod matcher;
pub mod pipeline;
pub mod recognizer;
pub mod types;
pub mod vote;

pub use analyzer::{default_model_dir, AnalyzerError, FaceAnalyzer, OnnxAnalyzer};
pub use known::{KnownFaceSet, KnownFaceSetBuilder, KnownFacesError};
pub use matcher::{CosineMatcher, EuclideanMatcher, MatchMetric, Matcher};
pub use pipeline::{FrameOutcome, FramePipeline, LabeledFace, PipelineError, PipelineOptions};
pub use types::{BoundingBox, Embedding, UNKNOWN_LABEL};
