//! Per-frame recognition: decode, downsample, detect, label, annotate, encode.

use crate::analyzer::{AnalyzerError, FaceAnalyzer};
use crate::known::KnownFaceSet;
use crate::matcher::Matcher;
use crate::vote::label_face;
use facecast_media::annotate::annotate_faces;
use facecast_media::{decode_data_uri, encode_jpeg, resize_to_width, FaceLocation, MediaError};
use image::RgbImage;
use std::time::Instant;
use thiserror::Error;

pub const DEFAULT_RESIZE_WIDTH: u32 = 400;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("media: {0}")]
    Media(#[from] MediaError),
    #[error("analyzer: {0}")]
    Analyzer(#[from] AnalyzerError),
    #[error("analyzer returned {encodings} encodings for {faces} faces")]
    EncodingCount { faces: usize, encodings: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Width frames are downsampled to before detection.
    pub resize_width: u32,
    pub jpeg_quality: u8,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            resize_width: DEFAULT_RESIZE_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// A face box in source-frame coordinates with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledFace {
    pub location: FaceLocation,
    pub label: String,
}

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// JPEG of the annotated source-resolution frame.
    pub jpeg: Vec<u8>,
    /// Faces in detection order.
    pub faces: Vec<LabeledFace>,
}

impl FrameOutcome {
    /// Label of the last face in detection order; this is what drives announcements.
    pub fn last_label(&self) -> Option<&str> {
        self.faces.last().map(|f| f.label.as_str())
    }
}

/// Owns the analyzer and the known set; runs frames one at a time.
pub struct FramePipeline<A> {
    analyzer: A,
    known: KnownFaceSet,
    matcher: Box<dyn Matcher + Send + Sync>,
    options: PipelineOptions,
}

impl<A: FaceAnalyzer> FramePipeline<A> {
    pub fn new(
        analyzer: A,
        known: KnownFaceSet,
        matcher: Box<dyn Matcher + Send + Sync>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            analyzer,
            known,
            matcher,
            options,
        }
    }

    pub fn known(&self) -> &KnownFaceSet {
        &self.known
    }

    /// Process a `data:image/...;base64,` payload from the browser.
    pub fn process_data_uri(&mut self, payload: &str) -> Result<FrameOutcome, PipelineError> {
        let frame = decode_data_uri(payload)?;
        self.process_frame(frame)
    }

    /// Label every face in `frame`, draw the results onto it and encode it.
    pub fn process_frame(&mut self, mut frame: RgbImage) -> Result<FrameOutcome, PipelineError> {
        let started = Instant::now();
        let faces = self.label_faces(&frame)?;

        annotate_faces(&mut frame, faces.iter().map(|f| (f.location, f.label.as_str())));
        let jpeg = encode_jpeg(&frame, self.options.jpeg_quality)?;

        tracing::debug!(
            width = frame.width(),
            height = frame.height(),
            faces = faces.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "frame processed"
        );

        Ok(FrameOutcome { jpeg, faces })
    }

    /// Detect and label faces without touching the frame.
    pub fn label_faces(&mut self, frame: &RgbImage) -> Result<Vec<LabeledFace>, PipelineError> {
        let scaled = resize_to_width(frame, self.options.resize_width);
        let (width, height) = scaled.image.dimensions();

        let boxes = self.analyzer.face_locations(&scaled.image)?;
        if boxes.is_empty() {
            return Ok(Vec::new());
        }
        let encodings = self.analyzer.face_encodings(&scaled.image, &boxes)?;
        if encodings.len() != boxes.len() {
            return Err(PipelineError::EncodingCount {
                faces: boxes.len(),
                encodings: encodings.len(),
            });
        }

        Ok(boxes
            .iter()
            .zip(&encodings)
            .map(|(bbox, encoding)| LabeledFace {
                location: bbox.location(width, height).rescale(scaled.ratio),
                label: label_face(&self.known, self.matcher.as_ref(), encoding),
            })
            .collect())
    }
}
