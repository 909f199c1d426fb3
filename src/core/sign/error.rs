use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignError {
    #[error("Region collapsed to zero area after clamping")]
    EmptyRegion,
    #[error("Model returned index {index} but only {label_count} labels are loaded")]
    InvalidModelOutput { index: usize, label_count: usize },
    #[error("Confidence {confidence:.2} below floor {floor:.2}")]
    LowConfidence { confidence: f32, floor: f32 },
    #[error("Label source not found: {path}")]
    MissingLabelSource { path: PathBuf },
    #[error("Label source contains no labels: {path}")]
    EmptyLabelSource { path: PathBuf },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid frame: {width}x{height} with {len} bytes")]
    InvalidFrame { width: u32, height: u32, len: usize },
    #[error("Classifier error: {0}")]
    Classifier(String),
    #[error("Unknown session: {0}")]
    UnknownSession(u64),
    #[error("Session {0} lock poisoned")]
    SessionPoisoned(u64),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}
