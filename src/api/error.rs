use std::path::PathBuf;
use thiserror::Error;

use crate::core::video::VideoError;
use crate::event_detector::ConfigError;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Video error: {0}")]
    Video(#[from] VideoError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Cannot create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Unsupported input: {0:?}")]
    UnsupportedInput(PathBuf),
    #[error("No recordings found in {0:?}")]
    NoInputs(PathBuf),
}
