//! 批量分析：发现输入、打开帧来源、在线程池上并行运行

use log::{info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::analyzer::PlaybackAnalyzer;
use crate::api::error::AnalyzerError;
use crate::core::video::source::is_sequence_image;
use crate::core::video::{ClipEncoder, FrameSource, ImageSequenceSource};
use crate::event_detector::RunSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// 序列帧目录
    ImageSequence,
    /// 视频文件（需要 opencv 特性）
    VideoFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: InputKind,
}

impl CatalogueEntry {
    fn new(path: &Path, kind: InputKind) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        Self {
            name,
            path: path.to_path_buf(),
            kind,
        }
    }
}

/// 输入可以是单个视频、单个序列帧目录，或包含多段录屏的目录
pub fn discover(input: &Path) -> Result<Vec<CatalogueEntry>, AnalyzerError> {
    if input.is_file() {
        return if is_video_file(input) {
            Ok(vec![CatalogueEntry::new(input, InputKind::VideoFile)])
        } else {
            Err(AnalyzerError::UnsupportedInput(input.to_path_buf()))
        };
    }
    if contains_sequence_images(input)? {
        return Ok(vec![CatalogueEntry::new(input, InputKind::ImageSequence)]);
    }

    let mut entries = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();
        if path.is_dir() && contains_sequence_images(&path)? {
            entries.push(CatalogueEntry::new(&path, InputKind::ImageSequence));
        } else if path.is_file() && is_video_file(&path) {
            entries.push(CatalogueEntry::new(&path, InputKind::VideoFile));
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));

    if entries.is_empty() {
        return Err(AnalyzerError::NoInputs(input.to_path_buf()));
    }
    info!("🔍 Found {} recordings in {:?}", entries.len(), input);
    Ok(entries)
}

fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}

fn contains_sequence_images(dir: &Path) -> Result<bool, AnalyzerError> {
    for entry in std::fs::read_dir(dir)? {
        if is_sequence_image(&entry?.path()) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// `fps` 只用于序列帧的时间戳；视频文件自带时间戳
pub fn open_source(entry: &CatalogueEntry, fps: f64) -> Result<Box<dyn FrameSource>, AnalyzerError> {
    match entry.kind {
        InputKind::ImageSequence => Ok(Box::new(ImageSequenceSource::open(&entry.path, fps)?)),
        #[cfg(feature = "opencv")]
        InputKind::VideoFile => Ok(Box::new(crate::core::video::VideoFileSource::open(&entry.path)?)),
        #[cfg(not(feature = "opencv"))]
        InputKind::VideoFile => {
            warn!("⚠️ {:?} needs the `opencv` feature", entry.path);
            Err(AnalyzerError::UnsupportedInput(entry.path.clone()))
        }
    }
}

/// opencv 特性下写 mp4，否则写 GIF
pub fn default_encoder(fps: u32) -> Arc<dyn ClipEncoder> {
    #[cfg(feature = "opencv")]
    {
        Arc::new(crate::core::video::Mp4ClipEncoder::new(fps))
    }
    #[cfg(not(feature = "opencv"))]
    {
        Arc::new(crate::core::video::GifClipEncoder::new(fps))
    }
}

pub fn analyze_entry(
    analyzer: &PlaybackAnalyzer,
    entry: &CatalogueEntry,
    fps: f64,
) -> Result<RunSummary, AnalyzerError> {
    let mut source = open_source(entry, fps)?;
    let encoder = default_encoder(analyzer.config().clip.fps);
    analyzer.analyze(&entry.name, source.as_mut(), encoder)
}

/// 各段录屏互相独立，并行分析；单段内部严格按帧顺序
pub fn analyze_all(
    analyzer: &PlaybackAnalyzer,
    entries: &[CatalogueEntry],
    fps: f64,
    jobs: Option<usize>,
) -> Result<Vec<(String, Result<RunSummary, AnalyzerError>)>, AnalyzerError> {
    let threads = jobs.unwrap_or_else(num_cpus::get).max(1);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;
    info!("🚀 Analyzing {} recordings on {} threads", entries.len(), threads);

    Ok(pool.install(|| {
        entries
            .par_iter()
            .map(|entry| {
                let result = analyze_entry(analyzer, entry, fps);
                if let Err(e) = &result {
                    warn!("⚠️ '{}' failed: {}", entry.name, e);
                }
                (entry.name.clone(), result)
            })
            .collect()
    }))
}
