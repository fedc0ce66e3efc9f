//! 录屏事件分析器

use log::info;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::api::error::AnalyzerError;
use crate::core::video::{ClipEncoder, FrameSource};
use crate::event_detector::{
    AnalyzerConfig, ClipWriter, EventPipeline, EventSink, JsonEventSink, RunSummary, TextEventSink,
};

/// 事件日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EventFormat {
    /// `id;title;timestamp_ms;duration` -> events.txt
    #[default]
    Text,
    /// JSON Lines -> events.jsonl
    Json,
}

/// 累计统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalyzerStats {
    pub runs: u64,
    pub frames: u64,
    pub events: u64,
    pub clips_written: u64,
}

/// 录屏事件分析器：每次 `analyze` 是一次独立运行，输出到 `<output_root>/<name>/`
///
/// ```no_run
/// # use playback_events::api::{EventFormat, PlaybackAnalyzer};
/// # use playback_events::core::video::{GifClipEncoder, ImageSequenceSource};
/// # use playback_events::event_detector::AnalyzerConfig;
/// # use std::{path::Path, sync::Arc};
/// let analyzer = PlaybackAnalyzer::create(Path::new("out"), AnalyzerConfig::default(), EventFormat::Text);
/// let mut source = ImageSequenceSource::open(Path::new("recording"), 30.0).unwrap();
/// let summary = analyzer
///     .analyze("recording", &mut source, Arc::new(GifClipEncoder::new(60)))
///     .unwrap();
/// println!("{} events", summary.events.len());
/// ```
pub struct PlaybackAnalyzer {
    output_root: PathBuf,
    config: AnalyzerConfig,
    format: EventFormat,
    stats: Arc<Mutex<AnalyzerStats>>,
}

impl PlaybackAnalyzer {
    pub fn create(output_root: &Path, config: AnalyzerConfig, format: EventFormat) -> Self {
        info!("🎬 PlaybackAnalyzer: created (output {:?})", output_root);
        Self {
            output_root: output_root.to_path_buf(),
            config,
            format,
            stats: Arc::new(Mutex::new(AnalyzerStats::default())),
        }
    }

    /// 分析一段录屏。输出目录不可写时在读取任何帧之前失败。
    pub fn analyze(
        &self,
        name: &str,
        source: &mut dyn FrameSource,
        encoder: Arc<dyn ClipEncoder>,
    ) -> Result<RunSummary, AnalyzerError> {
        let run_dir = self.run_dir(name);
        let writer = ClipWriter::new(&run_dir, self.config.clip.capacity, encoder).map_err(|source| {
            AnalyzerError::OutputDir {
                path: run_dir.clone(),
                source,
            }
        })?;
        let sink = self.open_sink(&run_dir)?;

        let (width, height) = source.frame_size();
        info!("📂 Analyzing '{}' ({}x{}) -> {:?}", name, width, height, run_dir);

        let summary = EventPipeline::new(name, &self.config, writer, sink).run(source);

        if let Ok(mut stats) = self.stats.lock() {
            stats.runs += 1;
            stats.frames += summary.frames_processed;
            stats.events += summary.events.len() as u64;
            stats.clips_written += summary.clips_written as u64;
        }
        Ok(summary)
    }

    fn open_sink(&self, run_dir: &Path) -> Result<Box<dyn EventSink>, AnalyzerError> {
        let sink: Box<dyn EventSink> = match self.format {
            EventFormat::Text => Box::new(TextEventSink::create_in(run_dir)?),
            EventFormat::Json => Box::new(JsonEventSink::create_in(run_dir)?),
        };
        Ok(sink)
    }

    pub fn run_dir(&self, name: &str) -> PathBuf {
        self.output_root.join(name)
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn stats(&self) -> AnalyzerStats {
        self.stats
            .lock()
            .map(|stats| stats.clone())
            .unwrap_or_default()
    }
}

impl Drop for PlaybackAnalyzer {
    fn drop(&mut self) {
        info!("🗑️ PlaybackAnalyzer: released");
    }
}
