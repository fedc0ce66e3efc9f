use log::{error, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::core::video::{Frame, FrameInfo, FrameSource, VideoError};
use crate::event_detector::clip_writer::{ClipOutcome, ClipWriter};
use crate::event_detector::config::{AnalyzerConfig, HeuristicsConfig};
use crate::event_detector::events::EventRecord;
use crate::event_detector::probe::{FrameProbe, SignalProbe};
use crate::event_detector::sink::EventSink;
use crate::event_detector::state_machine::{Command, StateMachine, VideoState};

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub frames_processed: u64,
    pub events: Vec<EventRecord>,
    pub clips_written: usize,
    pub clip_failures: usize,
    pub sink_failures: usize,
    pub final_state: VideoState,
    pub last_frame: Option<FrameInfo>,
    /// 帧来源中途出错时的错误信息
    pub source_error: Option<String>,
}

impl RunSummary {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            frames_processed: 0,
            events: Vec::new(),
            clips_written: 0,
            clip_failures: 0,
            sink_failures: 0,
            final_state: VideoState::new(),
            last_frame: None,
            source_error: None,
        }
    }
}

/// 单次运行：帧 -> 环形缓冲 -> 冷却 -> 状态检测 -> 事件与片段
pub struct EventPipeline {
    machine: StateMachine,
    writer: ClipWriter,
    sink: Box<dyn EventSink>,
    heuristics: HeuristicsConfig,
    previous: Option<Arc<Frame>>,
    summary: RunSummary,
}

impl EventPipeline {
    pub fn new(name: &str, config: &AnalyzerConfig, writer: ClipWriter, sink: Box<dyn EventSink>) -> Self {
        Self {
            machine: StateMachine::with_config(config.machine.clone()),
            writer,
            sink,
            heuristics: config.heuristics.clone(),
            previous: None,
            summary: RunSummary::new(name),
        }
    }

    /// 帧尺寸必须与上一帧一致，否则拒收该帧，状态不变
    pub fn process_frame(&mut self, frame: Frame) -> Result<(), VideoError> {
        if let Some(previous) = self.previous.as_deref() {
            let expected = (previous.width, previous.height);
            let actual = (frame.width, frame.height);
            if expected != actual {
                return Err(VideoError::FrameSizeMismatch { expected, actual });
            }
        }

        let next = Arc::new(frame);
        self.receive(next.clone());

        let commands = match self.previous.as_deref() {
            Some(previous) => {
                let probe = FrameProbe::new(previous, &next, &self.heuristics);
                self.machine.process_frame(&probe, next.timestamp_ms())
            }
            None => Vec::new(),
        };
        self.apply(commands);
        self.previous = Some(next);
        Ok(())
    }

    /// 用给定的信号代替像素检测
    pub fn process_with_probe(&mut self, frame: Frame, probe: &dyn SignalProbe) {
        let next = Arc::new(frame);
        self.receive(next.clone());
        if self.previous.is_some() {
            let commands = self.machine.process_frame(probe, next.timestamp_ms());
            self.apply(commands);
        }
        self.previous = Some(next);
    }

    /// 读完整个来源。来源出错或帧尺寸变化时记录日志并正常结束，已确认的事件照常保留。
    pub fn run(mut self, source: &mut dyn FrameSource) -> RunSummary {
        info!("▶️ Run '{}' started", self.summary.name);
        loop {
            let result = match source.next_frame() {
                Ok(Some(frame)) => self.process_frame(frame),
                Ok(None) => break,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!("❌ Run '{}' source error: {}", self.summary.name, e);
                self.summary.source_error = Some(e.to_string());
                break;
            }
        }
        self.finish()
    }

    pub fn finish(mut self) -> RunSummary {
        let outcomes = self.writer.finish();
        self.tally(&outcomes);
        if let Err(e) = self.sink.flush() {
            warn!("⚠️ Event sink flush failed: {}", e);
            self.summary.sink_failures += 1;
        }

        self.summary.final_state = self.machine.current_state();
        info!(
            "⏹️ Run '{}' finished: {} frames, {} events, {} clips ({} failed)",
            self.summary.name,
            self.summary.frames_processed,
            self.summary.events.len(),
            self.summary.clips_written,
            self.summary.clip_failures
        );
        self.summary
    }

    fn receive(&mut self, frame: Arc<Frame>) {
        self.summary.frames_processed += 1;
        self.summary.last_frame = Some(FrameInfo::from_frame(&frame));
        let outcomes = self.writer.receive_frame(frame);
        self.tally(&outcomes);
    }

    fn apply(&mut self, commands: Vec<Command>) {
        for command in commands {
            match command {
                Command::Emit(record) => {
                    if let Err(e) = self.sink.record(&record) {
                        warn!("⚠️ Failed to record event {}: {}", record.event_id, e);
                        self.summary.sink_failures += 1;
                    }
                    self.summary.events.push(record);
                }
                Command::WriteClip { event_id, mode } => {
                    if let Some(outcome) = self.writer.request(event_id, mode) {
                        self.tally(std::slice::from_ref(&outcome));
                    }
                }
            }
        }
    }

    fn tally(&mut self, outcomes: &[ClipOutcome]) {
        for outcome in outcomes {
            match outcome {
                ClipOutcome::Written { .. } => self.summary.clips_written += 1,
                ClipOutcome::Failed { .. } => self.summary.clip_failures += 1,
            }
        }
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.machine
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }
}
