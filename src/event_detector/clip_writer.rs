//! 事件片段写入：最近帧的环形缓冲 + 待写请求

use log::{debug, warn};
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::video::{ClipEncoder, Frame};
use crate::event_detector::state_machine::WriteMode;

/// 固定容量 FIFO，满了之后淘汰最旧的帧
#[derive(Debug, Clone)]
pub struct FrameRing {
    frames: VecDeque<Arc<Frame>>,
    capacity: usize,
}

impl FrameRing {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// 返回被淘汰的帧
    pub fn push(&mut self, frame: Arc<Frame>) -> Option<Arc<Frame>> {
        let evicted = if self.frames.len() == self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    pub fn oldest(&self) -> Option<&Arc<Frame>> {
        self.frames.front()
    }

    pub fn newest(&self) -> Option<&Arc<Frame>> {
        self.frames.back()
    }

    pub fn snapshot(&self) -> Vec<Arc<Frame>> {
        self.frames.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Written { event_id: u64, path: PathBuf, frames: usize },
    Failed { event_id: u64, reason: String },
}

pub struct ClipWriter {
    output_dir: PathBuf,
    ring: FrameRing,
    /// event_id -> 剩余帧数
    pending: BTreeMap<u64, usize>,
    countdown: usize,
    encoder: Arc<dyn ClipEncoder>,
}

impl ClipWriter {
    /// 输出目录创建失败直接返回错误，此时还未处理任何帧
    pub fn new(
        output_dir: &Path,
        capacity: usize,
        encoder: Arc<dyn ClipEncoder>,
    ) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(output_dir)?;
        let ring = FrameRing::new(capacity);
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            countdown: (ring.capacity() / 2).max(1),
            ring,
            pending: BTreeMap::new(),
            encoder,
        })
    }

    /// 收下一帧，并推进所有待写请求的倒计时
    pub fn receive_frame(&mut self, frame: Arc<Frame>) -> Vec<ClipOutcome> {
        self.ring.push(frame);

        let ids: Vec<u64> = self.pending.keys().copied().collect();
        let mut outcomes = Vec::new();
        for event_id in ids {
            let Some(left) = self.pending.get_mut(&event_id) else {
                continue;
            };
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.pending.remove(&event_id);
                outcomes.push(self.save(event_id));
            }
        }
        outcomes
    }

    /// 同一事件只保留一个待写请求
    pub fn request(&mut self, event_id: u64, mode: WriteMode) -> Option<ClipOutcome> {
        match mode {
            WriteMode::Scheduled => {
                self.pending.entry(event_id).or_insert(self.countdown);
                debug!("Clip {} scheduled in {} frames", event_id, self.countdown);
                None
            }
            WriteMode::Instant => {
                self.pending.remove(&event_id);
                Some(self.save(event_id))
            }
        }
    }

    /// 结束时把尚未到期的请求用当前缓冲写出
    pub fn finish(&mut self) -> Vec<ClipOutcome> {
        let pending = std::mem::take(&mut self.pending);
        pending.into_keys().map(|id| self.save(id)).collect()
    }

    fn save(&self, event_id: u64) -> ClipOutcome {
        let frames = self.ring.snapshot();
        if frames.is_empty() {
            warn!("⚠️ Clip {} skipped: no frames buffered", event_id);
            return ClipOutcome::Failed {
                event_id,
                reason: "no frames buffered".to_string(),
            };
        }

        let path = self.clip_path(event_id);
        match self.encoder.encode(&frames, &path) {
            Ok(()) => {
                debug!("🎞️ Clip {} written: {} frames -> {:?}", event_id, frames.len(), path);
                ClipOutcome::Written {
                    event_id,
                    path,
                    frames: frames.len(),
                }
            }
            Err(e) => {
                warn!("⚠️ Clip {} encode failed: {}", event_id, e);
                ClipOutcome::Failed {
                    event_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn clip_path(&self, event_id: u64) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", event_id, self.encoder.extension()))
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
