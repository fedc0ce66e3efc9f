//! 播放事件检测 - 从网页播放器录屏中识别初始化、开始播放、缓冲中断、恢复等事件
//!
//! 核心策略：
//! 1. 启发式检测 - 只比较相邻两帧的像素，不依赖播放器内部状态
//! 2. 状态机驱动 - 按当前状态只运行需要的检测，计数去抖后才确认事件
//! 3. 冷却期 - 全屏切换、地址栏变化后跳过若干帧，吸收界面过渡噪声
//! 4. 环形缓冲 - 保留最近的帧，为每个事件写出前后片段

pub mod clip_writer;
pub mod config;
pub mod events;
pub mod heuristics;
pub mod pipeline;
pub mod probe;
pub mod sink;
pub mod state_machine;

pub use clip_writer::{ClipOutcome, ClipWriter, FrameRing};
pub use config::{AnalyzerConfig, ClipConfig, ConfigError, HeuristicsConfig, MachineConfig};
pub use events::{format_duration, EventKind, EventRecord};
pub use heuristics::PopupReading;
pub use pipeline::{EventPipeline, RunSummary};
pub use probe::{FrameProbe, ScriptedProbe, SignalProbe};
pub use sink::{EventSink, JsonEventSink, TextEventSink};
pub use state_machine::{Command, Counters, StateMachine, VideoState, WriteMode};
