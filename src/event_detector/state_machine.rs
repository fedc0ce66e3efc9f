use log::{debug, info};

use crate::core::video::Contour;
use crate::event_detector::config::MachineConfig;
use crate::event_detector::events::{EventKind, EventRecord};
use crate::event_detector::probe::SignalProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoState {
    LookingForVideo,
    LoadingVideo,
    PlayingVideo,
    PausedVideo,
    SiteChanged,
}

impl VideoState {
    pub fn new() -> Self {
        VideoState::LookingForVideo
    }
}

impl Default for VideoState {
    fn default() -> Self {
        Self::new()
    }
}

/// 片段写入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// 再收 capacity/2 帧后写出（事件正在发生，前后都要）
    Scheduled,
    /// 立即写出当前缓冲（事件起点已在过去）
    Instant,
}

/// 状态机产出的副作用，由调用方执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Emit(EventRecord),
    WriteClip { event_id: u64, mode: WriteMode },
}

/// 去抖计数器，每次状态切换清零
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub popup_seen: u32,
    pub first_seen_ms: Option<u64>,
    pub popup_absent: u32,
    pub first_absent_ms: Option<u64>,
    pub rest_noise_streak: u32,
    pub motion: u32,
}

impl Counters {
    fn see_popup(&mut self, timestamp_ms: u64) {
        self.popup_seen += 1;
        self.first_seen_ms.get_or_insert(timestamp_ms);
    }

    fn clear_popup(&mut self) {
        self.popup_seen = 0;
        self.first_seen_ms = None;
    }

    fn miss_popup(&mut self, timestamp_ms: u64) {
        self.popup_absent += 1;
        self.first_absent_ms.get_or_insert(timestamp_ms);
    }

    fn clear_absent(&mut self) {
        self.popup_absent = 0;
        self.first_absent_ms = None;
        self.rest_noise_streak = 0;
    }
}

/// 界面检查的结果：本帧是否继续做播放检测
enum UiOutcome {
    Continue,
    Stop,
}

pub struct StateMachine {
    state: VideoState,
    previous_state: VideoState,
    config: MachineConfig,
    counters: Counters,
    /// 已确认的播放器区域，直到地址栏变化才失效
    contour: Option<Contour>,
    bar_height: Option<i32>,
    unpaused_reported: bool,
    scroll_baseline: Option<u32>,
    video_lost: bool,
    fullscreen: bool,
    skip_frames_left: u32,
    next_event_id: u64,
    frame_counter: u64,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::with_config(MachineConfig::default())
    }

    pub fn with_config(config: MachineConfig) -> Self {
        Self {
            state: VideoState::new(),
            previous_state: VideoState::new(),
            config,
            counters: Counters::default(),
            contour: None,
            bar_height: None,
            unpaused_reported: false,
            scroll_baseline: None,
            video_lost: false,
            fullscreen: false,
            skip_frames_left: 0,
            next_event_id: 1,
            frame_counter: 0,
        }
    }

    /// 处理一个帧对。冷却期内不做任何检测，只递减计数；连续计数从冷却结束后重新开始。
    pub fn process_frame(&mut self, probe: &dyn SignalProbe, timestamp_ms: u64) -> Vec<Command> {
        self.frame_counter += 1;

        if self.skip_frames_left > 0 {
            self.skip_frames_left -= 1;
            self.break_streaks();
            return Vec::new();
        }

        let mut commands = Vec::new();
        match self.state {
            VideoState::LookingForVideo => self.look_for_video(probe, timestamp_ms, &mut commands),
            VideoState::LoadingVideo => self.wait_for_video_to_load(probe, timestamp_ms, &mut commands),
            VideoState::PlayingVideo => self.look_for_interruptions(probe, timestamp_ms, &mut commands),
            VideoState::PausedVideo => self.look_for_continuation(probe, timestamp_ms, &mut commands),
            VideoState::SiteChanged => self.look_for_new_video(probe, timestamp_ms, &mut commands),
        }
        commands
    }

    fn look_for_video(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) {
        let Some(contour) = probe.locate_player().filter(|c| !c.is_degenerate()) else {
            return;
        };
        let initializing = probe.is_initializing(&contour);
        self.contour = Some(contour);

        if initializing {
            self.emit(EventKind::VideoStartInitializing, ts, None, WriteMode::Scheduled, out);
            self.skip_frames_left = self.config.skip_frames;
            self.change_state(VideoState::LoadingVideo);
        }
    }

    fn wait_for_video_to_load(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) {
        if let UiOutcome::Stop = self.check_ui(probe, ts, out) {
            return;
        }
        let Some(region) = self.region(probe) else {
            return;
        };

        let popup = probe.popup(&region);
        if popup.visible && probe.is_initializing(&region) {
            self.counters.see_popup(ts);
        } else {
            self.counters.clear_popup();
        }

        if self.counters.popup_seen >= self.config.popup_confirm_frames {
            let onset = self.counters.first_seen_ms.unwrap_or(ts);
            self.emit(EventKind::StartPlaying, onset, None, WriteMode::Instant, out);
            self.emit(EventKind::ConnectionInterruption, onset, None, WriteMode::Instant, out);
            self.change_state(VideoState::PausedVideo);
            return;
        }

        self.try_look_for_bar(probe, &region, ts, out);

        if probe.is_moving(&region) {
            self.counters.motion += 1;
        } else {
            self.counters.motion = 0;
        }
        if self.counters.motion >= self.config.motion_confirm_frames {
            self.emit(EventKind::StartPlaying, ts, None, WriteMode::Scheduled, out);
            self.change_state(VideoState::PlayingVideo);
        }
    }

    fn try_look_for_bar(&mut self, probe: &dyn SignalProbe, region: &Contour, ts: u64, out: &mut Vec<Command>) {
        match self.bar_height {
            None => {
                self.bar_height = probe.bar_height(region);
                if let Some(y) = self.bar_height {
                    debug!("Player bar found at y={}", y);
                }
            }
            Some(bar_y) => {
                if !self.unpaused_reported && probe.is_unpaused(region, bar_y) {
                    self.unpaused_reported = true;
                    self.emit(EventKind::VideoEndInitializing, ts, None, WriteMode::Scheduled, out);
                }
            }
        }
    }

    fn look_for_interruptions(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) {
        if let UiOutcome::Stop = self.check_ui(probe, ts, out) {
            return;
        }
        let Some(region) = self.region(probe) else {
            return;
        };

        if probe.popup(&region).visible {
            self.counters.see_popup(ts);
        } else {
            self.counters.clear_popup();
        }

        if self.counters.popup_seen >= self.config.popup_confirm_frames {
            let onset = self.counters.first_seen_ms.unwrap_or(ts);
            self.emit(EventKind::ConnectionInterruption, onset, None, WriteMode::Instant, out);
            self.change_state(VideoState::PausedVideo);
        }
    }

    fn look_for_continuation(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) {
        if let UiOutcome::Stop = self.check_ui(probe, ts, out) {
            return;
        }
        let Some(region) = self.region(probe) else {
            return;
        };

        let popup = probe.popup(&region);
        if popup.visible {
            self.counters.clear_absent();
            return;
        }

        self.counters.miss_popup(ts);
        if popup.rest_noisy {
            self.counters.rest_noise_streak += 1;
        } else {
            self.counters.rest_noise_streak = 0;
        }

        if self.counters.popup_absent >= self.config.popup_absent_frames
            || self.counters.rest_noise_streak >= self.config.rest_noise_budget
        {
            let onset = self.counters.first_absent_ms.unwrap_or(ts);
            self.emit(EventKind::VideoResumed, onset, None, WriteMode::Scheduled, out);
            self.change_state(VideoState::PlayingVideo);
        }
    }

    /// 地址栏变化后：重新定位播放器，等待新视频初始化
    fn look_for_new_video(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) {
        let Some(contour) = probe.locate_player().filter(|c| !c.is_degenerate()) else {
            return;
        };
        if !probe.is_initializing(&contour) {
            return;
        }

        let popup_visible = probe.popup(&contour).visible;
        self.contour = Some(contour);
        self.emit(EventKind::VideoStartInitializing, ts, None, WriteMode::Scheduled, out);
        self.change_state(VideoState::LoadingVideo);

        // 弹窗可能已在新页面上出现，计数从这一帧算起
        if popup_visible {
            self.counters.see_popup(ts);
        }
    }

    /// 全屏切换、地址栏、滚动条，按此顺序。返回 `Stop` 的帧打断所有连续计数。
    fn check_ui(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) -> UiOutcome {
        if probe.fullscreen_toggled() {
            self.fullscreen = !self.fullscreen;
            self.emit(EventKind::FullScreenToggled, ts, Some(self.fullscreen), WriteMode::Scheduled, out);
            self.skip_frames_left = self.config.skip_frames;
            self.break_streaks();
            return UiOutcome::Stop;
        }
        if self.fullscreen {
            return UiOutcome::Continue;
        }

        if probe.url_changed() {
            self.emit(EventKind::UrlChanged, ts, None, WriteMode::Scheduled, out);
            self.forget_video();
            self.skip_frames_left = self.config.skip_frames;
            self.change_state(VideoState::SiteChanged);
            return UiOutcome::Stop;
        }

        self.check_scroll_bar(probe, ts, out);
        if self.video_lost {
            self.break_streaks();
            UiOutcome::Stop
        } else {
            UiOutcome::Continue
        }
    }

    fn check_scroll_bar(&mut self, probe: &dyn SignalProbe, ts: u64, out: &mut Vec<Command>) {
        let edge = probe.scroll_bar_edge();
        let Some(baseline) = self.scroll_baseline else {
            self.scroll_baseline = edge;
            return;
        };

        let in_place = edge == Some(baseline);
        if !in_place && !self.video_lost {
            self.video_lost = true;
            self.emit(EventKind::VideoLost, ts, None, WriteMode::Scheduled, out);
        } else if in_place && self.video_lost {
            self.video_lost = false;
            self.emit(EventKind::VideoCameBack, ts, None, WriteMode::Scheduled, out);
        }
    }

    fn break_streaks(&mut self) {
        self.counters = Counters::default();
    }

    fn forget_video(&mut self) {
        self.contour = None;
        self.bar_height = None;
        self.unpaused_reported = false;
        self.scroll_baseline = None;
        self.video_lost = false;
    }

    /// 当前检测区域：全屏时为整帧，否则为缓存的播放器轮廓
    fn region(&self, probe: &dyn SignalProbe) -> Option<Contour> {
        if self.fullscreen {
            let (width, height) = probe.frame_size();
            return Some(Contour::full_frame(width, height));
        }
        self.contour.clone().filter(|c| !c.is_degenerate())
    }

    fn emit(
        &mut self,
        kind: EventKind,
        timestamp_ms: u64,
        value: Option<bool>,
        mode: WriteMode,
        out: &mut Vec<Command>,
    ) {
        let event_id = self.next_event_id;
        self.next_event_id += 1;

        let record = EventRecord {
            event_id,
            kind,
            timestamp_ms,
            value,
        };
        info!("📌 {}", record.to_line());
        out.push(Command::Emit(record));
        out.push(Command::WriteClip { event_id, mode });
    }

    fn change_state(&mut self, next: VideoState) {
        debug!("State {:?} -> {:?} (frame {})", self.state, next, self.frame_counter);
        self.previous_state = self.state;
        self.state = next;
        self.counters = Counters::default();
    }

    pub fn current_state(&self) -> VideoState {
        self.state
    }

    pub fn previous_state(&self) -> VideoState {
        self.previous_state
    }

    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    pub fn contour(&self) -> Option<&Contour> {
        self.contour.as_ref()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn is_video_lost(&self) -> bool {
        self.video_lost
    }

    pub fn skip_frames_left(&self) -> u32 {
        self.skip_frames_left
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn events_emitted(&self) -> u64 {
        self.next_event_id - 1
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_detector::probe::ScriptedProbe;

    fn events(commands: &[Command]) -> Vec<EventRecord> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::Emit(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    fn run(sm: &mut StateMachine, probe: &ScriptedProbe, frames: std::ops::Range<u64>) -> Vec<EventRecord> {
        frames
            .flat_map(|i| events(&sm.process_frame(probe, i * 33)))
            .collect()
    }

    fn machine_in(state: VideoState) -> StateMachine {
        let mut sm = StateMachine::with_config(MachineConfig {
            skip_frames: 0,
            ..Default::default()
        });
        sm.process_frame(&ScriptedProbe::initializing(), 0);
        assert_eq!(sm.current_state(), VideoState::LoadingVideo);
        match state {
            VideoState::LoadingVideo => {}
            VideoState::PlayingVideo => {
                run(&mut sm, &ScriptedProbe::moving(), 1..4);
            }
            VideoState::PausedVideo => {
                run(&mut sm, &ScriptedProbe::moving(), 1..4);
                run(&mut sm, &ScriptedProbe::with_popup(), 4..19);
            }
            other => panic!("unsupported start state {:?}", other),
        }
        assert_eq!(sm.current_state(), state);
        sm
    }

    #[test]
    fn test_black_frames_initialize_once() {
        let mut sm = StateMachine::new();
        let emitted = run(&mut sm, &ScriptedProbe::initializing(), 0..50);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, EventKind::VideoStartInitializing);
        assert_eq!(emitted[0].timestamp_ms, 0);
        assert_eq!(sm.current_state(), VideoState::LoadingVideo);
        assert_eq!(sm.previous_state(), VideoState::LookingForVideo);
    }

    #[test]
    fn test_no_player_stays_looking() {
        let mut sm = StateMachine::new();
        let probe = ScriptedProbe {
            player: None,
            initializing: true,
            ..Default::default()
        };
        assert!(run(&mut sm, &probe, 0..5).is_empty());
        assert_eq!(sm.current_state(), VideoState::LookingForVideo);
        assert!(sm.contour().is_none());
    }

    #[test]
    fn test_init_command_order() {
        let mut sm = StateMachine::new();
        let commands = sm.process_frame(&ScriptedProbe::initializing(), 0);

        assert_eq!(commands.len(), 2);
        assert!(matches!(&commands[0], Command::Emit(r) if r.event_id == 1));
        assert_eq!(
            commands[1],
            Command::WriteClip {
                event_id: 1,
                mode: WriteMode::Scheduled
            }
        );
        assert_eq!(sm.skip_frames_left(), 20);
    }

    #[test]
    fn test_popup_confirms_on_threshold_frame_backdated() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        let popup = ScriptedProbe::with_popup();

        let mut confirmed = Vec::new();
        for frame in 1..=20u64 {
            for record in events(&sm.process_frame(&popup, 1000 + frame * 33)) {
                confirmed.push((frame, record));
            }
        }

        assert_eq!(confirmed.len(), 1);
        let (frame, record) = &confirmed[0];
        assert_eq!(*frame, 15);
        assert_eq!(record.kind, EventKind::ConnectionInterruption);
        assert_eq!(record.timestamp_ms, 1033);
        assert_eq!(sm.current_state(), VideoState::PausedVideo);
    }

    #[test]
    fn test_popup_below_threshold_never_confirms() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        let popup = ScriptedProbe::with_popup();
        let quiet = ScriptedProbe::new();

        for round in 0..3u64 {
            let base = 100 + round * 20;
            assert!(run(&mut sm, &popup, base..base + 14).is_empty());
            assert!(run(&mut sm, &quiet, base + 14..base + 15).is_empty());
        }
        assert_eq!(sm.current_state(), VideoState::PlayingVideo);
    }

    #[test]
    fn test_resume_backdated_to_first_absent_frame() {
        let mut sm = machine_in(VideoState::PausedVideo);
        let quiet = ScriptedProbe::new();

        let emitted = run(&mut sm, &quiet, 100..110);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, EventKind::VideoResumed);
        assert_eq!(emitted[0].timestamp_ms, 100 * 33);
        assert_eq!(sm.current_state(), VideoState::PlayingVideo);
    }

    #[test]
    fn test_noisy_rest_resumes_early() {
        let mut sm = machine_in(VideoState::PausedVideo);
        let emitted = run(&mut sm, &ScriptedProbe::with_noisy_rest(), 100..103);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, EventKind::VideoResumed);
        assert_eq!(emitted[0].timestamp_ms, 3300);
    }

    #[test]
    fn test_popup_reappearing_resets_absence() {
        let mut sm = machine_in(VideoState::PausedVideo);
        assert!(run(&mut sm, &ScriptedProbe::new(), 100..109).is_empty());
        assert!(run(&mut sm, &ScriptedProbe::with_popup(), 109..110).is_empty());
        assert_eq!(sm.counters().popup_absent, 0);

        let emitted = run(&mut sm, &ScriptedProbe::new(), 110..120);
        assert_eq!(emitted[0].timestamp_ms, 110 * 33);
    }

    #[test]
    fn test_popup_while_loading_backdates_start_and_interruption() {
        let mut sm = machine_in(VideoState::LoadingVideo);
        let probe = ScriptedProbe {
            initializing: true,
            ..ScriptedProbe::with_popup()
        };

        let emitted = run(&mut sm, &probe, 10..25);
        let kinds: Vec<EventKind> = emitted.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::StartPlaying, EventKind::ConnectionInterruption]);
        assert!(emitted.iter().all(|e| e.timestamp_ms == 330));
        assert_eq!(sm.current_state(), VideoState::PausedVideo);
    }

    #[test]
    fn test_loading_popup_gated_by_initialization() {
        let mut sm = machine_in(VideoState::LoadingVideo);
        assert!(run(&mut sm, &ScriptedProbe::with_popup(), 10..40).is_empty());
        assert_eq!(sm.current_state(), VideoState::LoadingVideo);
    }

    #[test]
    fn test_loading_interruption_uses_instant_clips() {
        let mut sm = machine_in(VideoState::LoadingVideo);
        let probe = ScriptedProbe {
            initializing: true,
            ..ScriptedProbe::with_popup()
        };
        let commands: Vec<Command> = (10..25).flat_map(|i| sm.process_frame(&probe, i)).collect();
        let modes: Vec<WriteMode> = commands
            .iter()
            .filter_map(|c| match c {
                Command::WriteClip { mode, .. } => Some(*mode),
                _ => None,
            })
            .collect();
        assert_eq!(modes, vec![WriteMode::Instant, WriteMode::Instant]);
    }

    #[test]
    fn test_unpaused_indicator_reported_once() {
        let mut sm = machine_in(VideoState::LoadingVideo);
        let probe = ScriptedProbe {
            bar: Some(800),
            unpaused: true,
            ..Default::default()
        };
        let emitted = run(&mut sm, &probe, 1..10);

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, EventKind::VideoEndInitializing);
        assert_eq!(emitted[0].timestamp_ms, 66);
    }

    #[test]
    fn test_fullscreen_cooldown_absorbs_signals() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        sm.config.skip_frames = 20;

        let toggle = ScriptedProbe {
            fullscreen_toggle: true,
            ..Default::default()
        };
        let emitted = run(&mut sm, &toggle, 10..11);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].value, Some(true));
        assert!(sm.is_fullscreen());

        // 冷却期内信号照样出现，但不产生事件
        let noisy = ScriptedProbe {
            fullscreen_toggle: true,
            url_change: true,
            ..ScriptedProbe::with_popup()
        };
        assert!(run(&mut sm, &noisy, 11..31).is_empty());
        assert_eq!(sm.skip_frames_left(), 0);

        let emitted = run(&mut sm, &toggle, 31..32);
        assert_eq!(emitted[0].value, Some(false));
    }

    #[test]
    fn test_fullscreen_disables_url_and_scroll_checks() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        run(
            &mut sm,
            &ScriptedProbe {
                fullscreen_toggle: true,
                ..Default::default()
            },
            10..11,
        );

        let probe = ScriptedProbe {
            url_change: true,
            scroll_edge: Some(40),
            ..Default::default()
        };
        assert!(run(&mut sm, &probe, 11..20).is_empty());
        assert_eq!(sm.current_state(), VideoState::PlayingVideo);
    }

    #[test]
    fn test_url_change_forgets_video() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        let emitted = run(
            &mut sm,
            &ScriptedProbe {
                url_change: true,
                ..Default::default()
            },
            10..11,
        );

        assert_eq!(emitted[0].kind, EventKind::UrlChanged);
        assert_eq!(sm.current_state(), VideoState::SiteChanged);
        assert_eq!(sm.previous_state(), VideoState::PlayingVideo);
        assert!(sm.contour().is_none());

        let emitted = run(&mut sm, &ScriptedProbe::initializing(), 11..12);
        assert_eq!(emitted[0].kind, EventKind::VideoStartInitializing);
        assert_eq!(sm.current_state(), VideoState::LoadingVideo);
        assert!(sm.contour().is_some());
    }

    #[test]
    fn test_site_change_carries_visible_popup() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        run(
            &mut sm,
            &ScriptedProbe {
                url_change: true,
                ..Default::default()
            },
            10..11,
        );

        let probe = ScriptedProbe {
            initializing: true,
            ..ScriptedProbe::with_popup()
        };
        run(&mut sm, &probe, 11..12);
        assert_eq!(sm.counters().popup_seen, 1);
        assert_eq!(sm.counters().first_seen_ms, Some(11 * 33));
    }

    #[test]
    fn test_scroll_away_and_back() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        let at = |edge| ScriptedProbe {
            scroll_edge: Some(edge),
            ..Default::default()
        };

        assert!(run(&mut sm, &at(500), 10..11).is_empty());
        let lost = run(&mut sm, &at(430), 11..12);
        assert_eq!(lost[0].kind, EventKind::VideoLost);
        assert!(sm.is_video_lost());

        // 丢失期间暂停播放检测
        let lost_with_popup = ScriptedProbe {
            scroll_edge: Some(430),
            ..ScriptedProbe::with_popup()
        };
        assert!(run(&mut sm, &lost_with_popup, 12..40).is_empty());

        let back = run(&mut sm, &at(500), 40..41);
        assert_eq!(back[0].kind, EventKind::VideoCameBack);
        assert!(!sm.is_video_lost());
        assert!(sm.contour().is_some());
    }

    #[test]
    fn test_fullscreen_toggle_breaks_popup_streak() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        let toggle = ScriptedProbe {
            fullscreen_toggle: true,
            ..Default::default()
        };

        assert!(run(&mut sm, &ScriptedProbe::with_popup(), 100..114).is_empty());
        let emitted = run(&mut sm, &toggle, 114..115);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, EventKind::FullScreenToggled);
        assert_eq!(sm.counters(), &Counters::default());

        assert!(run(&mut sm, &ScriptedProbe::with_popup(), 115..129).is_empty());
        assert_eq!(sm.current_state(), VideoState::PlayingVideo);

        let emitted = run(&mut sm, &ScriptedProbe::with_popup(), 129..130);
        assert_eq!(emitted[0].kind, EventKind::ConnectionInterruption);
        assert_eq!(emitted[0].timestamp_ms, 115 * 33);
    }

    #[test]
    fn test_lost_video_breaks_popup_streak() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        let popup_at = |edge| ScriptedProbe {
            scroll_edge: Some(edge),
            ..ScriptedProbe::with_popup()
        };
        let away = ScriptedProbe {
            scroll_edge: Some(430),
            ..Default::default()
        };

        assert!(run(&mut sm, &popup_at(500), 10..24).is_empty());
        let lost = run(&mut sm, &away, 24..79);
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].kind, EventKind::VideoLost);

        let back = run(&mut sm, &popup_at(500), 79..80);
        let kinds: Vec<EventKind> = back.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EventKind::VideoCameBack]);
        assert_eq!(sm.counters().popup_seen, 1);
        assert_eq!(sm.counters().first_seen_ms, Some(79 * 33));

        let emitted = run(&mut sm, &popup_at(500), 80..94);
        assert_eq!(emitted[0].kind, EventKind::ConnectionInterruption);
        assert_eq!(emitted[0].timestamp_ms, 79 * 33);
    }

    #[test]
    fn test_cooldown_breaks_absence_streak() {
        let mut sm = machine_in(VideoState::PausedVideo);
        sm.config.skip_frames = 5;
        let toggle = ScriptedProbe {
            fullscreen_toggle: true,
            ..Default::default()
        };

        assert!(run(&mut sm, &ScriptedProbe::new(), 100..109).is_empty());
        run(&mut sm, &toggle, 109..110);
        assert!(run(&mut sm, &ScriptedProbe::new(), 110..115).is_empty());
        assert_eq!(sm.skip_frames_left(), 0);
        assert_eq!(sm.counters().popup_absent, 0);

        let emitted = run(&mut sm, &ScriptedProbe::new(), 115..125);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].kind, EventKind::VideoResumed);
        assert_eq!(emitted[0].timestamp_ms, 115 * 33);
    }

    #[test]
    fn test_url_change_cooldown_absorbs_signals() {
        let mut sm = machine_in(VideoState::PlayingVideo);
        sm.config.skip_frames = 20;

        let emitted = run(
            &mut sm,
            &ScriptedProbe {
                url_change: true,
                ..Default::default()
            },
            10..11,
        );
        assert_eq!(emitted[0].kind, EventKind::UrlChanged);
        assert_eq!(sm.skip_frames_left(), 20);

        let noisy = ScriptedProbe {
            initializing: true,
            fullscreen_toggle: true,
            url_change: true,
            ..ScriptedProbe::with_popup()
        };
        assert!(run(&mut sm, &noisy, 11..31).is_empty());
        assert_eq!(sm.current_state(), VideoState::SiteChanged);
        assert_eq!(sm.skip_frames_left(), 0);
        assert!(!sm.is_fullscreen());

        let emitted = run(&mut sm, &ScriptedProbe::initializing(), 31..32);
        assert_eq!(emitted[0].kind, EventKind::VideoStartInitializing);
        assert_eq!(sm.current_state(), VideoState::LoadingVideo);
    }

    #[test]
    fn test_event_ids_strictly_increasing() {
        let mut sm = StateMachine::with_config(MachineConfig {
            skip_frames: 2,
            ..Default::default()
        });
        let script: Vec<(ScriptedProbe, u64)> = vec![
            (ScriptedProbe::initializing(), 5),
            (ScriptedProbe::moving(), 6),
            (ScriptedProbe::with_popup(), 20),
            (ScriptedProbe::new(), 12),
            (
                ScriptedProbe {
                    fullscreen_toggle: true,
                    ..Default::default()
                },
                1,
            ),
            (ScriptedProbe::with_popup(), 20),
        ];

        let mut ids = Vec::new();
        let mut ts = 0;
        for (probe, frames) in &script {
            for _ in 0..*frames {
                for record in events(&sm.process_frame(probe, ts)) {
                    ids.push(record.event_id);
                }
                ts += 33;
            }
        }

        assert!(ids.len() >= 5);
        let expected: Vec<u64> = (1..=ids.len() as u64).collect();
        assert_eq!(ids, expected);
        assert_eq!(sm.events_emitted(), ids.len() as u64);
    }

    #[test]
    fn test_counters_reset_on_transition() {
        let mut sm = machine_in(VideoState::LoadingVideo);
        run(&mut sm, &ScriptedProbe::moving(), 1..3);
        assert_eq!(sm.counters().motion, 2);

        run(&mut sm, &ScriptedProbe::moving(), 3..4);
        assert_eq!(sm.current_state(), VideoState::PlayingVideo);
        assert_eq!(sm.counters(), &Counters::default());
    }
}
