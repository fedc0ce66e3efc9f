use crate::core::video::{Contour, Frame, Point};
use crate::event_detector::config::HeuristicsConfig;
use crate::event_detector::heuristics::{self, PopupReading};

/// 状态机对一帧对（previous, next）的全部提问。
///
/// 状态机只调用当前状态需要的检测，所以这里按需计算，不预先求值。
pub trait SignalProbe {
    fn frame_size(&self) -> (u32, u32);

    fn locate_player(&self) -> Option<Contour>;

    fn is_initializing(&self, region: &Contour) -> bool;

    fn bar_height(&self, region: &Contour) -> Option<i32>;

    fn is_unpaused(&self, region: &Contour, bar_y: i32) -> bool;

    fn is_moving(&self, region: &Contour) -> bool;

    fn popup(&self, region: &Contour) -> PopupReading;

    fn url_changed(&self) -> bool;

    fn fullscreen_toggled(&self) -> bool;

    /// None 表示没有可见的滚动条
    fn scroll_bar_edge(&self) -> Option<u32>;
}

/// 基于真实像素的检测
pub struct FrameProbe<'a> {
    previous: &'a Frame,
    next: &'a Frame,
    config: &'a HeuristicsConfig,
}

impl<'a> FrameProbe<'a> {
    pub fn new(previous: &'a Frame, next: &'a Frame, config: &'a HeuristicsConfig) -> Self {
        Self {
            previous,
            next,
            config,
        }
    }
}

impl SignalProbe for FrameProbe<'_> {
    fn frame_size(&self) -> (u32, u32) {
        self.previous.size()
    }

    fn locate_player(&self) -> Option<Contour> {
        heuristics::locate_player(self.previous, self.config)
    }

    fn is_initializing(&self, region: &Contour) -> bool {
        heuristics::is_video_initializing(self.previous, region, self.config)
    }

    fn bar_height(&self, region: &Contour) -> Option<i32> {
        heuristics::find_bar_height(self.previous, region, self.config)
    }

    fn is_unpaused(&self, region: &Contour, bar_y: i32) -> bool {
        heuristics::indicator_zone(region, bar_y, self.config)
            .map(|zone| heuristics::is_unpaused_indicator(self.previous, zone, self.config))
            .unwrap_or(false)
    }

    fn is_moving(&self, region: &Contour) -> bool {
        heuristics::is_video_playing(self.previous, self.next, region, self.config)
    }

    fn popup(&self, region: &Contour) -> PopupReading {
        heuristics::read_loading_popup(self.previous, self.next, region, self.config)
    }

    fn url_changed(&self) -> bool {
        heuristics::has_url_bar_changed(self.previous, self.next, self.config)
    }

    fn fullscreen_toggled(&self) -> bool {
        heuristics::has_fullscreen_toggled(self.previous, self.next, self.config)
    }

    fn scroll_bar_edge(&self) -> Option<u32> {
        heuristics::find_bottom_scroll_bar_point(self.previous, self.config)
    }
}

/// 测试用：每个信号直接给定
#[derive(Debug, Clone)]
pub struct ScriptedProbe {
    pub size: (u32, u32),
    pub player: Option<Contour>,
    pub initializing: bool,
    pub bar: Option<i32>,
    pub unpaused: bool,
    pub moving: bool,
    pub popup_reading: PopupReading,
    pub url_change: bool,
    pub fullscreen_toggle: bool,
    pub scroll_edge: Option<u32>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self {
            size: (1920, 1080),
            player: Some(Contour::new(vec![
                Point::new(100, 100),
                Point::new(1380, 100),
                Point::new(1380, 820),
                Point::new(100, 820),
            ])),
            initializing: false,
            bar: None,
            unpaused: false,
            moving: false,
            popup_reading: PopupReading::default(),
            url_change: false,
            fullscreen_toggle: false,
            scroll_edge: None,
        }
    }

    pub fn initializing() -> Self {
        Self {
            initializing: true,
            ..Self::new()
        }
    }

    pub fn moving() -> Self {
        Self {
            moving: true,
            ..Self::new()
        }
    }

    /// 弹窗区域有 2 个轮廓，其余区域安静
    pub fn with_popup() -> Self {
        Self {
            popup_reading: PopupReading {
                popup_contours: 2,
                rest_contours: 0,
                visible: true,
                rest_noisy: false,
            },
            ..Self::new()
        }
    }

    pub fn with_noisy_rest() -> Self {
        Self {
            popup_reading: PopupReading {
                popup_contours: 0,
                rest_contours: 6,
                visible: false,
                rest_noisy: true,
            },
            ..Self::new()
        }
    }
}

impl Default for ScriptedProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalProbe for ScriptedProbe {
    fn frame_size(&self) -> (u32, u32) {
        self.size
    }

    fn locate_player(&self) -> Option<Contour> {
        self.player.clone()
    }

    fn is_initializing(&self, _region: &Contour) -> bool {
        self.initializing
    }

    fn bar_height(&self, _region: &Contour) -> Option<i32> {
        self.bar
    }

    fn is_unpaused(&self, _region: &Contour, _bar_y: i32) -> bool {
        self.unpaused
    }

    fn is_moving(&self, _region: &Contour) -> bool {
        self.moving
    }

    fn popup(&self, _region: &Contour) -> PopupReading {
        self.popup_reading
    }

    fn url_changed(&self) -> bool {
        self.url_change
    }

    fn fullscreen_toggled(&self) -> bool {
        self.fullscreen_toggle
    }

    fn scroll_bar_edge(&self) -> Option<u32> {
        self.scroll_edge
    }
}
