//! 检测参数。默认值针对 1920x1080 录屏、单一播放器布局调校。

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::video::Rect;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config parse error: {0}")]
    Parse(#[from] json5::Error),
}

/// 启发式检测器参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// 定位播放器时开运算核大小（去掉页面上的细小内容）
    pub player_open_kernel: u32,
    /// 帧差轮廓的平滑核大小
    pub smoothing_kernel: u32,
    /// 帧差灰度大于该值才算变化
    pub diff_threshold: u8,
    /// 初始化检测的内部采样网格密度
    pub init_grid_size: u32,
    /// 轮廓简化时的近重复点容差（像素）
    pub simplify_tolerance: i32,
    pub inline_check_spacing: i32,
    pub inline_side_checks: i32,
    pub indicator_zone_width: u32,
    pub indicator_threshold: u8,
    /// 帧差轮廓数超过该值视为画面在动
    pub motion_contour_threshold: usize,
    pub popup_box_x_offset: f64,
    pub popup_box_y_offset: f64,
    pub popup_min_contours: usize,
    pub popup_max_contours: usize,
    /// 弹窗外区域允许的最大轮廓数，超过即为“嘈杂”
    pub popup_rest_max_contours: usize,
    pub url_bar_rect: Rect,
    pub url_change_contour_threshold: usize,
    pub fullscreen_icon_rect: Rect,
    /// 滚动条采样列距右边缘的距离
    pub scroll_bar_offset: u32,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            player_open_kernel: 111,
            smoothing_kernel: 3,
            diff_threshold: 25,
            init_grid_size: 3,
            simplify_tolerance: 5,
            inline_check_spacing: 100,
            inline_side_checks: 3,
            indicator_zone_width: 50,
            indicator_threshold: 200,
            motion_contour_threshold: 3,
            popup_box_x_offset: 0.10,
            popup_box_y_offset: 0.20,
            popup_min_contours: 1,
            popup_max_contours: 4,
            popup_rest_max_contours: 1,
            url_bar_rect: Rect::new(260, 48, 900, 32),
            url_change_contour_threshold: 4,
            fullscreen_icon_rect: Rect::new(1860, 1040, 36, 28),
            scroll_bar_offset: 9,
        }
    }
}

/// 状态机去抖阈值（单位：帧）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    pub popup_confirm_frames: u32,
    pub popup_absent_frames: u32,
    /// 连续多少帧弹窗外区域嘈杂即判定弹窗已消失
    pub rest_noise_budget: u32,
    pub motion_confirm_frames: u32,
    /// 界面切换（全屏、地址栏、初始化）后跳过检测的帧数
    pub skip_frames: u32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            popup_confirm_frames: 15,
            popup_absent_frames: 10,
            rest_noise_budget: 3,
            motion_confirm_frames: 3,
            skip_frames: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// 环形缓冲容量（帧），也是片段长度
    pub capacity: usize,
    /// 片段编码帧率，与源帧率无关
    pub fps: u32,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            capacity: 30,
            fps: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub heuristics: HeuristicsConfig,
    pub machine: MachineConfig,
    pub clip: ClipConfig,
}

impl AnalyzerConfig {
    pub fn from_json5_str(text: &str) -> Result<Self, ConfigError> {
        Ok(json5::from_str(text)?)
    }

    pub fn from_json5_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json5_str(&text)
    }
}
