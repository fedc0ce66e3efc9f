//! 启发式检测器：建立在图像原语之上的逐帧判定，全部无状态

use crate::core::video::imaging::{self, abs_diff, find_external_contours, morph_open, threshold};
use crate::core::video::{Contour, Frame, Rect, Rgb, BLACK};
use crate::event_detector::config::HeuristicsConfig;

/// 加载弹窗检测结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopupReading {
    pub popup_contours: usize,
    pub rest_contours: usize,
    pub visible: bool,
    /// 弹窗外区域有明显变化（画面在播放）
    pub rest_noisy: bool,
}

/// 轮廓外接矩形，裁剪到帧内；退化轮廓返回 None
pub fn region_rect(contour: &Contour, frame_width: u32, frame_height: u32) -> Option<Rect> {
    contour
        .bounds()
        .and_then(|b| b.to_rect())
        .and_then(|r| r.clamp_to(frame_width, frame_height))
}

/// 灰度 -> 二值 -> 开运算 -> 反相 -> 外轮廓，坐标换算回整帧
pub fn find_all_contours(frame: &Frame, rect: Rect, kernel: u32) -> Vec<Contour> {
    let gray = imaging::grayscale(frame, rect);
    let mut binary = morph_open(&threshold(&gray, 0), kernel);
    imaging::invert(&mut binary);
    find_external_contours(&binary)
        .into_iter()
        .map(|c| c.translated(rect.x as i32, rect.y as i32))
        .collect()
}

/// 最大的暗色区域即播放器
pub fn locate_player(frame: &Frame, config: &HeuristicsConfig) -> Option<Contour> {
    let full = Rect::new(0, 0, frame.width, frame.height);
    find_all_contours(frame, full, config.player_open_kernel)
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))
        .map(|c| c.simplify(config.simplify_tolerance))
}

pub fn is_video_initializing(frame: &Frame, contour: &Contour, config: &HeuristicsConfig) -> bool {
    contour.is_rectangular() && is_contour_all_black(frame, contour, config.init_grid_size)
}

/// 内部网格采样全黑，允许一个例外（鼠标指针）
pub fn is_contour_all_black(frame: &Frame, contour: &Contour, grid_size: u32) -> bool {
    let Some(bounds) = contour.bounds() else {
        return false;
    };
    let divisions = grid_size as i32 + 1;
    let x_spacing = bounds.width() / divisions;
    let y_spacing = bounds.height() / divisions;
    let mut possible_mouse_encounters = 0;

    for ix in 1..divisions {
        for iy in 1..divisions {
            let x = bounds.min_x + ix * x_spacing;
            let y = bounds.min_y + iy * y_spacing;
            if frame.pixel(x as i64, y as i64) != Some(BLACK) {
                possible_mouse_encounters += 1;
                if possible_mouse_encounters > 1 {
                    return false;
                }
            }
        }
    }
    true
}

/// 沿中线自下而上寻找控制条所在行
pub fn find_bar_height(frame: &Frame, contour: &Contour, config: &HeuristicsConfig) -> Option<i32> {
    let bounds = contour.bounds()?;
    let center_x = bounds.min_x + bounds.width() / 2;

    ((bounds.min_y + 1)..=bounds.max_y).rev().find(|&y| {
        match frame.pixel(center_x as i64, y as i64) {
            Some(pixel) if pixel != BLACK => are_pixels_inline_same(frame, pixel, center_x, y, config),
            _ => false,
        }
    })
}

/// 同一行两侧等间距采样，颜色一致（最多一处不同）
pub fn are_pixels_inline_same(frame: &Frame, pixel: Rgb, x: i32, y: i32, config: &HeuristicsConfig) -> bool {
    let mut mismatches = 0;
    for i in 1..=config.inline_side_checks {
        let offset = config.inline_check_spacing * i;
        for sample_x in [x + offset, x - offset] {
            if frame.pixel(sample_x as i64, y as i64) != Some(pixel) {
                mismatches += 1;
            }
        }
        if mismatches > 1 {
            return false;
        }
    }
    true
}

/// 控制条下方、播放器左侧的播放/暂停图标区域
pub fn indicator_zone(contour: &Contour, bar_y: i32, config: &HeuristicsConfig) -> Option<Rect> {
    let bounds = contour.bounds()?;
    if bar_y > bounds.max_y || bar_y < bounds.min_y || bounds.min_x < 0 {
        return None;
    }
    let rect = Rect::new(
        bounds.min_x as u32,
        bar_y as u32,
        config.indicator_zone_width,
        (bounds.max_y - bar_y) as u32,
    );
    (!rect.is_empty()).then_some(rect)
}

/// 图标区域内恰好两个亮色块（暂停图标的两道竖条）表示正在播放
pub fn is_unpaused_indicator(frame: &Frame, zone: Rect, config: &HeuristicsConfig) -> bool {
    let Some(zone) = zone.clamp_to(frame.width, frame.height) else {
        return false;
    };
    let gray = imaging::grayscale(frame, zone);
    let binary = threshold(&gray, config.indicator_threshold);
    find_external_contours(&binary).len() == 2
}

/// 区域内帧差的轮廓数；mask 内（整帧坐标）的变化不计
pub fn count_diff_contours(
    previous: &Frame,
    next: &Frame,
    rect: Rect,
    mask: Option<Rect>,
    config: &HeuristicsConfig,
) -> usize {
    let Some(rect) = rect.clamp_to(previous.width, previous.height) else {
        return 0;
    };
    let diff = abs_diff(previous, next, rect);
    let mut binary = morph_open(&threshold(&diff, config.diff_threshold), config.smoothing_kernel);
    if let Some(mask) = mask {
        let local = Rect::new(
            mask.x.saturating_sub(rect.x),
            mask.y.saturating_sub(rect.y),
            mask.width,
            mask.height,
        );
        imaging::clear_rect(&mut binary, local);
    }
    find_external_contours(&binary).len()
}

pub fn is_video_playing(previous: &Frame, next: &Frame, region: &Contour, config: &HeuristicsConfig) -> bool {
    let Some(rect) = region_rect(region, previous.width, previous.height) else {
        return false;
    };
    count_diff_contours(previous, next, rect, None, config) > config.motion_contour_threshold
}

/// 弹窗候选区：以区域中心为准，水平 ±x_offset、垂直 ±y_offset
pub fn popup_box(region: Rect, config: &HeuristicsConfig) -> Rect {
    let (w, h) = (region.width as f64, region.height as f64);
    let x0 = region.x as f64 + w * (0.5 - config.popup_box_x_offset);
    let y0 = region.y as f64 + h * (0.5 - config.popup_box_y_offset);
    Rect::new(
        x0.max(0.0) as u32,
        y0.max(0.0) as u32,
        (w * 2.0 * config.popup_box_x_offset).round() as u32,
        (h * 2.0 * config.popup_box_y_offset).round() as u32,
    )
}

pub fn read_loading_popup(
    previous: &Frame,
    next: &Frame,
    region: &Contour,
    config: &HeuristicsConfig,
) -> PopupReading {
    let Some(rect) = region_rect(region, previous.width, previous.height) else {
        return PopupReading::default();
    };
    let popup = popup_box(rect, config);
    let popup_contours = count_diff_contours(previous, next, popup, None, config);
    let rest_contours = count_diff_contours(previous, next, rect, Some(popup), config);

    let rest_quiet = rest_contours <= config.popup_rest_max_contours;
    let visible = rest_quiet
        && (config.popup_min_contours..=config.popup_max_contours).contains(&popup_contours);

    PopupReading {
        popup_contours,
        rest_contours,
        visible,
        rest_noisy: !rest_quiet,
    }
}

pub fn has_url_bar_changed(previous: &Frame, next: &Frame, config: &HeuristicsConfig) -> bool {
    count_diff_contours(previous, next, config.url_bar_rect, None, config)
        >= config.url_change_contour_threshold
}

pub fn has_fullscreen_toggled(previous: &Frame, next: &Frame, config: &HeuristicsConfig) -> bool {
    count_diff_contours(previous, next, config.fullscreen_icon_rect, None, config) > 0
}

/// 右侧滚动条采样列自下而上第一处颜色变化的行；没有则为 None
pub fn find_bottom_scroll_bar_point(frame: &Frame, config: &HeuristicsConfig) -> Option<u32> {
    if frame.width <= config.scroll_bar_offset || frame.height < 4 {
        return None;
    }
    let x = (frame.width - config.scroll_bar_offset) as i64;
    (2..=frame.height - 2)
        .rev()
        .find(|&y| frame.pixel(x, y as i64 - 1) != frame.pixel(x, y as i64))
}
