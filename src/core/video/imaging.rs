//! 图像分析原语：灰度、帧差、二值化、开运算、外轮廓提取
//!
//! 全部为无状态函数，输入帧只读。

use image::{GrayImage, Luma};
use std::collections::VecDeque;

use super::contour::{Contour, Point, Rect};
use super::frame::{Frame, Rgb};

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// 8 邻域，按顺时针（y 轴向下）排列
const DIRS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

#[inline]
pub fn luma(rgb: Rgb) -> u8 {
    ((rgb[0] as u32 * 299 + rgb[1] as u32 * 587 + rgb[2] as u32 * 114) / 1000) as u8
}

#[inline]
fn rgb_at(frame: &Frame, x: u32, y: u32) -> Rgb {
    let idx = ((y * frame.width + x) * 3) as usize;
    [frame.data[idx], frame.data[idx + 1], frame.data[idx + 2]]
}

/// 区域灰度图，`rect` 需已裁剪到帧内
pub fn grayscale(frame: &Frame, rect: Rect) -> GrayImage {
    GrayImage::from_fn(rect.width, rect.height, |x, y| {
        Luma([luma(rgb_at(frame, rect.x + x, rect.y + y))])
    })
}

/// 两帧在区域内的逐通道绝对差，再转灰度
pub fn abs_diff(a: &Frame, b: &Frame, rect: Rect) -> GrayImage {
    GrayImage::from_fn(rect.width, rect.height, |x, y| {
        let pa = rgb_at(a, rect.x + x, rect.y + y);
        let pb = rgb_at(b, rect.x + x, rect.y + y);
        Luma([luma([
            pa[0].abs_diff(pb[0]),
            pa[1].abs_diff(pb[1]),
            pa[2].abs_diff(pb[2]),
        ])])
    })
}

/// 大于 level 的像素置为前景
pub fn threshold(img: &GrayImage, level: u8) -> GrayImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0[0] = if p.0[0] > level { FOREGROUND } else { BACKGROUND };
    }
    out
}

pub fn invert(img: &mut GrayImage) {
    for p in img.pixels_mut() {
        p.0[0] = 255 - p.0[0];
    }
}

/// 清零矩形区域（坐标相对于 img）
pub fn clear_rect(img: &mut GrayImage, rect: Rect) {
    let (w, h) = img.dimensions();
    for y in rect.y..rect.bottom().min(h) {
        for x in rect.x..rect.right().min(w) {
            img.put_pixel(x, y, Luma([BACKGROUND]));
        }
    }
}

/// 二值开运算（先腐蚀后膨胀），方形核，图像边缘不参与腐蚀
pub fn morph_open(img: &GrayImage, kernel: u32) -> GrayImage {
    if kernel <= 1 {
        return img.clone();
    }
    let radius = (kernel / 2) as usize;
    let eroded = window_filter(&window_filter(img, radius, true, true), radius, true, false);
    window_filter(&window_filter(&eroded, radius, false, true), radius, false, false)
}

/// 一维窗口滤波：腐蚀要求窗口内全为前景，膨胀要求至少一个前景。
/// 用前缀和计数，复杂度与核大小无关。
fn window_filter(img: &GrayImage, radius: usize, erode: bool, horizontal: bool) -> GrayImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let (lines, len) = if horizontal { (h, w) } else { (w, h) };
    let mut out = GrayImage::new(img.width(), img.height());
    let mut prefix = vec![0u32; len + 1];

    for line in 0..lines {
        let at = |i: usize| -> (u32, u32) {
            if horizontal {
                (i as u32, line as u32)
            } else {
                (line as u32, i as u32)
            }
        };
        for i in 0..len {
            let (x, y) = at(i);
            prefix[i + 1] = prefix[i] + (img.get_pixel(x, y).0[0] > 0) as u32;
        }
        for i in 0..len {
            let lo = i.saturating_sub(radius);
            let hi = (i + radius + 1).min(len);
            let count = prefix[hi] - prefix[lo];
            let on = if erode {
                count as usize == hi - lo
            } else {
                count > 0
            };
            let (x, y) = at(i);
            out.put_pixel(x, y, Luma([if on { FOREGROUND } else { BACKGROUND }]));
        }
    }
    out
}

/// 外轮廓提取（前景 8 连通，背景 4 连通）。
///
/// 位于其他连通域孔洞内的连通域不是外轮廓，不返回。
/// 返回的点只保留方向改变处，轴对齐矩形得到 4 个角点。
pub fn find_external_contours(img: &GrayImage) -> Vec<Contour> {
    let (w, h) = (img.width() as i32, img.height() as i32);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let idx = |x: i32, y: i32| (y * w + x) as usize;
    let is_fg = |x: i32, y: i32| x >= 0 && y >= 0 && x < w && y < h && img.get_pixel(x as u32, y as u32).0[0] > 0;

    // 从边界出发可达的背景
    let mut outside = vec![false; (w * h) as usize];
    let mut queue = VecDeque::new();
    for y in 0..h {
        for x in 0..w {
            let on_border = x == 0 || y == 0 || x == w - 1 || y == h - 1;
            if on_border && !is_fg(x, y) {
                outside[idx(x, y)] = true;
                queue.push_back((x, y));
            }
        }
    }
    while let Some((x, y)) = queue.pop_front() {
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            let (nx, ny) = (x + dx, y + dy);
            if nx >= 0 && ny >= 0 && nx < w && ny < h && !is_fg(nx, ny) && !outside[idx(nx, ny)] {
                outside[idx(nx, ny)] = true;
                queue.push_back((nx, ny));
            }
        }
    }

    let mut visited = vec![false; (w * h) as usize];
    let mut contours = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if !is_fg(x, y) || visited[idx(x, y)] {
                continue;
            }
            let mut external = false;
            let mut pixel_count = 0usize;
            visited[idx(x, y)] = true;
            queue.push_back((x, y));
            while let Some((cx, cy)) = queue.pop_front() {
                pixel_count += 1;
                if cx == 0 || cy == 0 || cx == w - 1 || cy == h - 1 {
                    external = true;
                }
                for (dx, dy) in DIRS {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= w || ny >= h {
                        continue;
                    }
                    if is_fg(nx, ny) {
                        if !visited[idx(nx, ny)] {
                            visited[idx(nx, ny)] = true;
                            queue.push_back((nx, ny));
                        }
                    } else if dx == 0 || dy == 0 {
                        external |= outside[idx(nx, ny)];
                    }
                }
            }
            if external {
                let chain = trace_boundary(&is_fg, Point::new(x, y), pixel_count);
                contours.push(compress_chain(chain));
            }
        }
    }
    contours
}

fn dir_index(dx: i32, dy: i32) -> usize {
    DIRS.iter()
        .position(|&d| d == (dx, dy))
        .unwrap_or(4)
}

/// Moore 邻域边界跟踪，start 必须是连通域的光栅序第一个像素
fn trace_boundary<F>(is_fg: &F, start: Point, pixel_count: usize) -> Vec<Point>
where
    F: Fn(i32, i32) -> bool,
{
    let mut chain = vec![start];
    let mut current = start;
    let mut back = Point::new(start.x - 1, start.y);
    let mut first_move: Option<Point> = None;
    let limit = pixel_count * 4 + 16;

    for _ in 0..limit {
        let k = dir_index(back.x - current.x, back.y - current.y);
        let mut next = None;
        for i in 1..=8 {
            let (dx, dy) = DIRS[(k + i) % 8];
            let q = Point::new(current.x + dx, current.y + dy);
            if is_fg(q.x, q.y) {
                next = Some(q);
                break;
            }
            back = q;
        }
        let Some(next) = next else {
            break; // 孤立像素
        };
        if current == start {
            match first_move {
                None => first_move = Some(next),
                Some(first) if first == next => break,
                Some(_) => {}
            }
        }
        current = next;
        chain.push(next);
    }

    if chain.len() > 1 && chain.last() == Some(&start) {
        chain.pop();
    }
    chain
}

fn compress_chain(chain: Vec<Point>) -> Contour {
    let n = chain.len();
    if n <= 2 {
        return Contour::new(chain);
    }
    let step = |a: Point, b: Point| (b.x - a.x, b.y - a.y);
    let kept: Vec<Point> = (0..n)
        .filter(|&i| {
            let prev = chain[(i + n - 1) % n];
            let next = chain[(i + 1) % n];
            step(prev, chain[i]) != step(chain[i], next)
        })
        .map(|i| chain[i])
        .collect();
    if kept.is_empty() {
        Contour::new(vec![chain[0]])
    } else {
        Contour::new(kept)
    }
}
