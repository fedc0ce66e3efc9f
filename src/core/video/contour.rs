//! 轮廓与矩形区域

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 轴对齐矩形，坐标为像素
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// 裁剪到帧尺寸内；完全在外时返回 None
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Option<Rect> {
        if self.x >= frame_width || self.y >= frame_height {
            return None;
        }
        let clamped = Rect::new(
            self.x,
            self.y,
            self.width.min(frame_width - self.x),
            self.height.min(frame_height - self.y),
        );
        (!clamped.is_empty()).then_some(clamped)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

/// Inclusive min/max coordinates of a contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl Bounds {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }

    pub fn to_rect(&self) -> Option<Rect> {
        if self.min_x < 0 || self.min_y < 0 || self.width() <= 0 || self.height() <= 0 {
            return None;
        }
        Some(Rect::new(
            self.min_x as u32,
            self.min_y as u32,
            self.width() as u32 + 1,
            self.height() as u32 + 1,
        ))
    }
}

/// 有序边界点序列
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Contour {
    points: Vec<Point>,
}

impl Contour {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// 整帧矩形（全屏模式下作为感兴趣区域）
    pub fn full_frame(width: u32, height: u32) -> Self {
        let (w, h) = (width as i32 - 1, height as i32 - 1);
        Self::new(vec![
            Point::new(0, 0),
            Point::new(w, 0),
            Point::new(w, h),
            Point::new(0, h),
        ])
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let first = self.points.first()?;
        let mut bounds = Bounds {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for p in &self.points[1..] {
            bounds.min_x = bounds.min_x.min(p.x);
            bounds.max_x = bounds.max_x.max(p.x);
            bounds.min_y = bounds.min_y.min(p.y);
            bounds.max_y = bounds.max_y.max(p.y);
        }
        Some(bounds)
    }

    /// 有面积的轮廓才能作为检测区域
    pub fn is_degenerate(&self) -> bool {
        self.bounds().and_then(|b| b.to_rect()).is_none()
    }

    /// Shoelace area of the polygon through the points.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        (twice as f64 / 2.0).abs()
    }

    /// 去掉与已保留点在 tolerance 内（切比雪夫距离）的近重复点
    pub fn simplify(&self, tolerance: i32) -> Contour {
        let mut kept: Vec<Point> = Vec::with_capacity(self.points.len());
        for &p in &self.points {
            let close = kept
                .iter()
                .any(|k| (k.x - p.x).abs() <= tolerance && (k.y - p.y).abs() <= tolerance);
            if !close {
                kept.push(p);
            }
        }
        Contour::new(kept)
    }

    pub fn is_rectangular(&self) -> bool {
        self.points.len() == 4
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Contour {
        Contour::new(
            self.points
                .iter()
                .map(|p| Point::new(p.x + dx, p.y + dy))
                .collect(),
        )
    }
}
