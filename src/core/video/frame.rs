use image::{RgbImage, RgbaImage};
use std::time::Duration;

use super::error::VideoError;

pub type Rgb = [u8; 3];

pub const BLACK: Rgb = [0, 0, 0];

/// 帧数据结构（只读，解码后不再修改）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        debug_assert_eq!(data.len(), (width * height * 3) as usize);
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    /// 纯色帧，主要用于测试和合成输入
    pub fn filled(width: u32, height: u32, color: Rgb, timestamp_ms: u64, frame_number: u64) -> Self {
        let data = color
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(width, height, data, timestamp_ms, frame_number)
    }

    pub fn from_image(image: RgbImage, timestamp_ms: u64, frame_number: u64) -> Self {
        let (width, height) = image.dimensions();
        Self::new(width, height, image.into_raw(), timestamp_ms, frame_number)
    }

    pub fn from_raw_rgb(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, VideoError> {
        let expected = (width * height * 3) as usize;
        if data.len() != expected {
            return Err(VideoError::Decode(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self::new(width, height, data, timestamp_ms, frame_number))
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }

    /// 越界时返回 None
    pub fn pixel(&self, x: i64, y: i64) -> Option<Rgb> {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return None;
        }
        let idx = ((y as usize) * self.width as usize + x as usize) * 3;
        Some([self.data[idx], self.data[idx + 1], self.data[idx + 2]])
    }

    pub fn to_rgba(&self) -> RgbaImage {
        let mut rgba = Vec::with_capacity(self.pixel_count() * 4);
        for chunk in self.data.chunks_exact(3) {
            rgba.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
        }
        // 长度由构造保证
        RgbaImage::from_raw(self.width, self.height, rgba)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }

    /// 复制一份并把矩形区域涂成指定颜色（测试合成帧用）
    pub fn with_rect(&self, x: u32, y: u32, w: u32, h: u32, color: Rgb) -> Frame {
        let mut data = self.data.clone();
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                let idx = ((py * self.width + px) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&color);
            }
        }
        Frame {
            width: self.width,
            height: self.height,
            data,
            timestamp: self.timestamp,
            frame_number: self.frame_number,
        }
    }

    pub fn with_timestamp(mut self, timestamp_ms: u64, frame_number: u64) -> Frame {
        self.timestamp = Duration::from_millis(timestamp_ms);
        self.frame_number = frame_number;
        self
    }
}

/// 帧元数据（轻量级，用于传递信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct FrameInfo {
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl FrameInfo {
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            timestamp_ms: frame.timestamp_ms(),
            frame_number: frame.frame_number,
        }
    }
}
