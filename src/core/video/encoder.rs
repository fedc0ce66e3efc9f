//! 事件片段编码

use image::codecs::gif::{GifEncoder, Repeat};
use image::Delay;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use super::error::VideoError;
use super::frame::Frame;

pub trait ClipEncoder: Send + Sync {
    /// 片段文件扩展名（不含点）
    fn extension(&self) -> &'static str;

    fn encode(&self, frames: &[Arc<Frame>], path: &Path) -> Result<(), VideoError>;
}

/// 动画 GIF 片段，帧率固定，与源帧率无关
pub struct GifClipEncoder {
    fps: u32,
}

impl GifClipEncoder {
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }
}

impl Default for GifClipEncoder {
    fn default() -> Self {
        Self::new(60)
    }
}

impl ClipEncoder for GifClipEncoder {
    fn extension(&self) -> &'static str {
        "gif"
    }

    fn encode(&self, frames: &[Arc<Frame>], path: &Path) -> Result<(), VideoError> {
        if frames.is_empty() {
            return Err(VideoError::Decode("empty clip".to_string()));
        }
        let writer = BufWriter::new(File::create(path)?);
        let mut encoder = GifEncoder::new(writer);
        encoder.set_repeat(Repeat::Infinite)?;

        let delay = Delay::from_numer_denom_ms(1000, self.fps);
        encoder.encode_frames(
            frames
                .iter()
                .map(|f| image::Frame::from_parts(f.to_rgba(), 0, 0, delay)),
        )?;
        Ok(())
    }
}

#[cfg(feature = "opencv")]
pub use opencv_encoder::Mp4ClipEncoder;

#[cfg(feature = "opencv")]
mod opencv_encoder {
    use super::*;
    use opencv::{
        core::{self, Mat},
        imgproc,
        prelude::*,
        videoio::VideoWriter,
    };

    /// mp4v 编码，帧率固定
    pub struct Mp4ClipEncoder {
        fps: f64,
    }

    impl Mp4ClipEncoder {
        pub fn new(fps: u32) -> Self {
            Self { fps: fps.max(1) as f64 }
        }
    }

    impl ClipEncoder for Mp4ClipEncoder {
        fn extension(&self) -> &'static str {
            "mp4"
        }

        fn encode(&self, frames: &[Arc<Frame>], path: &Path) -> Result<(), VideoError> {
            let Some(first) = frames.first() else {
                return Err(VideoError::Decode("empty clip".to_string()));
            };
            let fourcc = VideoWriter::fourcc('m', 'p', '4', 'v')?;
            let size = core::Size::new(first.width as i32, first.height as i32);
            let mut writer = VideoWriter::new(&path.to_string_lossy(), fourcc, self.fps, size, true)?;

            for frame in frames {
                let rgb = Mat::from_slice(&frame.data)?;
                let rgb = rgb.reshape(3, frame.height as i32)?;
                let mut bgr = Mat::default();
                imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
                writer.write(&bgr)?;
            }
            writer.release()?;
            Ok(())
        }
    }
}
