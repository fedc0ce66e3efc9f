//! 帧来源：序列帧目录，或（opencv 特性下）视频文件

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use super::error::VideoError;
use super::frame::Frame;

static FRAME_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("static regex"));

const SEQUENCE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// 按时间戳递增顺序产出帧，耗尽时返回 Ok(None)
pub trait FrameSource {
    fn frame_size(&self) -> (u32, u32);

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// 目录中的序列帧，按文件名中的数字排序
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    cursor: usize,
    frame_interval_ms: f64,
    size: (u32, u32),
}

impl ImageSequenceSource {
    pub fn open(dir: &Path, fps: f64) -> Result<Self, VideoError> {
        let mut files: Vec<(u64, PathBuf)> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_sequence_image(path))
            .map(|path| (frame_index(&path), path))
            .collect();
        files.sort();

        let files: Vec<PathBuf> = files.into_iter().map(|(_, path)| path).collect();
        let first = files
            .first()
            .ok_or_else(|| VideoError::EmptySource(dir.to_path_buf()))?;
        let size = image::image_dimensions(first)?;

        info!(
            "🎞️ Image sequence {:?}: {} frames, {}x{}",
            dir,
            files.len(),
            size.0,
            size.1
        );

        Ok(Self {
            files,
            cursor: 0,
            frame_interval_ms: 1000.0 / fps.max(1.0),
            size,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn frame_size(&self) -> (u32, u32) {
        self.size
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(path) = self.files.get(self.cursor) else {
            return Ok(None);
        };
        let image = image::open(path)?.to_rgb8();
        if image.dimensions() != self.size {
            return Err(VideoError::FrameSizeMismatch {
                expected: self.size,
                actual: image.dimensions(),
            });
        }

        let number = self.cursor as u64;
        let timestamp_ms = (number as f64 * self.frame_interval_ms).round() as u64;
        self.cursor += 1;
        debug!("Loaded frame {} from {:?}", number, path);

        Ok(Some(Frame::from_image(image, timestamp_ms, number)))
    }
}

pub fn is_sequence_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SEQUENCE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 文件名中最后一段数字；没有数字的排在最前
fn frame_index(path: &Path) -> u64 {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| FRAME_INDEX.find_iter(stem).last())
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

#[cfg(feature = "opencv")]
pub use opencv_source::VideoFileSource;

#[cfg(feature = "opencv")]
mod opencv_source {
    use super::*;
    use opencv::{
        core::Mat,
        imgproc,
        prelude::*,
        videoio::{self, VideoCapture},
    };

    /// OpenCV 解码的视频文件
    pub struct VideoFileSource {
        capture: VideoCapture,
        size: (u32, u32),
        frame_number: u64,
    }

    impl VideoFileSource {
        pub fn open(path: &Path) -> Result<Self, VideoError> {
            let path_str = path.to_string_lossy();
            let capture = VideoCapture::from_file(&path_str, videoio::CAP_ANY)?;
            if !capture.is_opened()? {
                return Err(VideoError::Decode(format!("cannot open {}", path_str)));
            }
            let width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
            let height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
            info!("🎬 Opened {:?}: {}x{}", path, width, height);

            Ok(Self {
                capture,
                size: (width, height),
                frame_number: 0,
            })
        }
    }

    impl FrameSource for VideoFileSource {
        fn frame_size(&self) -> (u32, u32) {
            self.size
        }

        fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
            let mut bgr = Mat::default();
            if !self.capture.read(&mut bgr)? || bgr.empty() {
                return Ok(None);
            }
            let timestamp_ms = self.capture.get(videoio::CAP_PROP_POS_MSEC)?.max(0.0) as u64;

            let mut rgb = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
            let data = rgb.data_bytes()?.to_vec();

            let frame = Frame::from_raw_rgb(self.size.0, self.size.1, data, timestamp_ms, self.frame_number)?;
            self.frame_number += 1;
            Ok(Some(frame))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[test]
    fn test_frame_index_parsing() {
        assert_eq!(frame_index(Path::new("frame_0012.png")), 12);
        assert_eq!(frame_index(Path::new("run2_frame_7.png")), 7);
        assert_eq!(frame_index(Path::new("cover.png")), 0);
    }

    #[test]
    fn test_sequence_orders_numerically() {
        let dir = tempfile::tempdir().unwrap();
        for (i, shade) in [(10u32, 30u8), (2, 10), (1, 0)] {
            let img = RgbImage::from_pixel(8, 6, image::Rgb([shade, shade, shade]));
            img.save(dir.path().join(format!("frame_{}.png", i))).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 10.0).unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(source.frame_size(), (8, 6));

        let shades: Vec<(u8, u64)> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| (f.data[0], f.timestamp_ms()))
            .collect();
        assert_eq!(shades, vec![(0, 0), (10, 100), (30, 200)]);
    }

    #[test]
    fn test_empty_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageSequenceSource::open(dir.path(), 30.0);
        assert!(matches!(result, Err(VideoError::EmptySource(_))));
    }

    #[test]
    fn test_size_mismatch_stops_source() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(8, 6).save(dir.path().join("f1.png")).unwrap();
        RgbImage::new(4, 4).save(dir.path().join("f2.png")).unwrap();

        let mut source = ImageSequenceSource::open(dir.path(), 30.0).unwrap();
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(
            source.next_frame(),
            Err(VideoError::FrameSizeMismatch { .. })
        ));
    }
}
