pub mod contour;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod imaging;
pub mod source;

pub use contour::{Bounds, Contour, Point, Rect};
pub use encoder::{ClipEncoder, GifClipEncoder};
pub use error::VideoError;
pub use frame::{Frame, FrameInfo, Rgb, BLACK};
pub use source::{FrameSource, ImageSequenceSource};

#[cfg(feature = "opencv")]
pub use encoder::Mp4ClipEncoder;
#[cfg(feature = "opencv")]
pub use source::VideoFileSource;
