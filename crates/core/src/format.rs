use std::fmt;

/// Pixel format of a raw video frame.
///
/// The discriminants are the wire ordinals carried in the `"Videoformat"`
/// buffer tag and must round-trip through `i32` unchanged.
///
/// # Example
/// ```rust
/// use framepipe_core::prelude::VideoFormat;
///
/// assert_eq!(VideoFormat::from_tag(1), Some(VideoFormat::Nv12));
/// assert_eq!(VideoFormat::Nv12.as_tag(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum VideoFormat {
    /// 4:2:0 with three fully separate planes: Y, then U, then V.
    YuvI420 = 0,
    /// 4:2:0 with a single interleaved UV plane following the Y plane.
    Nv12 = 1,
    /// 4:2:0 with a single interleaved VU plane following the Y plane.
    Nv21 = 2,
    /// Packed 32-bit RRGGBBAA.
    Rgba8888 = 3,
}

impl VideoFormat {
    /// Decode a `"Videoformat"` tag ordinal.
    pub fn from_tag(tag: i32) -> Option<Self> {
        match tag {
            0 => Some(VideoFormat::YuvI420),
            1 => Some(VideoFormat::Nv12),
            2 => Some(VideoFormat::Nv21),
            3 => Some(VideoFormat::Rgba8888),
            _ => None,
        }
    }

    /// Tag ordinal for this format.
    pub fn as_tag(self) -> i32 {
        self as i32
    }

    /// True for the 4:2:0 chroma-subsampled layouts these nodes operate on.
    pub fn is_yuv420(self) -> bool {
        matches!(
            self,
            VideoFormat::YuvI420 | VideoFormat::Nv12 | VideoFormat::Nv21
        )
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VideoFormat::YuvI420 => "YUVI420",
            VideoFormat::Nv12 => "NV12",
            VideoFormat::Nv21 => "NV21",
            VideoFormat::Rgba8888 => "RGBA_8888",
        };
        write!(f, "{name}")
    }
}

/// Compressed-stream codec tag.
///
/// Opaque to the raw-frame nodes in this workspace; carried through configs
/// untouched so a decode stage upstream can consume it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CodecType {
    H264,
    H265,
    NoCodec,
}

/// Describes one video stream: codec, pixel format, frame rate and geometry.
///
/// Immutable value type. A node copies the source/target configs at init time
/// and derives the config it actually produces from them.
///
/// # Example
/// ```rust
/// use framepipe_core::prelude::{CodecType, VideoConfigParams, VideoFormat};
///
/// let cfg = VideoConfigParams::new(CodecType::NoCodec, VideoFormat::Nv12, 30, 1920, 1080);
/// let out = cfg.with_format(VideoFormat::Nv21);
/// assert_eq!(out.width(), 1920);
/// assert_eq!(out.format(), VideoFormat::Nv21);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoConfigParams {
    codec: CodecType,
    format: VideoFormat,
    frame_rate: i32,
    width: i32,
    height: i32,
}

impl VideoConfigParams {
    /// Build a stream description.
    pub fn new(
        codec: CodecType,
        format: VideoFormat,
        frame_rate: i32,
        width: i32,
        height: i32,
    ) -> Self {
        Self {
            codec,
            format,
            frame_rate,
            width,
            height,
        }
    }

    pub fn codec(&self) -> CodecType {
        self.codec
    }

    pub fn format(&self) -> VideoFormat {
        self.format
    }

    pub fn frame_rate(&self) -> i32 {
        self.frame_rate
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Copy with the pixel format replaced.
    pub fn with_format(&self, format: VideoFormat) -> Self {
        Self { format, ..*self }
    }

    /// Copy with the geometry replaced.
    pub fn with_dimensions(&self, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            ..*self
        }
    }

    /// True when both streams have the same width and height.
    pub fn same_dimensions(&self, other: &VideoConfigParams) -> bool {
        self.width == other.width && self.height == other.height
    }
}
