#![doc = include_str!("../README.md")]

pub mod buffer;
pub mod error;
pub mod format;
pub mod image;
pub mod metrics;

pub mod prelude {
    pub use crate::{
        buffer::{DataBuffer, ALIGNED_HEIGHT, ALIGNED_WIDTH, HEIGHT, TIME_US, VIDEO_FORMAT, WIDTH},
        error::ProcessError,
        format::{CodecType, VideoConfigParams, VideoFormat},
        image::ImageUnitInfo,
        metrics::PipelineMetrics,
    };
}
