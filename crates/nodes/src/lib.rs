#![doc = include_str!("../README.md")]

pub mod color_format;
pub mod node;
pub mod pipeline;
pub mod scale_convert;

mod plane;

#[cfg(test)]
pub(crate) mod testutil;

pub mod prelude {
    pub use crate::{
        color_format::ColorFormatProcess,
        node::{FrameSink, NodeLink, ProcessNode},
        pipeline::FramePipeline,
        scale_convert::ScaleConvertProcess,
    };
    pub use framepipe_core::prelude::*;
}
