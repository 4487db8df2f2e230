use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use framepipe_core::prelude::*;
use tracing::{debug, warn};

use crate::node::{FrameSink, NodeLink, ProcessNode};
use crate::plane;

/// Converts a decoded NV12 frame's chroma arrangement to NV21 or planar I420
/// without changing resolution.
///
/// Pure image-layout transform: the luma plane is copied verbatim and the
/// interleaved chroma plane is taken apart into separate U/V planes and put
/// back together in the target arrangement. No scaling-library involvement.
///
/// # Example
/// ```rust,ignore
/// let mut node = ColorFormatProcess::new(sink);
/// let processed = node.init_node(&nv12_cfg, &nv21_cfg)?;
/// node.process_data(vec![frame])?;
/// ```
pub struct ColorFormatProcess {
    source_config: Option<VideoConfigParams>,
    target_config: Option<VideoConfigParams>,
    processed_config: Option<VideoConfigParams>,
    active: AtomicBool,
    link: NodeLink,
}

impl ColorFormatProcess {
    /// Build an unconfigured node reporting to `sink` when terminal.
    pub fn new(sink: Weak<dyn FrameSink>) -> Self {
        Self {
            source_config: None,
            target_config: None,
            processed_config: None,
            active: AtomicBool::new(false),
            link: NodeLink::new(sink),
        }
    }

    /// Chain a downstream node; frames then go there instead of the sink.
    pub fn set_next(&self, node: Box<dyn ProcessNode>) {
        self.link.set_next(node);
    }

    /// The format pairs this node can service: identical streams, or an NV12
    /// source re-arranged to NV21 or I420 at the same resolution.
    fn is_convertible(source: &VideoConfigParams, target: &VideoConfigParams) -> bool {
        if !source.same_dimensions(target) {
            return false;
        }
        source.format() == target.format()
            || (source.format() == VideoFormat::Nv12
                && matches!(
                    target.format(),
                    VideoFormat::Nv21 | VideoFormat::YuvI420
                ))
    }

    fn color_format_done(&self, buffers: Vec<DataBuffer>) -> Result<(), ProcessError> {
        self.link.forward(buffers)
    }

    fn convert(
        &self,
        info: &ImageUnitInfo<'_>,
        target: VideoFormat,
        dst: &mut [u8],
    ) -> Result<(), ProcessError> {
        match (info.format, target) {
            (VideoFormat::Nv12, VideoFormat::Nv21) => convert_nv12_to_nv21(info, dst),
            (VideoFormat::Nv12, VideoFormat::YuvI420) => convert_nv12_to_i420(info, dst),
            // Unreachable given init gating; fail rather than corrupt.
            (src, dst_fmt) => Err(ProcessError::BadOperate(format!(
                "no conversion path {src} -> {dst_fmt}"
            ))),
        }
    }
}

impl ProcessNode for ColorFormatProcess {
    fn init_node(
        &mut self,
        source: &VideoConfigParams,
        target: &VideoConfigParams,
    ) -> Result<VideoConfigParams, ProcessError> {
        if !Self::is_convertible(source, target) {
            warn!(
                source = %source.format(),
                target = %target.format(),
                "color format node cannot convert stream"
            );
            return Err(ProcessError::BadType(format!(
                "cannot convert {} {}x{} to {} {}x{}",
                source.format(),
                source.width(),
                source.height(),
                target.format(),
                target.width(),
                target.height()
            )));
        }
        self.source_config = Some(*source);
        self.target_config = Some(*target);
        let processed = source.with_format(target.format());
        self.processed_config = Some(processed);
        self.active.store(true, Ordering::SeqCst);
        debug!(
            format = %processed.format(),
            width = processed.width(),
            height = processed.height(),
            "color format node initialized"
        );
        Ok(processed)
    }

    fn process_data(&self, buffers: Vec<DataBuffer>) -> Result<(), ProcessError> {
        if buffers.is_empty() || buffers[0].is_empty() {
            return Err(ProcessError::BadValue("empty input buffer list".into()));
        }
        // No released-node guard here: unlike the scale node, this stage
        // relies on the caller not to feed it after release.
        let source_cfg = self
            .source_config
            .ok_or_else(|| ProcessError::BadValue("node was never initialized".into()))?;
        let processed_cfg = self
            .processed_config
            .ok_or_else(|| ProcessError::BadValue("node was never initialized".into()))?;

        if source_cfg.format() == processed_cfg.format() {
            // Formats already agree; hand the frame through untouched.
            return self.color_format_done(buffers);
        }

        let input = &buffers[0];
        let time_us = input
            .find_int64(TIME_US)
            .ok_or_else(|| ProcessError::BadValue("tag timeUs missing".into()))?;
        let info = ImageUnitInfo::from_buffer(input)?;
        info.check_against(&source_cfg)?;

        let mut output = DataBuffer::new(info.frame_size());
        self.convert(&info, processed_cfg.format(), output.data_mut())?;
        output.set_int64(TIME_US, time_us);
        output.set_int32(VIDEO_FORMAT, processed_cfg.format().as_tag());
        output.set_int32(WIDTH, processed_cfg.width());
        output.set_int32(HEIGHT, processed_cfg.height());
        output.set_int32(ALIGNED_WIDTH, info.aligned_width);
        output.set_int32(ALIGNED_HEIGHT, info.aligned_height);
        self.color_format_done(vec![output])
    }

    fn release_process_node(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("color format node released");
        }
        self.link.release();
    }
}

impl Drop for ColorFormatProcess {
    fn drop(&mut self) {
        if self.active.load(Ordering::SeqCst) {
            self.release_process_node();
        }
    }
}

/// Signed half extent: ceil of the magnitude, sign preserved so a flipped
/// frame keeps requesting a flipped chroma walk.
fn half_extent(v: i32) -> i32 {
    if v < 0 {
        -((-v + 1) / 2)
    } else {
        (v + 1) / 2
    }
}

/// NV12 → NV21: luma verbatim, then a full separate+combine round trip over
/// the chroma plane with the (V, U) channel order on the way back. The two
/// formats share their interleaving and differ only in channel order, and
/// the split planes are what the combine step expects.
fn convert_nv12_to_nv21(src: &ImageUnitInfo<'_>, dst: &mut [u8]) -> Result<(), ProcessError> {
    if dst.len() < src.frame_size() {
        return Err(ProcessError::MemoryOpt(format!(
            "nv21 destination too short: need {}, have {}",
            src.frame_size(),
            dst.len()
        )));
    }
    let (luma, chroma_dst) = dst.split_at_mut(src.chroma_offset);
    plane::copy_y_plane(src, luma)?;

    let src_chroma = src
        .data
        .get(src.chroma_offset..)
        .ok_or_else(|| ProcessError::MemoryOpt("chroma plane out of bounds".into()))?;
    let plane_size = src.chroma_plane_size();
    let mut u_plane = vec![0u8; plane_size];
    let mut v_plane = vec![0u8; plane_size];
    let half_width = half_extent(src.width) as usize;
    let half_height = half_extent(src.height);
    let src_stride = src.aligned_width as usize;
    let plane_stride = src.chroma_width();
    plane::separate_uv_plane(
        src_chroma,
        src_stride,
        &mut u_plane,
        &mut v_plane,
        plane_stride,
        half_width,
        half_height,
    )?;
    // The separate step already honored a requested flip; interleave the
    // packed planes in their stored order.
    plane::combine_uv_plane(
        &v_plane,
        &u_plane,
        plane_stride,
        chroma_dst,
        src_stride,
        half_width,
        half_height.abs(),
    )
}

/// NV12 → I420: luma verbatim, then the interleaved chroma split into packed
/// U and V planes of `(alignedWidth/2) * (alignedHeight/2)` bytes each.
fn convert_nv12_to_i420(src: &ImageUnitInfo<'_>, dst: &mut [u8]) -> Result<(), ProcessError> {
    let plane_size = src.chroma_plane_size();
    if dst.len() < src.chroma_offset + plane_size * 2 {
        return Err(ProcessError::MemoryOpt(format!(
            "i420 destination too short: need {}, have {}",
            src.chroma_offset + plane_size * 2,
            dst.len()
        )));
    }
    let (luma, chroma_dst) = dst.split_at_mut(src.chroma_offset);
    plane::copy_y_plane(src, luma)?;

    let (u_plane, rest) = chroma_dst.split_at_mut(plane_size);
    let v_plane = &mut rest[..plane_size];
    let src_chroma = src
        .data
        .get(src.chroma_offset..)
        .ok_or_else(|| ProcessError::MemoryOpt("chroma plane out of bounds".into()))?;
    plane::separate_uv_plane(
        src_chroma,
        src.aligned_width as usize,
        u_plane,
        v_plane,
        src.chroma_width(),
        half_extent(src.width) as usize,
        half_extent(src.height),
    )
}
