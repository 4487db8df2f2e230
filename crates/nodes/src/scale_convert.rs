use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Weak};

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use framepipe_core::prelude::*;
use smallvec::SmallVec;
use tracing::debug;

use crate::node::{FrameSink, NodeLink, ProcessNode};
use crate::plane;

/// Y, U, V staging planes. All supported 4:2:0 layouts are taken apart into
/// three packed single-channel planes before resampling, so the same resize
/// path serves interleaved-chroma and planar frames alike and a format
/// change falls out of the recompose step.
type Planes = SmallVec<[Image<'static>; 3]>;

fn yuv420_planes(format: VideoFormat, width: i32, height: i32) -> Result<Planes, ProcessError> {
    if !format.is_yuv420() {
        return Err(ProcessError::BadValue(format!(
            "cannot scale {format} frames"
        )));
    }
    let w = width as u32;
    let h = height as u32;
    let half_w = (w + 1) / 2;
    let half_h = (h + 1) / 2;
    let mut planes = Planes::new();
    planes.push(Image::new(w, h, PixelType::U8));
    planes.push(Image::new(half_w, half_h, PixelType::U8));
    planes.push(Image::new(half_w, half_h, PixelType::U8));
    Ok(planes)
}

/// Staging planes and the resizer, built once at init and reused per frame.
struct ScaleContext {
    resizer: Resizer,
    src_format: VideoFormat,
    dst_format: VideoFormat,
    src_planes: Planes,
    dst_planes: Planes,
    dst_width: i32,
    dst_height: i32,
    dst_size: usize,
}

impl ScaleContext {
    fn new(source: &VideoConfigParams, target: &VideoConfigParams) -> Result<Self, ProcessError> {
        let src_planes = yuv420_planes(source.format(), source.width(), source.height())?;
        let dst_planes = yuv420_planes(target.format(), target.width(), target.height())?;
        let dst_size = dst_planes.iter().map(|p| p.buffer().len()).sum();
        Ok(Self {
            resizer: Resizer::new(),
            src_format: source.format(),
            dst_format: target.format(),
            src_planes,
            dst_planes,
            dst_width: target.width(),
            dst_height: target.height(),
            dst_size,
        })
    }

    /// Fill the Y/U/V staging planes from one packed source frame.
    fn load(&mut self, input: &[u8]) -> Result<(), ProcessError> {
        let [y, u, v] = &mut self.src_planes[..] else {
            return Err(ProcessError::BadOperate("staging planes missing".into()));
        };
        let y_len = y.buffer().len();
        let luma = input
            .get(..y_len)
            .ok_or_else(|| ProcessError::MemoryOpt("input luma plane too short".into()))?;
        plane::checked_copy(y.buffer_mut(), luma)?;

        let chroma = &input[y_len..];
        let half_w = u.width() as usize;
        let half_h = u.height() as i32;
        match self.src_format {
            VideoFormat::YuvI420 => {
                let plane_len = u.buffer().len();
                let packed = chroma.get(..plane_len * 2).ok_or_else(|| {
                    ProcessError::MemoryOpt("input chroma planes too short".into())
                })?;
                plane::checked_copy(u.buffer_mut(), &packed[..plane_len])?;
                plane::checked_copy(v.buffer_mut(), &packed[plane_len..])?;
            }
            VideoFormat::Nv12 => plane::separate_uv_plane(
                chroma,
                half_w * 2,
                u.buffer_mut(),
                v.buffer_mut(),
                half_w,
                half_w,
                half_h,
            )?,
            VideoFormat::Nv21 => plane::separate_uv_plane(
                chroma,
                half_w * 2,
                v.buffer_mut(),
                u.buffer_mut(),
                half_w,
                half_w,
                half_h,
            )?,
            VideoFormat::Rgba8888 => {
                return Err(ProcessError::BadOperate("rgba frame in scale context".into()));
            }
        }
        Ok(())
    }

    /// Recompose the resized Y/U/V planes into one packed destination frame.
    fn store(&self, output: &mut [u8]) -> Result<(), ProcessError> {
        let [y, u, v] = &self.dst_planes[..] else {
            return Err(ProcessError::BadOperate("staging planes missing".into()));
        };
        let y_len = y.buffer().len();
        plane::checked_copy(&mut output[..y_len], y.buffer())?;

        let chroma = &mut output[y_len..];
        let half_w = u.width() as usize;
        let half_h = u.height() as i32;
        match self.dst_format {
            VideoFormat::YuvI420 => {
                let plane_len = u.buffer().len();
                plane::checked_copy(&mut chroma[..plane_len], u.buffer())?;
                plane::checked_copy(&mut chroma[plane_len..plane_len * 2], v.buffer())?;
            }
            VideoFormat::Nv12 => plane::combine_uv_plane(
                u.buffer(),
                v.buffer(),
                half_w,
                chroma,
                half_w * 2,
                half_w,
                half_h,
            )?,
            VideoFormat::Nv21 => plane::combine_uv_plane(
                v.buffer(),
                u.buffer(),
                half_w,
                chroma,
                half_w * 2,
                half_w,
                half_h,
            )?,
            VideoFormat::Rgba8888 => {
                return Err(ProcessError::BadOperate("rgba frame in scale context".into()));
            }
        }
        Ok(())
    }

    fn scale(&mut self, input: &[u8], output: &mut [u8]) -> Result<(), ProcessError> {
        self.load(input)?;
        let options =
            ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
        for (src, dst) in self.src_planes.iter().zip(self.dst_planes.iter_mut()) {
            self.resizer
                .resize(src, dst, &options)
                .map_err(|e| ProcessError::BadOperate(format!("plane resize failed: {e}")))?;
        }
        self.store(output)
    }
}

/// Changes frame resolution, and with it the pixel format when source and
/// target disagree, one 4:2:0 plane at a time. When the two resolutions
/// already agree the node goes transparent and forwards frames untouched.
pub struct ScaleConvertProcess {
    source_config: Option<VideoConfigParams>,
    target_config: Option<VideoConfigParams>,
    active: AtomicBool,
    ctx: Mutex<Option<ScaleContext>>,
    link: NodeLink,
}

impl ScaleConvertProcess {
    pub fn new(sink: Weak<dyn FrameSink>) -> Self {
        Self {
            source_config: None,
            target_config: None,
            active: AtomicBool::new(false),
            ctx: Mutex::new(None),
            link: NodeLink::new(sink),
        }
    }

    /// Chain a downstream node; frames then go there instead of the sink.
    pub fn set_next(&self, node: Box<dyn ProcessNode>) {
        self.link.set_next(node);
    }
}

impl ProcessNode for ScaleConvertProcess {
    fn init_node(
        &mut self,
        source: &VideoConfigParams,
        target: &VideoConfigParams,
    ) -> Result<VideoConfigParams, ProcessError> {
        // Codec and frame rate carry over from the source; this node only
        // replaces geometry and pixel format.
        let processed = source
            .with_dimensions(target.width(), target.height())
            .with_format(target.format());
        if source.same_dimensions(target) {
            // Nothing to resample, run transparent.
            self.source_config = Some(*source);
            self.target_config = Some(processed);
            *self.ctx.lock().unwrap() = None;
            self.active.store(true, Ordering::SeqCst);
            debug!("scale node initialized in pass-through mode");
            return Ok(processed);
        }
        let ctx = ScaleContext::new(source, target)?;
        self.source_config = Some(*source);
        self.target_config = Some(processed);
        *self.ctx.lock().unwrap() = Some(ctx);
        self.active.store(true, Ordering::SeqCst);
        debug!(
            from_format = %source.format(),
            from_width = source.width(),
            from_height = source.height(),
            to_format = %target.format(),
            to_width = target.width(),
            to_height = target.height(),
            "scale node initialized"
        );
        Ok(processed)
    }

    fn process_data(&self, mut buffers: Vec<DataBuffer>) -> Result<(), ProcessError> {
        if !self.active.load(Ordering::SeqCst) {
            return Err(ProcessError::DisableProcess);
        }
        if buffers.is_empty() || buffers[0].is_empty() {
            return Err(ProcessError::BadValue("empty input buffer list".into()));
        }
        let source_cfg = self.source_config.ok_or(ProcessError::DisableProcess)?;
        let target_cfg = self.target_config.ok_or(ProcessError::DisableProcess)?;

        let mut guard = self.ctx.lock().unwrap();
        let Some(ctx) = guard.as_mut() else {
            if source_cfg.same_dimensions(&target_cfg) {
                // Pass-through mode.
                drop(guard);
                return self.link.forward(buffers);
            }
            // Released while this frame was in flight.
            return Err(ProcessError::DisableProcess);
        };

        let input = buffers.swap_remove(0);
        let time_us = input
            .find_int64(TIME_US)
            .ok_or_else(|| ProcessError::BadValue("tag timeUs missing".into()))?;
        let info = ImageUnitInfo::from_buffer(&input)?;
        info.check_against(&source_cfg)?;

        let mut output = DataBuffer::new(ctx.dst_size);
        ctx.scale(info.data, output.data_mut())?;
        let (dst_width, dst_height) = (ctx.dst_width, ctx.dst_height);
        drop(guard);

        output.set_int64(TIME_US, time_us);
        output.set_int32(VIDEO_FORMAT, target_cfg.format().as_tag());
        output.set_int32(WIDTH, dst_width);
        output.set_int32(HEIGHT, dst_height);
        output.set_int32(ALIGNED_WIDTH, dst_width);
        output.set_int32(ALIGNED_HEIGHT, dst_height);
        self.link.forward(vec![output])
    }

    fn release_process_node(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("scale node released");
        }
        *self.ctx.lock().unwrap() = None;
        self.link.release();
    }
}

impl Drop for ScaleConvertProcess {
    fn drop(&mut self) {
        if self.active.load(Ordering::SeqCst) {
            self.release_process_node();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{cfg, tagged_frame, CaptureSink};

    fn constant_nv12(width: i32, height: i32, y: u8, u: u8, v: u8) -> Vec<u8> {
        let luma = (width * height) as usize;
        let mut data = vec![y; luma * 3 / 2];
        for pair in data[luma..].chunks_exact_mut(2) {
            pair[0] = u;
            pair[1] = v;
        }
        data
    }

    #[test]
    fn process_before_init_is_disabled() {
        let sink = CaptureSink::new();
        let node = ScaleConvertProcess::new(sink.weak());
        let frame = tagged_frame(vec![1u8; 24], VideoFormat::Nv12, 4, 4, 4, 4, 1);
        assert!(matches!(
            node.process_data(vec![frame]),
            Err(ProcessError::DisableProcess)
        ));
    }

    #[test]
    fn process_after_release_is_disabled() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(&cfg(VideoFormat::Nv12, 8, 8), &cfg(VideoFormat::Nv12, 4, 4))
            .unwrap();
        node.release_process_node();
        let frame = tagged_frame(vec![1u8; 96], VideoFormat::Nv12, 8, 8, 8, 8, 1);
        assert!(matches!(
            node.process_data(vec![frame]),
            Err(ProcessError::DisableProcess)
        ));
        assert!(sink.take_frames().is_empty());
    }

    #[test]
    fn empty_input_is_bad_value() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(&cfg(VideoFormat::Nv12, 8, 8), &cfg(VideoFormat::Nv12, 4, 4))
            .unwrap();
        assert!(matches!(
            node.process_data(Vec::new()),
            Err(ProcessError::BadValue(_))
        ));
        assert!(sink.take_frames().is_empty());
    }

    #[test]
    fn processed_config_keeps_source_codec_and_frame_rate() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        let source = VideoConfigParams::new(CodecType::H264, VideoFormat::Nv12, 30, 1920, 1080);
        let target = VideoConfigParams::new(CodecType::NoCodec, VideoFormat::Nv21, 60, 640, 480);
        let processed = node.init_node(&source, &target).unwrap();
        assert_eq!(processed.codec(), CodecType::H264);
        assert_eq!(processed.frame_rate(), 30);
        assert_eq!(processed.format(), VideoFormat::Nv21);
        assert_eq!((processed.width(), processed.height()), (640, 480));

        // Pass-through init derives the same way.
        let mut node = ScaleConvertProcess::new(sink.weak());
        let same_dims = VideoConfigParams::new(CodecType::NoCodec, VideoFormat::Nv12, 60, 1920, 1080);
        let processed = node.init_node(&source, &same_dims).unwrap();
        assert_eq!(processed.codec(), CodecType::H264);
        assert_eq!(processed.frame_rate(), 30);
    }

    #[test]
    fn init_rejects_rgba() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        let err = node
            .init_node(
                &cfg(VideoFormat::Rgba8888, 8, 8),
                &cfg(VideoFormat::Rgba8888, 4, 4),
            )
            .unwrap_err();
        assert!(matches!(err, ProcessError::BadValue(_)));
        let frame = tagged_frame(vec![1u8; 24], VideoFormat::Nv12, 4, 4, 4, 4, 1);
        assert!(matches!(
            node.process_data(vec![frame]),
            Err(ProcessError::DisableProcess)
        ));
    }

    #[test]
    fn same_resolution_passes_through_byte_identical() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(&cfg(VideoFormat::Nv12, 4, 4), &cfg(VideoFormat::Nv12, 4, 4))
            .unwrap();
        let frame = tagged_frame(vec![7u8; 24], VideoFormat::Nv12, 4, 4, 4, 4, 3);
        node.process_data(vec![frame]).unwrap();
        let frames = sink.take_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data(), &[7u8; 24][..]);
        assert_eq!(frames[0].find_int64(TIME_US), Some(3));
    }

    #[test]
    fn downscales_full_hd_nv12_to_vga() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(
            &cfg(VideoFormat::Nv12, 1920, 1080),
            &cfg(VideoFormat::Nv12, 640, 480),
        )
        .unwrap();
        let frame = tagged_frame(
            constant_nv12(1920, 1080, 100, 50, 200),
            VideoFormat::Nv12,
            1920,
            1080,
            1920,
            1080,
            42,
        );
        node.process_data(vec![frame]).unwrap();
        let frames = sink.take_frames();
        assert_eq!(frames.len(), 1);
        let out = &frames[0];
        assert_eq!(out.size(), 640 * 480 * 3 / 2);
        assert_eq!(out.find_int32(VIDEO_FORMAT), Some(VideoFormat::Nv12.as_tag()));
        assert_eq!(out.find_int32(WIDTH), Some(640));
        assert_eq!(out.find_int32(HEIGHT), Some(480));
        assert_eq!(out.find_int32(ALIGNED_WIDTH), Some(640));
        assert_eq!(out.find_int32(ALIGNED_HEIGHT), Some(480));
        assert_eq!(out.find_int64(TIME_US), Some(42));
        // Constant-valued planes stay constant through resampling, within
        // one code of fixed-point rounding.
        let data = out.data();
        let luma = 640 * 480;
        assert!(data[..luma].iter().all(|&b| b.abs_diff(100) <= 1));
        for pair in data[luma..].chunks_exact(2) {
            assert!(pair[0].abs_diff(50) <= 1);
            assert!(pair[1].abs_diff(200) <= 1);
        }
    }

    #[test]
    fn downscale_can_change_format_too() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(
            &cfg(VideoFormat::Nv12, 1920, 1080),
            &cfg(VideoFormat::Nv21, 640, 480),
        )
        .unwrap();
        let frame = tagged_frame(
            constant_nv12(1920, 1080, 100, 50, 200),
            VideoFormat::Nv12,
            1920,
            1080,
            1920,
            1080,
            7,
        );
        node.process_data(vec![frame]).unwrap();
        let frames = sink.take_frames();
        let out = &frames[0];
        assert_eq!(out.size(), 640 * 480 * 3 / 2);
        assert_eq!(out.find_int32(VIDEO_FORMAT), Some(VideoFormat::Nv21.as_tag()));
        // NV21 interleaves V first: constant pairs come out (200, 50).
        let data = out.data();
        for pair in data[640 * 480..].chunks_exact(2) {
            assert!(pair[0].abs_diff(200) <= 1);
            assert!(pair[1].abs_diff(50) <= 1);
        }
    }

    #[test]
    fn scales_i420_planes_independently() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(
            &cfg(VideoFormat::YuvI420, 8, 8),
            &cfg(VideoFormat::YuvI420, 4, 4),
        )
        .unwrap();
        let mut data = vec![10u8; 64];
        data.extend_from_slice(&[60u8; 16]); // U plane
        data.extend_from_slice(&[180u8; 16]); // V plane
        let frame = tagged_frame(data, VideoFormat::YuvI420, 8, 8, 8, 8, 1);
        node.process_data(vec![frame]).unwrap();
        let frames = sink.take_frames();
        let out = frames[0].data();
        assert_eq!(out.len(), 4 * 4 * 3 / 2);
        assert!(out[..16].iter().all(|&b| b.abs_diff(10) <= 1));
        assert!(out[16..20].iter().all(|&b| b.abs_diff(60) <= 1));
        assert!(out[20..24].iter().all(|&b| b.abs_diff(180) <= 1));
    }

    #[test]
    fn missing_timestamp_is_bad_value() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(&cfg(VideoFormat::Nv12, 8, 8), &cfg(VideoFormat::Nv12, 4, 4))
            .unwrap();
        let mut frame = DataBuffer::from_vec(vec![0u8; 96]);
        frame.set_int32(VIDEO_FORMAT, VideoFormat::Nv12.as_tag());
        frame.set_int32(WIDTH, 8);
        frame.set_int32(HEIGHT, 8);
        frame.set_int32(ALIGNED_WIDTH, 8);
        frame.set_int32(ALIGNED_HEIGHT, 8);
        assert!(matches!(
            node.process_data(vec![frame]),
            Err(ProcessError::BadValue(_))
        ));
    }

    #[test]
    fn frame_not_matching_source_config_is_bad_value() {
        let sink = CaptureSink::new();
        let mut node = ScaleConvertProcess::new(sink.weak());
        node.init_node(&cfg(VideoFormat::Nv12, 8, 8), &cfg(VideoFormat::Nv12, 4, 4))
            .unwrap();
        let frame = tagged_frame(vec![0u8; 24], VideoFormat::Nv12, 4, 4, 4, 4, 1);
        assert!(matches!(
            node.process_data(vec![frame]),
            Err(ProcessError::BadValue(_))
        ));
    }
}
