//! Helpers shared by the node test modules.

use std::sync::{Arc, Mutex, Weak};

use framepipe_core::prelude::*;

use crate::node::FrameSink;

/// Terminal sink that records every delivered frame.
pub struct CaptureSink {
    pub frames: Mutex<Vec<DataBuffer>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            frames: Mutex::new(Vec::new()),
        })
    }

    pub fn weak(self: &Arc<Self>) -> Weak<dyn FrameSink> {
        Arc::downgrade(&(Arc::clone(self) as Arc<dyn FrameSink>))
    }

    pub fn take_frames(&self) -> Vec<DataBuffer> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }
}

impl FrameSink for CaptureSink {
    fn on_processed_frame(&self, buffer: DataBuffer) {
        self.frames.lock().unwrap().push(buffer);
    }
}

/// Stream config shorthand.
pub fn cfg(format: VideoFormat, width: i32, height: i32) -> VideoConfigParams {
    VideoConfigParams::new(CodecType::NoCodec, format, 30, width, height)
}

/// Build a fully tagged 4:2:0 frame from raw bytes.
pub fn tagged_frame(
    data: Vec<u8>,
    format: VideoFormat,
    width: i32,
    height: i32,
    aligned_width: i32,
    aligned_height: i32,
    time_us: i64,
) -> DataBuffer {
    let mut buf = DataBuffer::from_vec(data);
    buf.set_int64(TIME_US, time_us);
    buf.set_int32(VIDEO_FORMAT, format.as_tag());
    buf.set_int32(WIDTH, width);
    buf.set_int32(HEIGHT, height);
    buf.set_int32(ALIGNED_WIDTH, aligned_width);
    buf.set_int32(ALIGNED_HEIGHT, aligned_height);
    buf
}

/// NV12 frame with recognizable planes: Y ramps per pixel, U bytes carry the
/// chroma row index, V bytes carry `0x80 + index`.
pub fn nv12_pattern(width: i32, height: i32) -> Vec<u8> {
    let w = width as usize;
    let h = height as usize;
    let mut data = vec![0u8; w * h * 3 / 2];
    for (i, y) in data[..w * h].iter_mut().enumerate() {
        *y = (i % 251) as u8;
    }
    let chroma = &mut data[w * h..];
    let half_w = w.div_ceil(2);
    for row in 0..h.div_ceil(2) {
        for col in 0..half_w {
            chroma[row * w + col * 2] = row as u8;
            chroma[row * w + col * 2 + 1] = 0x80u8.wrapping_add(row as u8);
        }
    }
    data
}
