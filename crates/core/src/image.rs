use crate::buffer::{self, DataBuffer};
use crate::error::ProcessError;
use crate::format::{VideoConfigParams, VideoFormat};

/// Transient descriptor of one concrete frame buffer.
///
/// Built fresh from a [`DataBuffer`]'s tags at the start of a `process_data`
/// call and dropped with it; never persisted. The logical `width`/`height`
/// may be smaller than the padded `aligned_width`/`aligned_height` the buffer
/// was allocated with, and `height` may be negative: by convention a negative
/// logical height requests a vertical flip, expressed downstream as a
/// backward walk over the source rows.
///
/// # Example
/// ```rust
/// use framepipe_core::prelude::*;
///
/// let mut buf = DataBuffer::new(4 * 4 * 3 / 2);
/// buf.set_int32(VIDEO_FORMAT, VideoFormat::Nv12.as_tag());
/// buf.set_int32(WIDTH, 4);
/// buf.set_int32(HEIGHT, 4);
/// buf.set_int32(ALIGNED_WIDTH, 4);
/// buf.set_int32(ALIGNED_HEIGHT, 4);
/// let info = ImageUnitInfo::from_buffer(&buf).unwrap();
/// assert_eq!(info.chroma_offset, 16);
/// assert!(info.is_valid());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ImageUnitInfo<'a> {
    /// Pixel format carried in the `Videoformat` tag.
    pub format: VideoFormat,
    /// Logical visible width.
    pub width: i32,
    /// Logical visible height; negative means vertically flipped.
    pub height: i32,
    /// Padded (stride) width the buffer rows are laid out with.
    pub aligned_width: i32,
    /// Padded height.
    pub aligned_height: i32,
    /// Byte offset of the chroma data: `aligned_width * aligned_height`.
    pub chroma_offset: usize,
    /// Total byte length of the backing buffer.
    pub img_size: usize,
    /// The pixel bytes themselves.
    pub data: &'a [u8],
}

impl<'a> ImageUnitInfo<'a> {
    /// Extract the descriptor from a tagged buffer.
    ///
    /// Fails `NotFound` when a geometry/format tag is absent or the format
    /// ordinal is not one of the supported 4:2:0 layouts, and `BadValue`
    /// when the buffer carries no pixel data or the tagged geometry is
    /// non-positive.
    pub fn from_buffer(buffer: &'a DataBuffer) -> Result<Self, ProcessError> {
        let format_tag = buffer
            .find_int32(buffer::VIDEO_FORMAT)
            .ok_or_else(|| ProcessError::NotFound("tag Videoformat".into()))?;
        let format = VideoFormat::from_tag(format_tag)
            .filter(|f| f.is_yuv420())
            .ok_or_else(|| {
                ProcessError::NotFound(format!("unsupported Videoformat ordinal {format_tag}"))
            })?;
        let width = buffer
            .find_int32(buffer::WIDTH)
            .ok_or_else(|| ProcessError::NotFound("tag width".into()))?;
        let height = buffer
            .find_int32(buffer::HEIGHT)
            .ok_or_else(|| ProcessError::NotFound("tag height".into()))?;
        let aligned_width = buffer
            .find_int32(buffer::ALIGNED_WIDTH)
            .ok_or_else(|| ProcessError::NotFound("tag alignedWidth".into()))?;
        let aligned_height = buffer
            .find_int32(buffer::ALIGNED_HEIGHT)
            .ok_or_else(|| ProcessError::NotFound("tag alignedHeight".into()))?;
        if aligned_width <= 0 || aligned_height <= 0 {
            return Err(ProcessError::BadValue(format!(
                "non-positive aligned dims {aligned_width}x{aligned_height}"
            )));
        }
        if buffer.is_empty() {
            return Err(ProcessError::BadValue("buffer has no pixel data".into()));
        }
        Ok(Self {
            format,
            width,
            height,
            aligned_width,
            aligned_height,
            chroma_offset: aligned_width as usize * aligned_height as usize,
            img_size: buffer.size(),
            data: buffer.data(),
        })
    }

    /// General 4:2:0 correctness invariant.
    ///
    /// Logical dims fit inside the aligned dims, the buffer holds at least a
    /// full 4:2:0 frame at the aligned geometry, and the chroma plane starts
    /// right after the aligned Y plane.
    pub fn is_valid(&self) -> bool {
        let aw = self.aligned_width as usize;
        let ah = self.aligned_height as usize;
        self.width <= self.aligned_width
            && self.height <= self.aligned_height
            && self.img_size >= aw * ah * 3 / 2
            && self.chroma_offset == aw * ah
    }

    /// Format and aligned-geometry equality with a stream config.
    ///
    /// Logical dims are deliberately not compared; an upstream producer may
    /// deliver padded frames whose visible region matches the config.
    pub fn matches_config(&self, config: &VideoConfigParams) -> bool {
        self.format == config.format()
            && self.aligned_width == config.width()
            && self.aligned_height == config.height()
    }

    /// Run both checks, mapping any mismatch to `BadValue`.
    pub fn check_against(&self, config: &VideoConfigParams) -> Result<(), ProcessError> {
        if !self.matches_config(config) {
            return Err(ProcessError::BadValue(format!(
                "frame {} {}x{} does not match source config {} {}x{}",
                self.format,
                self.aligned_width,
                self.aligned_height,
                config.format(),
                config.width(),
                config.height()
            )));
        }
        if !self.is_valid() {
            return Err(ProcessError::BadValue(format!(
                "invalid image info: {}x{} aligned {}x{} chromaOffset {} imgSize {}",
                self.width,
                self.height,
                self.aligned_width,
                self.aligned_height,
                self.chroma_offset,
                self.img_size
            )));
        }
        Ok(())
    }

    /// Chroma sample columns per row: `aligned_width / 2`.
    pub fn chroma_width(&self) -> usize {
        (self.aligned_width / 2) as usize
    }

    /// Chroma rows: `aligned_height / 2`.
    pub fn chroma_height(&self) -> usize {
        (self.aligned_height / 2) as usize
    }

    /// Byte size of one separated chroma plane (U or V).
    pub fn chroma_plane_size(&self) -> usize {
        self.chroma_width() * self.chroma_height()
    }

    /// Full 4:2:0 byte budget at the aligned geometry.
    pub fn frame_size(&self) -> usize {
        self.chroma_offset * 3 / 2
    }
}
