use std::collections::HashMap;

/// Tag key for the frame timestamp in microseconds (`i64`).
pub const TIME_US: &str = "timeUs";
/// Tag key for the pixel-format ordinal (`i32`, see `VideoFormat`).
pub const VIDEO_FORMAT: &str = "Videoformat";
/// Tag key for the logical visible width (`i32`).
pub const WIDTH: &str = "width";
/// Tag key for the logical visible height (`i32`).
pub const HEIGHT: &str = "height";
/// Tag key for the padded (stride) width the buffer was allocated with (`i32`).
pub const ALIGNED_WIDTH: &str = "alignedWidth";
/// Tag key for the padded height the buffer was allocated with (`i32`).
pub const ALIGNED_HEIGHT: &str = "alignedHeight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagValue {
    I32(i32),
    I64(i64),
}

/// A byte buffer with an attached string-keyed integer tag map.
///
/// This is the unit of exchange between pipeline nodes: pixel data plus the
/// `timeUs`/`Videoformat`/geometry tags describing it. Each node allocates a
/// fresh output buffer; input buffers are read-only to the node and owned by
/// whoever produced them. A buffer flows through the pipeline exactly once.
///
/// # Example
/// ```rust
/// use framepipe_core::prelude::{DataBuffer, TIME_US, WIDTH};
///
/// let mut buf = DataBuffer::new(16);
/// buf.set_int64(TIME_US, 42);
/// buf.set_int32(WIDTH, 4);
/// assert_eq!(buf.find_int64(TIME_US), Some(42));
/// assert_eq!(buf.find_int32(WIDTH), Some(4));
/// assert_eq!(buf.find_int32("missing"), None);
/// ```
#[derive(Debug, Clone)]
pub struct DataBuffer {
    data: Vec<u8>,
    tags: HashMap<String, TagValue>,
}

impl DataBuffer {
    /// Allocate a zero-filled buffer of `size` bytes with no tags.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0; size],
            tags: HashMap::new(),
        }
    }

    /// Take ownership of an existing byte vector.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data,
            tags: HashMap::new(),
        }
    }

    /// Pixel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable pixel data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Buffer length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no pixel data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Attach or replace an `i32` tag.
    pub fn set_int32(&mut self, key: &str, value: i32) {
        self.tags.insert(key.to_owned(), TagValue::I32(value));
    }

    /// Attach or replace an `i64` tag.
    pub fn set_int64(&mut self, key: &str, value: i64) {
        self.tags.insert(key.to_owned(), TagValue::I64(value));
    }

    /// Look up an `i32` tag. A tag stored as `i64` does not match.
    pub fn find_int32(&self, key: &str) -> Option<i32> {
        match self.tags.get(key) {
            Some(TagValue::I32(v)) => Some(*v),
            _ => None,
        }
    }

    /// Look up an `i64` tag. A tag stored as `i32` does not match.
    pub fn find_int64(&self, key: &str) -> Option<i64> {
        match self.tags.get(key) {
            Some(TagValue::I64(v)) => Some(*v),
            _ => None,
        }
    }
}
