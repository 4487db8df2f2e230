use std::sync::{Mutex, Weak};

use framepipe_core::prelude::*;

/// One stage in the linear frame-transform chain.
///
/// `process_data` and `release_process_node` take `&self`: the owning
/// pipeline serializes frame delivery, but a shutdown path may release a node
/// while a frame is in flight, so each node self-protects its mutable state
/// with atomics and mutexes instead of requiring `&mut`.
pub trait ProcessNode: Send + Sync {
    /// Configure the node for a source→target stream transform.
    ///
    /// Returns the config this node will actually produce, which may differ
    /// from the requested target when the node cannot fully satisfy it.
    fn init_node(
        &mut self,
        source: &VideoConfigParams,
        target: &VideoConfigParams,
    ) -> Result<VideoConfigParams, ProcessError>;

    /// Transform one batch of frames and hand the result downstream.
    ///
    /// All work is CPU-bound and runs to completion on the calling thread.
    fn process_data(&self, buffers: Vec<DataBuffer>) -> Result<(), ProcessError>;

    /// Tear the node down. Idempotent; the cancellation primitive for the
    /// chain.
    fn release_process_node(&self);
}

/// Terminal consumer of the chain's output, implemented by the pipeline
/// owner.
pub trait FrameSink: Send + Sync {
    /// Receive one fully processed frame.
    fn on_processed_frame(&self, buffer: DataBuffer);
}

/// Hand-off state owned by every node: the exclusively owned next-node
/// pointer and the non-owning back-reference to the pipeline owner.
///
/// The next pointer is nulled on release to break the chain
/// deterministically. An expired owner is a normal `BadValue` condition, not
/// a crash.
pub struct NodeLink {
    next: Mutex<Option<Box<dyn ProcessNode>>>,
    sink: Weak<dyn FrameSink>,
}

impl NodeLink {
    pub fn new(sink: Weak<dyn FrameSink>) -> Self {
        Self {
            next: Mutex::new(None),
            sink,
        }
    }

    /// Chain a downstream node. Replaces any previous link.
    pub fn set_next(&self, node: Box<dyn ProcessNode>) {
        *self.next.lock().unwrap() = Some(node);
    }

    /// Forward processed buffers: to the chained node if present, otherwise
    /// to the terminal sink.
    pub fn forward(&self, mut buffers: Vec<DataBuffer>) -> Result<(), ProcessError> {
        let next = self.next.lock().unwrap();
        if let Some(node) = next.as_ref() {
            return node.process_data(buffers);
        }
        drop(next);
        let Some(sink) = self.sink.upgrade() else {
            return Err(ProcessError::BadValue(
                "pipeline owner has been released".into(),
            ));
        };
        if buffers.is_empty() {
            return Err(ProcessError::BadValue("no buffer to deliver".into()));
        }
        sink.on_processed_frame(buffers.swap_remove(0));
        Ok(())
    }

    /// Recursively release and drop the downstream chain.
    pub fn release(&self) {
        let mut next = self.next.lock().unwrap();
        if let Some(node) = next.take() {
            node.release_process_node();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::CaptureSink;

    #[test]
    fn forward_delivers_first_buffer_to_sink() {
        let sink = CaptureSink::new();
        let link = NodeLink::new(sink.weak());
        let mut buf = DataBuffer::new(4);
        buf.set_int64(TIME_US, 7);
        link.forward(vec![buf]).unwrap();
        let frames = sink.take_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].find_int64(TIME_US), Some(7));
    }

    #[test]
    fn forward_to_expired_sink_is_bad_value() {
        let sink = CaptureSink::new();
        let weak = sink.weak();
        drop(sink);
        let link = NodeLink::new(weak);
        assert!(matches!(
            link.forward(vec![DataBuffer::new(4)]),
            Err(ProcessError::BadValue(_))
        ));
    }

    #[test]
    fn forward_with_no_buffers_is_bad_value() {
        let sink = CaptureSink::new();
        let link = NodeLink::new(sink.weak());
        assert!(matches!(
            link.forward(Vec::new()),
            Err(ProcessError::BadValue(_))
        ));
    }
}
