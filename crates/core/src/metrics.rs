use std::sync::atomic::{AtomicU64, Ordering};

/// Lightweight frame-flow counters for a pipeline or a single node.
///
/// # Example
/// ```rust
/// use framepipe_core::metrics::PipelineMetrics;
///
/// let metrics = PipelineMetrics::default();
/// metrics.frame_in();
/// metrics.frame_out();
/// assert_eq!(metrics.frames_in(), 1);
/// assert_eq!(metrics.frames_out(), 1);
/// ```
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    frames_in: AtomicU64,
    frames_out: AtomicU64,
    dropped: AtomicU64,
}

impl PipelineMetrics {
    /// Count a frame handed to the pipeline.
    pub fn frame_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame delivered downstream.
    pub fn frame_out(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a frame dropped by a failed validation or conversion.
    pub fn drop_frame(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot of frames in.
    pub fn frames_in(&self) -> u64 {
        self.frames_in.load(Ordering::Relaxed)
    }

    /// Snapshot of frames out.
    pub fn frames_out(&self) -> u64 {
        self.frames_out.load(Ordering::Relaxed)
    }

    /// Snapshot of dropped frames.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Clone for PipelineMetrics {
    fn clone(&self) -> Self {
        let cloned = PipelineMetrics::default();
        cloned.frames_in.store(self.frames_in(), Ordering::Relaxed);
        cloned
            .frames_out
            .store(self.frames_out(), Ordering::Relaxed);
        cloned.dropped.store(self.dropped(), Ordering::Relaxed);
        cloned
    }
}
