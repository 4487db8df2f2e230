use std::sync::{Mutex, Weak};

use framepipe_core::prelude::*;
use tracing::{info, warn};

use crate::color_format::ColorFormatProcess;
use crate::node::{FrameSink, ProcessNode};
use crate::scale_convert::ScaleConvertProcess;

/// Two-stage post-decode pipeline: color re-arrangement first, scaling
/// second, with converted frames landing at the caller's sink.
///
/// Built from a source and a target stream description; each stage derives
/// its own slice of the conversion at init time, so a pair the stages cannot
/// service together fails construction instead of failing per frame.
pub struct FramePipeline {
    head: Mutex<Option<Box<dyn ProcessNode>>>,
    metrics: PipelineMetrics,
}

impl FramePipeline {
    pub fn new(
        source: VideoConfigParams,
        target: VideoConfigParams,
        sink: Weak<dyn FrameSink>,
    ) -> Result<Self, ProcessError> {
        let mut color = ColorFormatProcess::new(sink.clone());
        let color_out = color.init_node(&source, &source.with_format(target.format()))?;
        let mut scale = ScaleConvertProcess::new(sink);
        scale.init_node(&color_out, &target)?;
        color.set_next(Box::new(scale));
        info!(
            source = %source.format(),
            target = %target.format(),
            from_width = source.width(),
            from_height = source.height(),
            to_width = target.width(),
            to_height = target.height(),
            "frame pipeline assembled"
        );
        Ok(Self {
            head: Mutex::new(Some(Box::new(color))),
            metrics: PipelineMetrics::default(),
        })
    }

    /// Run one frame through the chain. Failed frames are counted as drops
    /// and the error is returned to the caller.
    pub fn process_frame(&self, frame: DataBuffer) -> Result<(), ProcessError> {
        self.metrics.frame_in();
        let guard = self.head.lock().unwrap();
        let Some(node) = guard.as_deref() else {
            self.metrics.drop_frame();
            return Err(ProcessError::DisableProcess);
        };
        match node.process_data(vec![frame]) {
            Ok(()) => {
                self.metrics.frame_out();
                Ok(())
            }
            Err(err) => {
                self.metrics.drop_frame();
                warn!(error = %err, "frame dropped");
                Err(err)
            }
        }
    }

    /// Release the whole chain; subsequent frames are refused.
    pub fn shutdown(&self) {
        if let Some(node) = self.head.lock().unwrap().take() {
            node.release_process_node();
            info!("frame pipeline shut down");
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
