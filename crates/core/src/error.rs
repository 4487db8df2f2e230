/// Failure kinds shared by all pipeline nodes.
///
/// Every internal helper returns one of these; the top-level node entry
/// points propagate the first failure. A failed frame is simply dropped;
/// skip/recover policy belongs to the pipeline owner, not the node.
///
/// # Example
/// ```rust
/// use framepipe_core::prelude::ProcessError;
///
/// let err = ProcessError::DisableProcess;
/// assert_eq!(err.to_string(), "process node is inactive or released");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Malformed or missing input: empty buffer list, absent mandatory tag,
    /// failed layout invariant.
    #[error("bad value: {0}")]
    BadValue(String),
    /// The source/target format or resolution combination is not supported
    /// by this node.
    #[error("unsupported conversion: {0}")]
    BadType(String),
    /// A required tag is absent or carries an unknown format ordinal.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conversion logic reached a branch the init gating should have made
    /// unreachable.
    #[error("bad operation: {0}")]
    BadOperate(String),
    /// An internal plane copy failed.
    #[error("memory operation failed: {0}")]
    MemoryOpt(String),
    /// The node was never activated or has been released.
    #[error("process node is inactive or released")]
    DisableProcess,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let err = ProcessError::NotFound("tag timeUs".into());
        assert!(err.to_string().contains("timeUs"));
        assert!(matches!(err, ProcessError::NotFound(_)));
    }
}
