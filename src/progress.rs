use std::sync::Arc;

use crate::request::ResumeToken;

/// Snapshot of transfer progress.
#[derive(Copy, Clone, Debug)]
pub struct TransferProgress {
    transferred_bytes: u64,
    total_bytes: Option<u64>,
}

impl TransferProgress {
    /// Creates a progress snapshot.
    #[inline]
    pub fn new(transferred_bytes: u64, total_bytes: Option<u64>) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
        }
    }

    /// Gets the number of bytes transferred so far.
    #[inline]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// Gets the expected total, when the transport knows it.
    #[inline]
    pub fn total_bytes(&self) -> Option<u64> {
        self.total_bytes
    }

    /// Fractional completion in `[0, 1]`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total_bytes.map(|total| {
            if total == 0 {
                1.0
            } else {
                (self.transferred_bytes as f64 / total as f64).min(1.0)
            }
        })
    }
}

/// Progress sink.
///
/// Delivery is best effort: the pipeline never blocks on it and dropping
/// events (e.g. on cancellation) is allowed. A sink must not gate control
/// flow, which is why it returns nothing.
pub type OnProgress = Arc<dyn Fn(TransferProgress) + Send + Sync>;

/// Resume-data sink, invoked when a download ultimately fails or is
/// cancelled with resumable state left over.
pub type OnResumeData = Arc<dyn Fn(ResumeToken) + Send + Sync>;
