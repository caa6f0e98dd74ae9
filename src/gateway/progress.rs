//! Upload progress side channel

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Reports upload progress as a rounded percentage (0-100).
///
/// Cloneable so a request body can report from inside its stream.
#[derive(Debug, Clone)]
pub struct UploadProgress {
    tx: Arc<watch::Sender<u8>>,
}

impl UploadProgress {
    pub fn new() -> (Self, watch::Receiver<u8>) {
        let (tx, rx) = watch::channel(0);
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Publish `sent` out of `total` bytes. An empty upload counts as done.
    pub fn report(&self, sent: u64, total: u64) {
        let percent = if total == 0 {
            100
        } else {
            let rounded = (sent.min(total) * 100 + total / 2) / total;
            u8::try_from(rounded).unwrap_or(100)
        };
        self.set(percent);
    }

    pub fn reset(&self) {
        self.set(0);
    }

    pub fn percent(&self) -> u8 {
        *self.tx.borrow()
    }

    fn set(&self, percent: u8) {
        self.tx.send_if_modified(|current| {
            if *current == percent {
                false
            } else {
                *current = percent;
                true
            }
        });
    }

    /// Counter shared by every part of one multipart body
    pub(crate) fn tracker(&self, total: u64) -> ByteTracker {
        ByteTracker {
            progress: self.clone(),
            sent: Arc::new(AtomicU64::new(0)),
            total,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ByteTracker {
    progress: UploadProgress,
    sent: Arc<AtomicU64>,
    total: u64,
}

impl ByteTracker {
    pub(crate) fn advance(&self, bytes: usize) {
        let bytes = u64::try_from(bytes).unwrap_or(u64::MAX);
        let sent = self.sent.fetch_add(bytes, Ordering::Relaxed).saturating_add(bytes);
        self.progress.report(sent, self.total);
    }
}
