//! Upload progress observer.
//!
//! A registry of in-flight upload requests keyed by a generated request id. It is an explicit
//! value handed to whoever submits a form, so each button can watch its own request.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(String);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(format!("req_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Percent-complete (0-100) for every upload currently being tracked.
#[derive(Debug, Clone, Default)]
pub struct UploadProgress {
    entries: Arc<Mutex<HashMap<RequestId, u8>>>,
}

impl UploadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request at 0%.
    pub fn begin(&self) -> RequestId {
        let id = RequestId::generate();
        self.set(&id, 0.0);
        id
    }

    /// Record progress for a request, clamped to 0..=100.
    pub fn set(&self, id: &RequestId, percent: f64) {
        let value = if percent.is_nan() {
            0
        } else {
            percent.clamp(0.0, 100.0).round() as u8
        };
        self.lock().insert(id.clone(), value);
    }

    pub fn get(&self, id: &RequestId) -> Option<u8> {
        self.lock().get(id).copied()
    }

    pub fn remove(&self, id: &RequestId) {
        self.lock().remove(id);
    }

    pub fn snapshot(&self) -> HashMap<RequestId, u8> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, u8>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared byte counter for all file parts of one request.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    registry: UploadProgress,
    id: RequestId,
    sent: AtomicU64,
    total: u64,
}

impl ProgressTracker {
    pub(crate) fn new(registry: UploadProgress, id: RequestId, total: u64) -> Self {
        Self {
            registry,
            id,
            sent: AtomicU64::new(0),
            total,
        }
    }

    fn advance(&self, bytes: u64) {
        let sent = self.sent.fetch_add(bytes, Ordering::Relaxed) + bytes;
        if self.total > 0 {
            self.registry
                .set(&self.id, sent as f64 * 100.0 / self.total as f64);
        }
    }
}

/// Reader that reports every chunk it hands out to a [`ProgressTracker`].
pub(crate) struct ProgressReader<R> {
    inner: R,
    tracker: Arc<ProgressTracker>,
}

impl<R> ProgressReader<R> {
    pub(crate) fn new(inner: R, tracker: Arc<ProgressTracker>) -> Self {
        Self { inner, tracker }
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let poll = Pin::new(&mut self.inner).poll_read(cx, buf);
        if let Poll::Ready(Ok(())) = &poll {
            let read = buf.filled().len() - before;
            if read > 0 {
                self.tracker.advance(read as u64);
            }
        }
        poll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_set_clamps_to_percent_range() {
        let progress = UploadProgress::new();
        let id = progress.begin();
        assert_eq!(progress.get(&id), Some(0));

        progress.set(&id, 140.0);
        assert_eq!(progress.get(&id), Some(100));

        progress.set(&id, -3.0);
        assert_eq!(progress.get(&id), Some(0));

        progress.set(&id, 42.4);
        assert_eq!(progress.get(&id), Some(42));
    }

    #[test]
    fn test_remove_forgets_request() {
        let progress = UploadProgress::new();
        let a = progress.begin();
        let b = progress.begin();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("req_"));

        progress.remove(&a);
        assert_eq!(progress.get(&a), None);
        assert_eq!(progress.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_reader_reports_bytes_read() {
        let progress = UploadProgress::new();
        let id = progress.begin();
        let tracker = Arc::new(ProgressTracker::new(progress.clone(), id.clone(), 200));

        let mut first = ProgressReader::new(std::io::Cursor::new(vec![1u8; 100]), tracker.clone());
        let mut sink = Vec::new();
        first.read_to_end(&mut sink).await.unwrap();
        assert_eq!(progress.get(&id), Some(50));

        let mut second = ProgressReader::new(std::io::Cursor::new(vec![2u8; 100]), tracker);
        second.read_to_end(&mut sink).await.unwrap();
        assert_eq!(progress.get(&id), Some(100));
        assert_eq!(sink.len(), 200);
    }
}
