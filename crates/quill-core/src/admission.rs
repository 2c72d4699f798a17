//! Admission control for concurrent streams.
//!
//! A permit is RAII: the slot is released exactly once when the permit
//! drops, on every exit path including panics and client disconnects.
//! `FallbackLimiter` leaves a seam for a distributed limiter backend; the
//! primary's health is probed on every call so a recovered backend is
//! picked up without restarts.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use quill_types::error::AdmissionError;

/// Held for the lifetime of one admitted stream.
pub struct StreamPermit {
    _permit: Option<OwnedSemaphorePermit>,
}

impl StreamPermit {
    fn semaphore(permit: OwnedSemaphorePermit) -> Self {
        Self {
            _permit: Some(permit),
        }
    }

    /// A permit not backed by any slot. Used by limiter backends whose
    /// accounting lives elsewhere.
    pub fn unbacked() -> Self {
        Self { _permit: None }
    }
}

/// Bounds the number of concurrently running streams.
#[async_trait]
pub trait StreamLimiter: Send + Sync {
    /// Non-blocking: a full limiter rejects instead of queueing.
    async fn try_acquire(&self) -> Result<StreamPermit, AdmissionError>;

    /// Whether this limiter's backend is currently usable.
    async fn is_healthy(&self) -> bool {
        true
    }
}

/// In-process limiter backed by a semaphore.
pub struct LocalStreamLimiter {
    semaphore: Arc<Semaphore>,
    max: usize,
}

impl LocalStreamLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max)),
            max,
        }
    }
}

#[async_trait]
impl StreamLimiter for LocalStreamLimiter {
    async fn try_acquire(&self) -> Result<StreamPermit, AdmissionError> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map(StreamPermit::semaphore)
            .map_err(|_| AdmissionError::TooManyStreams { max: self.max })
    }
}

/// Prefers a primary (typically distributed) limiter, falling back to a
/// local one when the primary is unhealthy.
pub struct FallbackLimiter {
    primary: Option<Arc<dyn StreamLimiter>>,
    local: LocalStreamLimiter,
}

impl FallbackLimiter {
    pub fn new(primary: Option<Arc<dyn StreamLimiter>>, local: LocalStreamLimiter) -> Self {
        Self { primary, local }
    }
}

#[async_trait]
impl StreamLimiter for FallbackLimiter {
    async fn try_acquire(&self) -> Result<StreamPermit, AdmissionError> {
        if let Some(primary) = &self.primary {
            if primary.is_healthy().await {
                return primary.try_acquire().await;
            }
            tracing::warn!("primary stream limiter unhealthy, using local limiter");
        }
        self.local.try_acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[tokio::test]
    async fn test_cap_enforced_and_slot_released_on_drop() {
        let limiter = LocalStreamLimiter::new(2);

        let a = limiter.try_acquire().await.unwrap();
        let _b = limiter.try_acquire().await.unwrap();

        let err = limiter.try_acquire().await.err().unwrap();
        assert!(matches!(err, AdmissionError::TooManyStreams { max: 2 }));

        drop(a);
        assert!(limiter.try_acquire().await.is_ok());
    }

    struct FlakyPrimary {
        healthy: AtomicBool,
        acquisitions: AtomicU32,
    }

    #[async_trait]
    impl StreamLimiter for FlakyPrimary {
        async fn try_acquire(&self) -> Result<StreamPermit, AdmissionError> {
            self.acquisitions.fetch_add(1, Ordering::SeqCst);
            Ok(StreamPermit::unbacked())
        }

        async fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_fallback_probes_primary_per_call() {
        let primary = Arc::new(FlakyPrimary {
            healthy: AtomicBool::new(true),
            acquisitions: AtomicU32::new(0),
        });
        let limiter = FallbackLimiter::new(
            Some(Arc::clone(&primary) as Arc<dyn StreamLimiter>),
            LocalStreamLimiter::new(1),
        );

        let _p1 = limiter.try_acquire().await.unwrap();
        assert_eq!(primary.acquisitions.load(Ordering::SeqCst), 1);

        // Primary drops out; the local limiter takes over.
        primary.healthy.store(false, Ordering::SeqCst);
        let _p2 = limiter.try_acquire().await.unwrap();
        assert_eq!(primary.acquisitions.load(Ordering::SeqCst), 1);

        // Local cap now applies.
        assert!(limiter.try_acquire().await.is_err());

        // Primary recovers without any reconstruction.
        primary.healthy.store(true, Ordering::SeqCst);
        let _p3 = limiter.try_acquire().await.unwrap();
        assert_eq!(primary.acquisitions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_primary_uses_local() {
        let limiter = FallbackLimiter::new(None, LocalStreamLimiter::new(1));
        let _p = limiter.try_acquire().await.unwrap();
        assert!(limiter.try_acquire().await.is_err());
    }
}
