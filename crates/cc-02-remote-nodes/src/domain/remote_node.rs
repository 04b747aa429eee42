//! A connected peer as seen from this node.

use super::peer::PeerId;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, MutexGuard};

/// Connected peer with its last reported height and an exclusive-use lock
/// that keeps sync requests to it from overlapping.
#[derive(Debug)]
pub struct RemoteNode {
    pub peer_id: PeerId,
    height: AtomicU64,
    exclusive: Mutex<()>,
}

impl RemoteNode {
    pub fn new(peer_id: PeerId, height: u64) -> Self {
        Self {
            peer_id,
            height: AtomicU64::new(height),
            exclusive: Mutex::new(()),
        }
    }

    /// Last height this peer reported.
    pub fn height(&self) -> u64 {
        self.height.load(Ordering::Acquire)
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::Release);
    }

    /// Raise the known height; announcements arriving out of order never
    /// lower it.
    pub fn update_height(&self, height: u64) {
        self.height.fetch_max(height, Ordering::AcqRel);
    }

    /// Not currently serving an exclusive request.
    pub fn is_idle(&self) -> bool {
        self.exclusive.try_lock().is_ok()
    }

    /// Take the exclusive-use lock without waiting.
    pub fn try_acquire(&self) -> Option<MutexGuard<'_, ()>> {
        self.exclusive.try_lock().ok()
    }

    /// Run `f` while holding this peer's exclusive-use lock.
    pub async fn use_exclusive<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.exclusive.lock().await;
        f().await
    }
}
