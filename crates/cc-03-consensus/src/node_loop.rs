//! # Node Loop
//!
//! Background task that keeps stepping a node: step while it advances,
//! then sleep until woken, the step deadline passes or shutdown is
//! signalled.
//!
//! Rejected peer input is reported on the error channel and the loop
//! carries on. Any other error is reported and ends the loop.

use crate::domain::{ConsensusError, ConsensusResult, Progress};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Something the loop can drive.
#[async_trait]
pub trait NodeTask: Send + Sync + 'static {
    async fn step(&self) -> ConsensusResult<Progress>;

    /// When `on_timeout` is due, if ever.
    async fn deadline(&self) -> Option<Instant>;

    async fn on_timeout(&self) -> ConsensusResult<()>;

    /// Notified whenever stepping may make progress again.
    fn wake_signal(&self) -> Arc<Notify>;
}

pub struct NodeLoop {
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<ConsensusResult<()>>>>,
}

impl NodeLoop {
    /// Spawn the loop. Errors are forwarded to `errors`.
    pub fn start<T, E>(task: Arc<T>, errors: mpsc::UnboundedSender<E>) -> Self
    where
        T: NodeTask,
        E: From<ConsensusError> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(task, shutdown_rx, errors));
        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal shutdown. Idempotent.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Wait for the loop to end. Later calls return `Ok(())`.
    pub async fn join(&self) -> ConsensusResult<()> {
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| ConsensusError::Internal(format!("node loop panicked: {}", e)))?,
            None => Ok(()),
        }
    }
}

impl Drop for NodeLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run<T, E>(
    task: Arc<T>,
    mut shutdown_rx: watch::Receiver<bool>,
    errors: mpsc::UnboundedSender<E>,
) -> ConsensusResult<()>
where
    T: NodeTask,
    E: From<ConsensusError> + Send + 'static,
{
    let wake = task.wake_signal();
    info!("[cc-03] node loop started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        match task.step().await {
            Ok(Progress::Advanced) => {
                tokio::task::yield_now().await;
                continue;
            }
            Ok(_) => {}
            Err(e) => report(e, &errors)?,
        }

        let deadline = task.deadline().await;
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = wake.notified() => {}
            _ = sleep_until(deadline) => {
                if let Err(e) = task.on_timeout().await {
                    report(e, &errors)?;
                }
            }
        }
    }
    info!("[cc-03] node loop stopped");
    Ok(())
}

/// Forward `e`; fail unless it is recoverable.
fn report<E: From<ConsensusError>>(
    e: ConsensusError,
    errors: &mpsc::UnboundedSender<E>,
) -> ConsensusResult<()> {
    let recoverable = e.is_recoverable();
    if recoverable {
        warn!("[cc-03] {}", e);
    } else {
        error!("[cc-03] node loop failed: {}", e);
    }
    let _ = errors.send(E::from(e.clone()));
    if recoverable {
        Ok(())
    } else {
        Err(e)
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct MockNode {
        steps: AtomicUsize,
        wake: Arc<Notify>,
    }

    #[async_trait]
    impl NodeTask for MockNode {
        async fn step(&self) -> ConsensusResult<Progress> {
            self.steps.fetch_add(1, Ordering::SeqCst);
            Ok(Progress::Steady)
        }

        async fn deadline(&self) -> Option<Instant> {
            None
        }

        async fn on_timeout(&self) -> ConsensusResult<()> {
            Ok(())
        }

        fn wake_signal(&self) -> Arc<Notify> {
            self.wake.clone()
        }
    }

    #[derive(Default)]
    struct MockRejectionNode {
        wake: Arc<Notify>,
    }

    #[async_trait]
    impl NodeTask for MockRejectionNode {
        async fn step(&self) -> ConsensusResult<Progress> {
            Err(ConsensusError::Internal(":(".into()))
        }

        async fn deadline(&self) -> Option<Instant> {
            None
        }

        async fn on_timeout(&self) -> ConsensusResult<()> {
            Ok(())
        }

        fn wake_signal(&self) -> Arc<Notify> {
            self.wake.clone()
        }
    }

    /// Rejects input on every timeout, never fails.
    #[derive(Default)]
    struct FlakyPeerNode {
        wake: Arc<Notify>,
    }

    #[async_trait]
    impl NodeTask for FlakyPeerNode {
        async fn step(&self) -> ConsensusResult<Progress> {
            Ok(Progress::Waiting)
        }

        async fn deadline(&self) -> Option<Instant> {
            Some(Instant::now() + Duration::from_millis(10))
        }

        async fn on_timeout(&self) -> ConsensusResult<()> {
            Err(ConsensusError::NonContinuousHeight {
                expected: 2,
                actual: 5,
            })
        }

        fn wake_signal(&self) -> Arc<Notify> {
            self.wake.clone()
        }
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let node = Arc::new(MockNode::default());
        let (tx, _rx) = mpsc::unbounded_channel::<ConsensusError>();
        let node_loop = NodeLoop::start(node.clone(), tx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!node_loop.is_finished());
        node_loop.stop();
        node_loop.stop();
        assert_eq!(node_loop.join().await, Ok(()));
        assert!(node_loop.is_finished());
        assert!(node.steps.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_wake_steps_again() {
        let node = Arc::new(MockNode::default());
        let (tx, _rx) = mpsc::unbounded_channel::<ConsensusError>();
        let node_loop = NodeLoop::start(node.clone(), tx);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let before = node.steps.load(Ordering::SeqCst);
        node.wake.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(node.steps.load(Ordering::SeqCst) > before);

        node_loop.stop();
        node_loop.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_fatal_error_ends_loop() {
        let node = Arc::new(MockRejectionNode::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<ConsensusError>();
        let node_loop = NodeLoop::start(node, tx);

        let result = node_loop.join().await;
        assert!(matches!(result, Err(ConsensusError::Internal(_))));
        assert!(matches!(rx.recv().await, Some(ConsensusError::Internal(_))));
    }

    #[tokio::test]
    async fn test_protocol_errors_are_reported_and_survived() {
        let node = Arc::new(FlakyPeerNode::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<ConsensusError>();
        let node_loop = NodeLoop::start(node, tx);

        for _ in 0..2 {
            let reported = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap();
            assert!(matches!(
                reported,
                Some(ConsensusError::NonContinuousHeight { .. })
            ));
        }
        assert!(!node_loop.is_finished());
        node_loop.stop();
        assert_eq!(node_loop.join().await, Ok(()));
    }
}
