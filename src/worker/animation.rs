//! Repeating animation task.
//!
//! While animating, a timer thread enqueues one animation frame per frame
//! interval. Cancelling the token ends the loop at the next tick.

use crate::worker::operation::Request;
use crate::worker::queue::OperationQueue;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A cancellation token that can be shared between threads.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A running animation timer
pub(crate) struct AnimationTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl AnimationTask {
    /// Start enqueueing animation frames into `queue` every `interval`.
    pub(crate) fn spawn(queue: Arc<OperationQueue<Request>>, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let timer_token = token.clone();

        let handle = thread::spawn(move || {
            debug!("Animation started, one frame every {:?}", interval);
            loop {
                thread::sleep(interval);
                if timer_token.is_cancelled() {
                    break;
                }
                // Skip ticks while the worker is behind
                if !queue.is_empty() {
                    continue;
                }
                if queue.enqueue(Request::AnimationFrame).is_err() {
                    break;
                }
            }
            debug!("Animation stopped");
        });

        Self { token, handle }
    }

    /// Cancel the timer and wait for it to exit.
    pub(crate) fn stop(self) {
        self.token.cancel();
        let _ = self.handle.join();
    }
}
