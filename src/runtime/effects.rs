use super::runtime_error::{ErrorKind, RuntimeError};
use crate::lang::Effect;
use futures::FutureExt;
use futures::executor::ThreadPool;
use std::panic::AssertUnwindSafe;

/// Work queue for deferred effects.
///
/// Effects run on a small thread pool, decoupled from the scheduler's step
/// loop. Nothing orders an effect's completion against later scheduler
/// steps, and effects already submitted are not cancelled when their process
/// retires or is stopped.
#[derive(Clone)]
pub struct EffectQueue {
    pool: ThreadPool,
}

impl EffectQueue {
    pub fn new(workers: usize) -> Result<Self, RuntimeError> {
        let pool = ThreadPool::builder()
            .pool_size(workers.max(1))
            .name_prefix("ash-effect-")
            .create()
            .map_err(|e| {
                RuntimeError::new(
                    ErrorKind::Effects,
                    format!("cannot start effect workers: {}", e),
                )
            })?;
        Ok(Self { pool })
    }

    /// Hand `effect` to the workers; it will be called with `time`.
    pub fn submit(&self, effect: Effect, time: f64) {
        self.pool.spawn_ok(async move {
            let outcome = AssertUnwindSafe(async move { effect(time) })
                .catch_unwind()
                .await;
            if outcome.is_err() {
                tracing::error!(time, "deferred effect panicked");
            }
        });
    }
}

impl std::fmt::Debug for EffectQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectQueue").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_effect_receives_time() {
        let queue = EffectQueue::new(1).unwrap();
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        queue.submit(
            Arc::new(move |t| {
                tx.lock().unwrap().send(t).unwrap();
            }),
            2.5,
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 2.5);
    }

    #[test]
    fn test_panicking_effect_does_not_poison_queue() {
        let queue = EffectQueue::new(1).unwrap();
        queue.submit(Arc::new(|_| panic!("boom")), 0.0);

        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        queue.submit(
            Arc::new(move |t| {
                tx.lock().unwrap().send(t).unwrap();
            }),
            1.0,
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 1.0);
    }
}
