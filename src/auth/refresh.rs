//! Token refresh coordination
//!
//! However many requests discover an expired token at once, only one refresh
//! call goes out. The first caller moves the coordinator from `Idle` to
//! `Refreshing` and starts the call; everyone else (the first caller
//! included) parks a completion handle and is settled, in enqueue order, when
//! the call finishes.

use crate::error::ApiError;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type Outcome = Result<String, ApiError>;

enum RefreshState {
    Idle,
    Refreshing { waiters: Vec<oneshot::Sender<Outcome>> },
}

/// Single-flight gate around the token refresh call
#[derive(Clone)]
pub struct RefreshCoordinator {
    state: Arc<Mutex<RefreshState>>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RefreshState::Idle)),
        }
    }

    /// True while a refresh call is in flight
    pub fn is_refreshing(&self) -> bool {
        matches!(*lock(&self.state), RefreshState::Refreshing { .. })
    }

    /// Join the in-flight refresh, or start one with `refresh`.
    ///
    /// The refresh future runs on its own task, so dropping the caller that
    /// started it does not cancel it or strand the other waiters.
    pub async fn run<F, Fut>(&self, refresh: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let leader = {
            let mut state = lock(&self.state);
            match &mut *state {
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing { waiters: vec![tx] };
                    true
                }
                RefreshState::Refreshing { waiters } => {
                    waiters.push(tx);
                    tracing::debug!(queued = waiters.len(), "Waiting for in-flight token refresh");
                    false
                }
            }
        };

        if leader {
            let call = refresh();
            let settle = Settle {
                state: Some(Arc::clone(&self.state)),
            };
            tokio::spawn(async move {
                let outcome = call.await;
                settle.finish(outcome);
            });
        }

        rx.await.unwrap_or_else(|_| {
            Err(ApiError::RefreshFailed {
                reason: "token refresh was aborted".to_string(),
                original: None,
            })
        })
    }
}

/// Moves the coordinator back to `Idle` and settles the queue.
///
/// If the refresh task dies before finishing, dropping this still resets the
/// state; the queued handles are dropped and their callers see an error.
struct Settle {
    state: Option<Arc<Mutex<RefreshState>>>,
}

impl Settle {
    fn finish(mut self, outcome: Outcome) {
        let Some(state) = self.state.take() else {
            return;
        };
        let waiters = take_waiters(&state);
        tracing::debug!(
            waiters = waiters.len(),
            success = outcome.is_ok(),
            "Token refresh settled"
        );
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for Settle {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            take_waiters(&state);
        }
    }
}

fn take_waiters(state: &Mutex<RefreshState>) -> Vec<oneshot::Sender<Outcome>> {
    match std::mem::replace(&mut *lock(state), RefreshState::Idle) {
        RefreshState::Refreshing { waiters } => waiters,
        RefreshState::Idle => Vec::new(),
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
