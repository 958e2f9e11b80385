/// Single-flight refresh coordination
///
/// When the access token expires, every request in flight fails with
/// 401 at roughly the same time. Only one of them may call the refresh
/// endpoint; the rest must wait for its outcome and then retry with the
/// new token. This module makes that invariant mechanically checkable
/// by modelling it as an explicit state machine:
///
/// ```text
///            caller hits 401
///                  │
///         ┌────────▼────────┐   another 401 arrives
///  ┌──────┤      Idle       │        while refreshing:
///  │      └────────┬────────┘        caller is queued,
///  │               │ becomes leader  NOT a second refresh
///  │      ┌────────▼────────┐◄──────────────┐
///  │      │   Refreshing    │  (ordered queue of waiters)
///  │      └──┬───────────┬──┘
///  │ success │           │ failure → reject all waiters
///  │ wake    │           │
///  │ waiters │  ┌────────▼────────┐
///  └─────────┘  │     Failed      │  sticky until reset()
///               └─────────────────┘  (next successful login)
/// ```
///
/// The refresh call itself is passed in as a closure and executed only
/// by the leader, outside the state lock. It must be a plain request
/// that is never itself intercepted, or the flow could recurse.

use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Outcome delivered to queued waiters
type WaiterResult = Result<String, RefreshError>;

/// Errors from the refresh flow
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RefreshError {
    /// The refresh call failed; the session is over and local state
    /// should be torn down
    #[error("Session expired: {0}")]
    Failed(String),

    /// A previous refresh already failed and the coordinator has not
    /// been reset by a new login
    #[error("Session already expired")]
    AlreadyFailed,
}

/// Coordinator state
enum State {
    /// No refresh in flight
    Idle,

    /// A leader is performing the refresh; everyone else queues here.
    /// Waiters are woken in enqueue order.
    Refreshing { waiters: VecDeque<oneshot::Sender<WaiterResult>> },

    /// A refresh failed; all further attempts short-circuit until
    /// `reset()` (the next successful login/register)
    Failed,
}

/// What a caller should do after consulting the coordinator
enum Role {
    /// This caller runs the refresh
    Leader,

    /// Another caller is refreshing; wait for its outcome
    Follower(oneshot::Receiver<WaiterResult>),

    /// Refresh already failed; give up immediately
    Rejected,
}

/// Single-flight refresh coordinator
///
/// Shared by value inside the client (one per session). All methods
/// take `&self`; the state lives behind a mutex that is never held
/// across an await point.
pub struct RefreshCoordinator {
    state: Mutex<State>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Idle),
        }
    }

    /// Runs `do_refresh` with single-flight semantics
    ///
    /// The first caller in becomes the leader and executes
    /// `do_refresh`; concurrent callers are queued and resolved, in
    /// enqueue order, with the leader's outcome. Exactly one
    /// `do_refresh` future is ever run per expiry, no matter how many
    /// requests failed.
    ///
    /// On success every caller receives the new access token. On
    /// failure every caller receives an error, and the coordinator
    /// stays in the failed state until [`reset`](Self::reset).
    pub async fn run<F, Fut>(&self, do_refresh: F) -> Result<String, RefreshError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String, String>>,
    {
        let role = {
            let mut state = self.state.lock().expect("coordinator lock poisoned");
            match &mut *state {
                State::Idle => {
                    *state = State::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    Role::Leader
                }
                State::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    Role::Follower(rx)
                }
                State::Failed => Role::Rejected,
            }
        };

        match role {
            Role::Rejected => Err(RefreshError::AlreadyFailed),
            Role::Follower(rx) => {
                tracing::debug!("Refresh already in flight, queueing");
                // The leader always resolves or rejects every waiter,
                // so a closed channel means a bug, not a normal path.
                rx.await
                    .unwrap_or(Err(RefreshError::Failed("coordinator dropped".to_string())))
            }
            Role::Leader => {
                tracing::debug!("Starting access-token refresh");
                let outcome = do_refresh().await;
                self.finish(outcome)
            }
        }
    }

    /// Publishes the leader's outcome and wakes all waiters in order
    fn finish(&self, outcome: Result<String, String>) -> Result<String, RefreshError> {
        let mut state = self.state.lock().expect("coordinator lock poisoned");

        let waiters = match std::mem::replace(&mut *state, State::Idle) {
            State::Refreshing { waiters } => waiters,
            // finish() is only reachable from the leader, which is the
            // only path out of Refreshing
            _ => VecDeque::new(),
        };

        match outcome {
            Ok(token) => {
                tracing::debug!(waiters = waiters.len(), "Refresh succeeded");
                for waiter in waiters {
                    let _ = waiter.send(Ok(token.clone()));
                }
                Ok(token)
            }
            Err(reason) => {
                tracing::warn!(
                    waiters = waiters.len(),
                    "Refresh failed, rejecting queued requests: {}",
                    reason
                );
                *state = State::Failed;
                let err = RefreshError::Failed(reason);
                for waiter in waiters {
                    let _ = waiter.send(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    /// Returns to idle after a new login/register establishes a fresh
    /// session
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("coordinator lock poisoned");
        *state = State::Idle;
    }

    /// True if a refresh has failed and the coordinator has not been
    /// reset
    pub fn is_failed(&self) -> bool {
        matches!(
            *self.state.lock().expect("coordinator lock poisoned"),
            State::Failed
        )
    }
}
