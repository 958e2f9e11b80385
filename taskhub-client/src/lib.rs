//! # Taskhub Client SDK
//!
//! Client-side session management for the Taskhub API: holds the
//! access token and current-user snapshot, attaches the token to every
//! outgoing request, and transparently coordinates access-token
//! refresh when a request comes back 401.
//!
//! The refresh flow is the interesting part. Many requests can fail
//! with 401 at once (every call in flight when the access token
//! expires), but exactly one refresh call may be issued. The
//! [`interceptor::RefreshCoordinator`] makes that invariant explicit:
//! a three-state machine (idle / refreshing / failed) plus an ordered
//! queue of suspended callers. The refresh request itself bypasses
//! interception entirely, so it can never recurse.
//!
//! ## Example
//!
//! ```no_run
//! use taskhub_client::TaskhubClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = TaskhubClient::new("http://localhost:8080")?;
//!
//! client.register("alice", "alice@example.com", "secret1", None).await?;
//! let tasks = client.list_tasks(Default::default()).await?;
//! println!("{} tasks", tasks.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod interceptor;
pub mod session;

pub use client::{TaskQuery, TaskhubClient};
pub use error::ClientError;
