/// In-memory session state
///
/// Holds the current access token and a snapshot of the logged-in
/// user. The refresh token is never stored here; it lives in the
/// reqwest cookie store as an HTTP-only cookie and the client code
/// never sees its value.

use std::sync::RwLock;

use taskhub_shared::dto::PublicUser;

/// Shared session state for one client instance
///
/// Cheap to read from many concurrent requests; writes happen only on
/// login, logout, refresh, and profile updates.
#[derive(Default)]
pub struct SessionState {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    access_token: Option<String>,
    user: Option<PublicUser>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a fresh session after login or register
    pub fn establish(&self, access_token: String, user: PublicUser) {
        let mut inner = self.inner.write().expect("session lock poisoned");
        inner.access_token = Some(access_token);
        inner.user = Some(user);
    }

    /// Replaces just the access token (after a successful refresh)
    pub fn set_access_token(&self, access_token: String) {
        let mut inner = self.inner.write().expect("session lock poisoned");
        inner.access_token = Some(access_token);
    }

    /// Updates the cached user snapshot (after a profile update)
    pub fn set_user(&self, user: PublicUser) {
        let mut inner = self.inner.write().expect("session lock poisoned");
        inner.user = Some(user);
    }

    /// Tears the session down (logout or failed refresh)
    pub fn clear(&self) {
        let mut inner = self.inner.write().expect("session lock poisoned");
        inner.access_token = None;
        inner.user = None;
    }

    /// Current access token, if logged in
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .access_token
            .clone()
    }

    /// Snapshot of the logged-in user, if any
    pub fn current_user(&self) -> Option<PublicUser> {
        self.inner
            .read()
            .expect("session lock poisoned")
            .user
            .clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.inner
            .read()
            .expect("session lock poisoned")
            .access_token
            .is_some()
    }
}
