//! The signed-in vendor, shared by every client and controller.
//!
//! Login and logout bump an epoch so responses issued under an earlier
//! session can be recognised and dropped.

use std::{
    fmt,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

/// An authenticated vendor.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub vendor_id: String,
    pub email: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &"<redacted>")
            .field("vendor_id", &self.vendor_id)
            .field("email", &self.email)
            .finish()
    }
}

#[derive(Debug, Default)]
struct Slot {
    session: Option<Session>,
    epoch: u64,
}

/// Shared handle to the current vendor session.
///
/// One context is created at startup and cloned into every collection client
/// and list controller. `login` and `logout` are the only ways to change it;
/// each change bumps the epoch so that responses started under a previous
/// session can be told apart.
#[derive(Clone, Debug, Default)]
pub struct SessionContext {
    inner: Arc<RwLock<Slot>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session) -> Self {
        let ctx = Self::new();
        ctx.login(session);
        ctx
    }

    pub fn login(&self, session: Session) {
        let mut slot = self.inner.write().unwrap_or_else(|p| p.into_inner());
        tracing::info!(vendor_id = %session.vendor_id, "vendor signed in");
        slot.session = Some(session);
        slot.epoch += 1;
    }

    pub fn logout(&self) {
        let mut slot = self.inner.write().unwrap_or_else(|p| p.into_inner());
        if slot.session.take().is_some() {
            tracing::info!("vendor signed out");
        }
        slot.epoch += 1;
    }

    pub fn current(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .session
            .clone()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .session
            .is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).epoch
    }
}
