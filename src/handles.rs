//! Revocable display handles over rendered image blobs.
//!
//! A [`DisplayHandle`] lets a front end show a rendered page without copying
//! its bytes: it carries a `blob:pdf2img/<id>` URL that
//! [`HandleRegistry::resolve`] maps back to the shared blob for as long as
//! the handle is live.
//!
//! Every handle is revoked exactly once in effect: [`DisplayHandle::revoke`]
//! is idempotent, and dropping a handle revokes it. Replacing a page's blob
//! or discarding the page therefore always releases the old entry, whichever
//! mutation path got there first.

use crate::output::ImageBlob;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;

const URL_PREFIX: &str = "blob:pdf2img/";

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashMap<u64, ImageBlob>,
}

type SharedState = Arc<Mutex<RegistryState>>;

fn lock(state: &Mutex<RegistryState>) -> MutexGuard<'_, RegistryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Issues and tracks display handles for one session.
#[derive(Debug, Clone, Default)]
pub struct HandleRegistry {
    state: SharedState,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `blob` and return a live handle to it.
    pub fn issue(&self, blob: ImageBlob) -> DisplayHandle {
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id, blob);
        DisplayHandle {
            id,
            registry: Arc::downgrade(&self.state),
        }
    }

    /// Blob behind a live handle URL, `None` once revoked or unknown.
    pub fn resolve(&self, url: &str) -> Option<ImageBlob> {
        let id = url.strip_prefix(URL_PREFIX)?.parse::<u64>().ok()?;
        lock(&self.state).live.get(&id).cloned()
    }

    /// Number of handles issued and not yet revoked.
    pub fn live_count(&self) -> usize {
        lock(&self.state).live.len()
    }
}

/// A revocable reference to a blob registered in a [`HandleRegistry`].
///
/// Not `Clone`: exactly one owner is responsible for releasing it.
pub struct DisplayHandle {
    id: u64,
    registry: Weak<Mutex<RegistryState>>,
}

impl DisplayHandle {
    /// URL a front end can use to look the blob up.
    pub fn url(&self) -> String {
        format!("{URL_PREFIX}{}", self.id)
    }

    /// Release the registry entry. Safe to call any number of times.
    ///
    /// Returns `true` only for the call that actually removed the entry.
    pub fn revoke(&self) -> bool {
        let Some(state) = self.registry.upgrade() else {
            return false;
        };
        let removed = lock(&state).live.remove(&self.id).is_some();
        if removed {
            debug!("Revoked display handle {}", self.url());
        }
        removed
    }

    pub fn is_live(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|state| lock(&state).live.contains_key(&self.id))
    }
}

impl Drop for DisplayHandle {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for DisplayHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayHandle")
            .field("url", &self.url())
            .field("live", &self.is_live())
            .finish()
    }
}
