//! Connection management for a single profile.
//!
//! A [`ConnectionManager`] owns one [`ConnectionProfile`] and at most one live
//! [`DriverHandle`]. The handle is opened lazily by
//! [`ConnectionManager::ensure_connected`] and replaced by
//! [`ConnectionManager::reconnect_if_current`] after the query facade sees a
//! closed pool. Callers that failed on a handle which has since been replaced
//! pick up the replacement instead of closing it.
//!
//! Default application and handle swaps happen under the profile lock (a
//! `tokio::sync::Mutex`). Queries never take that lock: they clone the current
//! handle out of a short-lived synchronous read lock and run against it.

use crate::db::driver::{Driver, DriverHandle};
use crate::error::DbResult;
use crate::models::ConnectionProfile;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, error};

#[derive(Clone)]
struct LiveHandle {
    handle: Arc<dyn DriverHandle>,
    id: u64,
}

pub struct ConnectionManager {
    driver: Arc<dyn Driver>,
    profile: Mutex<ConnectionProfile>,
    live: RwLock<Option<LiveHandle>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("handle_id", &self.handle_id())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create an unconnected manager for `profile`.
    pub fn new(driver: Arc<dyn Driver>, profile: ConnectionProfile) -> Self {
        Self {
            driver,
            profile: Mutex::new(profile),
            live: RwLock::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// The current handle, if connected.
    pub fn handle(&self) -> Option<Arc<dyn DriverHandle>> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|live| Arc::clone(&live.handle))
    }

    /// The current handle together with its id, read under one lock.
    pub fn current(&self) -> Option<(Arc<dyn DriverHandle>, u64)> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|live| (Arc::clone(&live.handle), live.id))
    }

    /// Identity of the current handle. Every installed handle gets a fresh,
    /// increasing id.
    pub fn handle_id(&self) -> Option<u64> {
        self.live
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|live| live.id)
    }

    pub fn is_connected(&self) -> bool {
        self.handle_id().is_some()
    }

    /// A copy of the profile, including any defaults applied so far.
    pub async fn profile(&self) -> ConnectionProfile {
        self.profile.lock().await.clone()
    }

    /// Open a handle unless one is already installed.
    pub async fn ensure_connected(&self) -> DbResult<Arc<dyn DriverHandle>> {
        self.ensure_current().await.map(|(handle, _)| handle)
    }

    /// Like [`ensure_connected`](Self::ensure_connected), also returning the
    /// id of the handle handed out.
    pub async fn ensure_current(&self) -> DbResult<(Arc<dyn DriverHandle>, u64)> {
        let mut profile = self.profile.lock().await;

        // Another caller may have connected while we waited for the lock
        if let Some(current) = self.current() {
            return Ok(current);
        }

        self.open_locked(&mut profile).await
    }

    /// Close the current handle (if any) and open a fresh one.
    pub async fn reconnect(&self) -> DbResult<Arc<dyn DriverHandle>> {
        let mut profile = self.profile.lock().await;
        self.replace_locked(&mut profile).await.map(|(handle, _)| handle)
    }

    /// Replace the handle with id `failed_id`.
    ///
    /// When another caller already replaced it, the newer handle is returned
    /// untouched. Concurrent failures on one handle therefore open exactly one
    /// replacement.
    pub async fn reconnect_if_current(
        &self,
        failed_id: u64,
    ) -> DbResult<(Arc<dyn DriverHandle>, u64)> {
        let mut profile = self.profile.lock().await;

        if let Some((handle, id)) = self.current() {
            if id != failed_id {
                debug!(database = %profile.database, failed_id, handle_id = id, "Handle already replaced");
                return Ok((handle, id));
            }
        }

        self.replace_locked(&mut profile).await
    }

    /// Close the current handle and return to the unconnected state.
    pub async fn close(&self) {
        let profile = self.profile.lock().await;

        if let Some(old) = self.take_live() {
            if let Err(e) = old.handle.close().await {
                debug!(database = %profile.database, error = %e, "Ignoring close error");
            }
            debug!(database = %profile.database, handle_id = old.id, "Connection closed");
        }
    }

    async fn replace_locked(
        &self,
        profile: &mut ConnectionProfile,
    ) -> DbResult<(Arc<dyn DriverHandle>, u64)> {
        if let Some(old) = self.take_live() {
            if let Err(e) = old.handle.close().await {
                debug!(database = %profile.database, handle_id = old.id, error = %e, "Ignoring close error during reconnect");
            }
        }

        self.open_locked(profile).await
    }

    async fn open_locked(
        &self,
        profile: &mut ConnectionProfile,
    ) -> DbResult<(Arc<dyn DriverHandle>, u64)> {
        profile.apply_defaults();
        let target = profile.connect_target();

        match self.driver.open(&target, profile.pool_limits()).await {
            Ok(handle) => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                *self.live.write().unwrap_or_else(PoisonError::into_inner) = Some(LiveHandle {
                    handle: Arc::clone(&handle),
                    id,
                });
                debug!(database = %profile.database, handle_id = id, "Connected");
                Ok((handle, id))
            }
            Err(e) => {
                error!(database = %profile.database, error = %e, "Failed to connect to database");
                Err(e)
            }
        }
    }

    fn take_live(&self) -> Option<LiveHandle> {
        self.live
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
