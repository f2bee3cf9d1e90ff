//! Named connection profiles.
//!
//! A [`Registry`] maps aliases to [`Database`]s. It can be filled once from a
//! JSON profile file or incrementally with [`Registry::register`], and it can
//! carry a routing function that picks an alias from query arguments.
//!
//! All databases of a registry share one [`MappingCache`] and one
//! [`RetryPolicy`].

use crate::config::{self, RegistrySettings};
use crate::db::database::Database;
use crate::db::driver::Driver;
use crate::db::mapping::MappingCache;
use crate::db::mysql::MySqlDriver;
use crate::db::retry::RetryPolicy;
use crate::error::{DbError, DbResult};
use crate::models::{ConnectionProfile, QueryParam};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Picks a profile alias from query arguments.
pub type RouteFn = dyn Fn(&[QueryParam]) -> String + Send + Sync;

pub struct Registry {
    driver: Arc<dyn Driver>,
    settings: RegistrySettings,
    cache: Arc<MappingCache>,
    databases: RwLock<HashMap<String, Arc<Database>>>,
    route: RwLock<Option<Arc<RouteFn>>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("settings", &self.settings)
            .field("aliases", &self.aliases())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Create an empty registry that opens connections through `driver`.
    pub fn new(driver: Arc<dyn Driver>, settings: RegistrySettings) -> Self {
        Self {
            driver,
            settings,
            cache: Arc::new(MappingCache::new()),
            databases: RwLock::new(HashMap::new()),
            route: RwLock::new(None),
        }
    }

    /// Create an empty registry backed by MySQL.
    pub fn mysql(settings: RegistrySettings) -> Self {
        Self::new(Arc::new(MySqlDriver::new()), settings)
    }

    pub fn settings(&self) -> RegistrySettings {
        self.settings
    }

    /// The mapping cache shared by every database of this registry.
    pub fn cache(&self) -> &Arc<MappingCache> {
        &self.cache
    }

    /// Register every profile of a JSON profile file.
    ///
    /// Only allowed while the registry is empty; returns the number of
    /// profiles loaded.
    pub fn load_config_file(&self, path: impl AsRef<Path>) -> DbResult<usize> {
        if !self.read_databases().is_empty() {
            return Err(DbError::AlreadyInitialized);
        }

        let profiles = config::load_profiles(path.as_ref())?;
        let count = profiles.len();

        let mut databases = self.write_databases();
        // A concurrent register may have won the race while the file was read
        if !databases.is_empty() {
            return Err(DbError::AlreadyInitialized);
        }
        for (alias, profile) in profiles {
            let database = self.build(&alias, profile);
            databases.insert(alias, database);
        }
        drop(databases);

        info!(path = %path.as_ref().display(), profiles = count, "Loaded connection profiles");
        Ok(count)
    }

    /// Add a profile under `alias`, replacing any profile already there.
    pub fn register(&self, alias: impl Into<String>, profile: ConnectionProfile) -> Arc<Database> {
        let alias = alias.into();
        let database = self.build(&alias, profile);

        if self
            .write_databases()
            .insert(alias.clone(), Arc::clone(&database))
            .is_some()
        {
            debug!(alias = %alias, "Replaced connection profile");
        }

        database
    }

    /// Look up a database by alias.
    pub fn using(&self, alias: &str) -> Option<Arc<Database>> {
        self.read_databases().get(alias).cloned()
    }

    /// Look up a database by alias, failing when it is not registered.
    pub fn get(&self, alias: &str) -> DbResult<Arc<Database>> {
        self.using(alias)
            .ok_or_else(|| DbError::profile_not_found(alias))
    }

    /// Install the routing function used by [`Registry::route`].
    pub fn set_route<F>(&self, route: F)
    where
        F: Fn(&[QueryParam]) -> String + Send + Sync + 'static,
    {
        *self.route.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(route));
    }

    /// Pick a database with the routing function. `None` when no routing
    /// function is installed or the chosen alias is unknown.
    pub fn route(&self, args: &[QueryParam]) -> Option<Arc<Database>> {
        let route = self
            .route
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        let alias = route(args);
        debug!(alias = %alias, "Routed query");
        self.using(&alias)
    }

    /// Registered aliases, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.read_databases().keys().cloned().collect();
        aliases.sort();
        aliases
    }

    pub fn len(&self) -> usize {
        self.read_databases().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_databases().is_empty()
    }

    /// Close every open connection. Profiles stay registered.
    pub async fn close_all(&self) {
        let databases: Vec<Arc<Database>> = self.read_databases().values().cloned().collect();
        for database in databases {
            database.close().await;
        }
        info!("All connections closed");
    }

    fn build(&self, alias: &str, profile: ConnectionProfile) -> Arc<Database> {
        Arc::new(Database::new(
            alias,
            Arc::clone(&self.driver),
            profile,
            Arc::clone(&self.cache),
            RetryPolicy::new(self.settings.max_tries),
        ))
    }

    fn read_databases(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Database>>> {
        self.databases.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_databases(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Database>>> {
        self.databases.write().unwrap_or_else(PoisonError::into_inner)
    }
}
