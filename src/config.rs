use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use log::{error, info, warn};
use rand::Rng;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::roster::Roster;
use crate::service::ElectionService;
use crate::store::{ElectionStore, LocalStore, MongoStore};

/// Value left in `db_uri` by the sample configuration.
pub const DB_URI_PLACEHOLDER: &str = "DB_URI_HERE";

/// Admin code used by the test configuration.
#[cfg(test)]
pub const EXAMPLE_ADMIN_CODE: &str = "4321";

/// Raw application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables.
#[derive(Deserialize)]
struct RawConfig {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
    admin_code: String,
}

/// Application configuration. This struct becomes managed state and can be
/// inspected by any endpoint.
pub struct Config {
    auth_ttl: u32,
    jwt_secret: String,
    admin_code_hash: String,
}

impl Config {
    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to encrypt JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Check a submitted admin code.
    pub fn verify_admin_code(&self, code: &str) -> Result<bool, argon2::Error> {
        argon2::verify_encoded(&self.admin_code_hash, code.as_bytes())
    }

    /// Only a hash of the admin code is kept in memory.
    fn from_raw(raw: RawConfig) -> Result<Self, argon2::Error> {
        // 16 bytes is recommended for password hashing:
        //  https://en.wikipedia.org/wiki/Argon2
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let admin_code_hash =
            argon2::hash_encoded(raw.admin_code.as_bytes(), &salt, &argon2::Config::default())?;
        Ok(Self {
            auth_ttl: raw.auth_ttl,
            jwt_secret: raw.jwt_secret,
            admin_code_hash,
        })
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let raw = match rocket.figment().extract::<RawConfig>() {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Nobody should be able to administer the election with their own code.
        if Roster::builtin()
            .participants()
            .iter()
            .any(|p| p.verify_code(&raw.admin_code))
        {
            warn!("The admin code is also a participant's voting code; consider changing it");
        }

        let config = match Config::from_raw(raw) {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to hash the admin code: {e}");
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the election store.
#[derive(Deserialize)]
struct StoreConfig {
    // secrets
    db_uri: Option<String>,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    local_store_dir: Option<PathBuf>,
    /// Seconds between state polls when change streams are unavailable.
    #[serde(default = "default_poll_interval")]
    poll_interval: u64,
}

fn default_db_name() -> String {
    "ponta_firme".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

impl StoreConfig {
    /// The database URI, if one has really been configured.
    fn remote_uri(&self) -> Option<&str> {
        self.db_uri
            .as_deref()
            .map(str::trim)
            .filter(|uri| !uri.is_empty() && *uri != DB_URI_PLACEHOLDER)
    }
}

/// A fairing that picks the election store, connects to it, and places an
/// [`ElectionService`] over it into managed state.
///
/// A configured `db_uri` selects MongoDB; otherwise the local store is used,
/// mirrored to disk if `local_store_dir` is set.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Election store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: Arc<dyn ElectionStore> = if let Some(uri) = config.remote_uri() {
            info!("Loaded database config, connecting...");
            let poll_interval = StdDuration::from_secs(config.poll_interval.max(1));
            match MongoStore::connect(uri, &config.db_name, poll_interval).await {
                Ok(store) => {
                    info!("...database connection online!");
                    Arc::new(store)
                }
                Err(e) => {
                    error!("Failed to connect to database: {e}");
                    return Err(rocket);
                }
            }
        } else if let Some(dir) = &config.local_store_dir {
            warn!("No database configured, running on the local store");
            match LocalStore::open(dir).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to open local store in {}: {e}", dir.display());
                    return Err(rocket);
                }
            }
        } else {
            warn!("No database configured, running on an in-memory store");
            Arc::new(LocalStore::in_memory())
        };

        // Manage the state.
        rocket = rocket.manage(ElectionService::new(store, Roster::builtin()));
        Ok(rocket)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn store_config(db_uri: Option<&str>) -> StoreConfig {
        StoreConfig {
            db_uri: db_uri.map(str::to_string),
            db_name: default_db_name(),
            local_store_dir: None,
            poll_interval: default_poll_interval(),
        }
    }

    #[test]
    fn backend_selection() {
        assert_eq!(store_config(None).remote_uri(), None);
        assert_eq!(store_config(Some("")).remote_uri(), None);
        assert_eq!(store_config(Some("  ")).remote_uri(), None);
        assert_eq!(store_config(Some(DB_URI_PLACEHOLDER)).remote_uri(), None);
        assert_eq!(
            store_config(Some("mongodb://localhost:27017")).remote_uri(),
            Some("mongodb://localhost:27017")
        );
    }

    #[test]
    fn admin_code_is_hashed() {
        let config = Config::example();
        assert!(config.admin_code_hash.starts_with("$argon2"));
        assert!(config.verify_admin_code(EXAMPLE_ADMIN_CODE).unwrap());
        assert!(!config.verify_admin_code("1508").unwrap());
        assert!(!config.verify_admin_code("").unwrap());
    }
}
