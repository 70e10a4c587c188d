use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::{Config, ConfigError};
use crate::domain::User;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::normalizer::Normalizer;
use crate::store::{SqliteStore, Store};

/// Everything a command needs, built once at start-up and passed by reference.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub normalizer: Normalizer,
    pub config: Config,
    pub config_path: PathBuf,
}

impl AppContext {
    /// Load config from `config_path` (or the default location) and open the
    /// store at `db_path`, falling back to the configured or default path.
    pub fn new(config_path: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(p) => p,
            None => Config::default_config_path()?,
        };
        let config = Config::load(&config_path)?;

        let db_path = match db_path.or_else(|| config.database_path.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Arc::new(SqliteStore::new(&db_path)?);
        tracing::debug!(db = %db_path.display(), config = %config_path.display(), "opened store");

        Ok(Self {
            store,
            fetcher: Arc::new(HttpFetcher::new()?),
            normalizer: Normalizer::new(),
            config,
            config_path,
        })
    }

    /// In-memory store with the given fetcher; config writes go to `config_path`.
    pub fn in_memory(fetcher: Arc<dyn Fetcher + Send + Sync>, config_path: PathBuf) -> Result<Self> {
        Ok(Self {
            store: Arc::new(SqliteStore::in_memory()?),
            fetcher,
            normalizer: Normalizer::new(),
            config: Config::default(),
            config_path,
        })
    }

    /// Resolve the configured current user.
    pub fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or(GatorError::NotLoggedIn)?;

        self.store
            .get_user(name)?
            .ok_or_else(|| GatorError::UserNotFound(name.to_string()))
    }

    pub fn set_current_user(&mut self, name: &str) -> Result<()> {
        self.config.set_user(name, &self.config_path)?;
        Ok(())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
        Ok(data_dir.join("gator").join("gator.db"))
    }
}
