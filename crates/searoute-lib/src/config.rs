use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::history::{PageRequest, RouteHistorySource};
use crate::popularity::MAX_TOP_ROUTES;
use crate::safety::PolarWatersValidator;

/// Default filename for the route database.
const DATABASE_FILENAME: &str = "searoute.db";

/// Environment variable overriding the database location.
pub const DATABASE_ENV: &str = "SEAROUTE_DATABASE";

/// Tunables for the routing core. Every field has a default, so a config file
/// only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    /// Stamped on history entries whose context does not name one.
    pub engine_version: String,
    pub default_history_source: RouteHistorySource,
    /// Number of popular routes returned when the caller gives no limit.
    pub popular_routes_default: usize,
    /// Hard cap on popular routes per request.
    pub popular_routes_limit: usize,
    pub history_page_size: u32,
    pub max_history_page_size: u32,
    /// Ports at or beyond this absolute latitude get an ice warning. `None`
    /// turns the rule off.
    pub polar_latitude_limit: Option<f64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            default_history_source: RouteHistorySource::Manual,
            popular_routes_default: 8,
            popular_routes_limit: MAX_TOP_ROUTES,
            history_page_size: PageRequest::DEFAULT_SIZE,
            max_history_page_size: 200,
            polar_latitude_limit: Some(PolarWatersValidator::DEFAULT_LATITUDE_LIMIT),
        }
    }
}

impl RoutingConfig {
    /// Load a JSON config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "loaded routing config");
        Ok(config)
    }

    /// Load `path` when given, otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Clamp a requested popular-routes limit, applying the default for `None`.
    pub fn popular_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.popular_routes_default)
            .min(self.popular_routes_limit)
    }
}

/// Location of the database in the platform data directory.
pub fn default_database_path() -> Result<PathBuf> {
    let dirs =
        ProjectDirs::from("com", "searoute", "searoute").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(DATABASE_FILENAME))
}

/// Resolve the database path: explicit override, then [`DATABASE_ENV`], then
/// the platform default.
pub fn resolve_database_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(env_path) = env::var_os(DATABASE_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(env_path));
    }
    default_database_path()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"engine_version": "2.1.0", "polar_latitude_limit": null}}"#
        )
        .unwrap();

        let config = RoutingConfig::from_path(file.path()).unwrap();
        assert_eq!(config.engine_version, "2.1.0");
        assert_eq!(config.polar_latitude_limit, None);
        assert_eq!(config.history_page_size, 20);
        assert_eq!(config.default_history_source, RouteHistorySource::Manual);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"engine": "x"}}"#).unwrap();
        assert!(matches!(
            RoutingConfig::from_path(file.path()),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn popular_limit_defaults_and_caps() {
        let config = RoutingConfig::default();
        assert_eq!(config.popular_limit(None), 8);
        assert_eq!(config.popular_limit(Some(500)), 50);
        assert_eq!(config.popular_limit(Some(0)), 0);
    }

    #[test]
    fn explicit_database_path_wins() {
        let explicit = Path::new("/tmp/explicit.db");
        assert_eq!(
            resolve_database_path(Some(explicit)).unwrap(),
            explicit.to_path_buf()
        );
    }
}
