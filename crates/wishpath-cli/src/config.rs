//! Configuration file management for wishpath.
//!
//! Provides a TOML-based config file at `~/.config/wishpath/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use wishpath_core::CoordinatorConfig;
use wishpath_db::config::DbConfig;

/// Overrides the reload debounce, in milliseconds.
pub const DEBOUNCE_ENV_VAR: &str = "WISHPATH_RELOAD_DEBOUNCE_MS";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub session: SessionSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionSection {
    /// Quiet period before refetching after completion changes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload_debounce_ms: Option<u64>,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the wishpath config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/wishpath` or
/// `~/.config/wishpath`, also on macOS.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("wishpath");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("wishpath")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file holds a database URL that may embed a password, so it is made
/// owner-only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(path)
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct WishpathConfig {
    pub db_config: DbConfig,
    pub coordinator: CoordinatorConfig,
}

impl WishpathConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `WISHPATH_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Debounce: `WISHPATH_RELOAD_DEBOUNCE_MS` > `session.reload_debounce_ms` > 500ms
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let debounce_ms = if let Ok(raw) = std::env::var(DEBOUNCE_ENV_VAR) {
            Some(
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("{DEBOUNCE_ENV_VAR} is not a number: {raw:?}"))?,
            )
        } else {
            file_config
                .as_ref()
                .and_then(|cfg| cfg.session.reload_debounce_ms)
        };

        let mut coordinator = CoordinatorConfig::default();
        if let Some(ms) = debounce_ms {
            coordinator = coordinator.with_reload_debounce(Duration::from_millis(ms));
        }

        Ok(Self {
            db_config: DbConfig::new(db_url),
            coordinator,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_util::{lock_env, EnvGuard};

    fn write_config(dir: &std::path::Path, contents: &str) {
        let cfg_dir = dir.join("wishpath");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), contents).unwrap();
    }

    #[test]
    fn config_without_session_section_parses() {
        let cfg: ConfigFile =
            toml::from_str("[database]\nurl = \"postgresql://h:5432/db\"\n").unwrap();
        assert_eq!(cfg.database.url, "postgresql://h:5432/db");
        assert!(cfg.session.reload_debounce_ms.is_none());
    }

    #[test]
    fn save_config_writes_to_xdg_dir() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _xdg = EnvGuard::set("XDG_CONFIG_HOME", tmp.path());

        let path = save_config(&ConfigFile {
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
            session: SessionSection {
                reload_debounce_ms: Some(250),
            },
        })
        .unwrap();
        assert_eq!(path, tmp.path().join("wishpath").join("config.toml"));

        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, "postgresql://testhost:5432/testdb");
        assert_eq!(loaded.session.reload_debounce_ms, Some(250));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn resolve_with_cli_flag_overrides_all() {
        let _lock = lock_env();
        let _url = EnvGuard::set(DbConfig::ENV_VAR, "postgresql://env:5432/envdb");

        let config = WishpathConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
    }

    #[test]
    fn resolve_with_env_var_overrides_config_file() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        write_config(
            tmp.path(),
            "[database]\nurl = \"postgresql://file:5432/filedb\"\n\n[session]\nreload_debounce_ms = 900\n",
        );
        let _xdg = EnvGuard::set("XDG_CONFIG_HOME", tmp.path());
        let _url = EnvGuard::set(DbConfig::ENV_VAR, "postgresql://env:5432/envdb");
        let _debounce = EnvGuard::set(DEBOUNCE_ENV_VAR, "50");

        let config = WishpathConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.coordinator.reload_debounce, Duration::from_millis(50));
    }

    #[test]
    fn resolve_reads_config_file() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        write_config(
            tmp.path(),
            "[database]\nurl = \"postgresql://file:5432/filedb\"\n\n[session]\nreload_debounce_ms = 900\n",
        );
        let _xdg = EnvGuard::set("XDG_CONFIG_HOME", tmp.path());
        let _url = EnvGuard::unset(DbConfig::ENV_VAR);
        let _debounce = EnvGuard::unset(DEBOUNCE_ENV_VAR);

        let config = WishpathConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://file:5432/filedb");
        assert_eq!(config.coordinator.reload_debounce, Duration::from_millis(900));
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        let tmp = tempfile::TempDir::new().unwrap();
        let _xdg = EnvGuard::set("XDG_CONFIG_HOME", tmp.path());
        let _url = EnvGuard::unset(DbConfig::ENV_VAR);
        let _debounce = EnvGuard::unset(DEBOUNCE_ENV_VAR);

        let config = WishpathConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.coordinator, CoordinatorConfig::default());
    }

    #[test]
    fn resolve_rejects_non_numeric_debounce() {
        let _lock = lock_env();
        let _debounce = EnvGuard::set(DEBOUNCE_ENV_VAR, "soon");

        let err = WishpathConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap_err();
        assert!(err.to_string().contains(DEBOUNCE_ENV_VAR), "unexpected error: {err}");
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("wishpath/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
