//! Configuration loading and validation.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. built-in defaults ([`Config::default()`]),
//! 2. `ziptrawl.toml` then `ziptrawl.yaml` from the platform config directory
//!    (or a single file given explicitly),
//! 3. environment variables prefixed with `ZIPTRAWL_`, using `__` to reach
//!    nested keys (`ZIPTRAWL_CACHE__CAPACITY=50`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ziptrawl_storage::{CredentialRouter, CredentialRule, RetryPolicy};

pub const ENV_PREFIX: &str = "ZIPTRAWL_";
const APPLICATION: &str = "ziptrawl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    /// Ordered login rules; the first whose pattern matches the root wins.
    pub credentials: Vec<CredentialConfig>,
    pub cache: CacheConfig,
    /// Root aliases, e.g. `contracts` for the contracts directory.
    pub roots: BTreeMap<String, String>,
    /// Most matches printed per search.
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    /// Per-call timeout, in seconds.
    pub timeout_secs: u64,
    /// Attempts per remote call, including the first.
    pub retries: u32,
    /// Delay before the first retry, in milliseconds. Doubles every attempt.
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Regular expression matched against the root path.
    pub pattern: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
    /// Most archives kept on disk.
    pub capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            credentials: vec![
                CredentialConfig::new("^/out/", "fz223free", "fz223free"),
                CredentialConfig::new(".*", "free", "free"),
            ],
            cache: CacheConfig::default(),
            roots: [
                ("pz", "/fcs_regions/Tatarstan_Resp/purchaseplans/"),
                ("pg", "/fcs_regions/Tatarstan_Resp/plangraphs2017/"),
                ("notifications", "/fcs_regions/Tatarstan_Resp/notifications/"),
                ("contracts", "/fcs_regions/Tatarstan_Resp/contracts/"),
                ("protocols", "/fcs_regions/Tatarstan_Resp/protocols/"),
            ]
            .into_iter()
            .map(|(alias, path)| (alias.to_string(), path.to_string()))
            .collect(),
            max_results: 100,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: "ftp.zakupki.gov.ru".to_string(),
            port: 21,
            timeout_secs: 30,
            retries: 3,
            retry_delay_ms: 500,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        let path = match project_dirs() {
            Some(dirs) => dirs.cache_dir().to_path_buf(),
            None => std::env::temp_dir().join(APPLICATION),
        };
        Self { path, capacity: 20 }
    }
}

impl CredentialConfig {
    pub fn new(pattern: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            user: user.into(),
            password: password.into(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

/// Configuration files read when none is given explicitly.
pub fn default_files() -> Vec<PathBuf> {
    match project_dirs() {
        Some(dirs) => vec![
            dirs.config_dir().join(format!("{APPLICATION}.toml")),
            dirs.config_dir().join(format!("{APPLICATION}.yaml")),
        ],
        None => Vec::new(),
    }
}

impl Config {
    /// Loads and validates the configuration.
    ///
    /// With `file` set, only that file is read (YAML if it ends in `.yaml` or
    /// `.yml`, TOML otherwise) and it must exist. Otherwise the default files
    /// are read if present.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let files = match file {
            Some(file) => {
                if !file.is_file() {
                    exn::bail!(ErrorKind::Invalid(format!("config file {} does not exist", file.display())));
                }
                vec![file.to_path_buf()]
            },
            None => default_files(),
        };
        let config = Self::figment(&files).extract::<Self>().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        tracing::debug!(files = ?files, "Loaded configuration");
        Ok(config)
    }

    /// Defaults, then `files` in order, then the environment.
    pub fn figment(files: &[PathBuf]) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        for file in files {
            figment = match file.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                _ => figment.merge(Toml::file(file)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.remote.host.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid("remote.host must not be empty".to_string()));
        }
        if self.remote.retries == 0 {
            exn::bail!(ErrorKind::Invalid("remote.retries must be at least 1".to_string()));
        }
        if self.cache.capacity == 0 {
            exn::bail!(ErrorKind::Invalid("cache.capacity must be at least 1".to_string()));
        }
        if self.credentials.is_empty() {
            exn::bail!(ErrorKind::Invalid("at least one credential rule is required".to_string()));
        }
        self.credential_router()?;
        if let Some((alias, _)) = self.roots.iter().find(|(_, path)| !path.starts_with('/')) {
            exn::bail!(ErrorKind::Invalid(format!("root {alias:?} must be an absolute path")));
        }
        Ok(())
    }

    /// Compiles the credential rules, in order.
    pub fn credential_router(&self) -> Result<CredentialRouter> {
        let mut rules = Vec::with_capacity(self.credentials.len());
        for rule in &self.credentials {
            let compiled = CredentialRule::new(&rule.pattern, rule.user.clone(), rule.password.clone())
                .or_raise(|| ErrorKind::Invalid(format!("credential pattern {:?}", rule.pattern)))?;
            rules.push(compiled);
        }
        Ok(CredentialRouter::new(rules))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.remote.retries, Duration::from_millis(self.remote.retry_delay_ms))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn load(jail: &Jail, files: &[&str]) -> figment::error::Result<Config> {
        let files: Vec<_> = files.iter().map(|file| jail.directory().join(file)).collect();
        Config::figment(&files).extract()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.remote.host, "ftp.zakupki.gov.ru");
        assert_eq!(config.cache.capacity, 20);
        assert_eq!(config.max_results, 100);
        let router = config.credential_router().unwrap();
        assert_eq!(router.resolve("/out/nsi/").unwrap().user, "fz223free");
        assert_eq!(router.resolve("/fcs_regions/").unwrap().user, "free");
    }

    #[test]
    fn test_toml_then_yaml_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ziptrawl.toml",
                r#"
                    max_results = 10

                    [remote]
                    host = "ftp.example.org"
                    retries = 5

                    [roots]
                    nsi = "/out/nsi/"
                "#,
            )?;
            jail.create_file("ziptrawl.yaml", "remote:\n  retries: 7\ncache:\n  capacity: 3\n")?;
            jail.set_env("ZIPTRAWL_CACHE__CAPACITY", "4");
            let config = load(jail, &["ziptrawl.toml", "ziptrawl.yaml"])?;
            assert_eq!(config.remote.host, "ftp.example.org");
            assert_eq!(config.remote.port, 21);
            assert_eq!(config.remote.retries, 7);
            assert_eq!(config.cache.capacity, 4);
            assert_eq!(config.max_results, 10);
            assert_eq!(config.roots.get("nsi").map(String::as_str), Some("/out/nsi/"));
            // Defaults for the rest of the table survive.
            assert!(config.roots.contains_key("contracts"));
            Ok(())
        });
    }

    #[test]
    fn test_credentials_replace_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "ziptrawl.toml",
                r#"
                    [[credentials]]
                    pattern = ".*"
                    user = "guest"
                    password = "guest"
                "#,
            )?;
            let config = load(jail, &["ziptrawl.toml"])?;
            assert_eq!(config.credentials, vec![CredentialConfig::new(".*", "guest", "guest")]);
            Ok(())
        });
    }

    #[test]
    fn test_missing_files_are_skipped() {
        Jail::expect_with(|jail| {
            let config = load(jail, &["absent.toml", "absent.yaml"])?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_explicit_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("custom.yml");
        std::fs::write(&file, "cache:\n  capacity: 0\n").unwrap();
        let err = Config::load(Some(&file)).unwrap_err();
        assert_eq!(*err, ErrorKind::Invalid("cache.capacity must be at least 1".to_string()));
    }

    #[rstest]
    #[case::empty_host(|c: &mut Config| c.remote.host = " ".to_string())]
    #[case::no_retries(|c: &mut Config| c.remote.retries = 0)]
    #[case::no_capacity(|c: &mut Config| c.cache.capacity = 0)]
    #[case::no_credentials(|c: &mut Config| c.credentials.clear())]
    #[case::bad_pattern(|c: &mut Config| c.credentials[0].pattern = "^/out/(".to_string())]
    #[case::relative_root(|c: &mut Config| { c.roots.insert("x".to_string(), "out/".to_string()); })]
    fn test_validate_rejects(#[case] break_it: fn(&mut Config)) {
        let mut config = Config::default();
        break_it(&mut config);
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_retry_policy_and_timeout() {
        let config = Config::default();
        assert_eq!(config.retry_policy().attempts(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }
}
