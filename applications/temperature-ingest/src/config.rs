use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DbConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    /// Connection string. `None` means storage is unconfigured.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            table: default_table(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Offset applied when rendering `hora_local`. Storage is always UTC.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

fn default_table() -> String {
    "temperature_readings".into()
}

fn default_max_connections() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_utc_offset_minutes() -> i32 {
    60
}

fn default_api_host() -> String {
    "0.0.0.0".into()
}

fn default_api_port() -> u16 {
    8080
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// A missing file falls back to defaults so the service can run from env alone.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let mut cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            Self::from_yaml(&raw)?
        } else {
            Self::default()
        };

        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, anyhow::Error> {
        let expanded = expand_env_placeholders(raw)?;
        let cfg: Self = serde_yaml::from_str(&expanded).context("failed to parse config YAML")?;
        Ok(cfg)
    }

    /// Env overrides win over whatever the YAML had.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(table) = lookup("READINGS_TABLE") {
            self.database.table = table;
        }
        if let Some(port) = lookup("SERVER_PORT").and_then(|p| p.parse().ok()) {
            self.api.port = port;
        }

        // Blank strings come from unset placeholders in deployment manifests.
        if self
            .database
            .url
            .as_deref()
            .is_some_and(|url| url.trim().is_empty())
        {
            self.database.url = None;
        }
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !is_valid_identifier(&self.database.table) {
            anyhow::bail!(
                "invalid table name '{}': expected [A-Za-z_][A-Za-z0-9_]* up to 63 chars",
                self.database.table
            );
        }
        if self.display.utc_offset_minutes.abs() >= 24 * 60 {
            anyhow::bail!(
                "display.utc_offset_minutes out of range: {}",
                self.display.utc_offset_minutes
            );
        }
        Ok(())
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database.url.as_deref()
    }

    pub fn api_bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.store.operation_timeout_secs)
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
fn expand_env_placeholders(input: &str) -> Result<String, anyhow::Error> {
    let mut out = String::with_capacity(input.len());
    let mut it = input.chars().peekable();

    while let Some(c) = it.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let close = match it.peek().copied() {
            Some('$') => {
                it.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        it.next();
        let var = read_until(&mut it, close)
            .with_context(|| format!("unterminated env placeholder: missing '{}'", close))?;
        // Unset variables expand to "". A blank database URL then reads as
        // unconfigured instead of aborting startup.
        match std::env::var(&var) {
            Ok(val) => out.push_str(&val),
            Err(_) => tracing::warn!("Environment variable {} is not set; expanding to empty", var),
        }
    }

    Ok(out)
}

fn read_until<I>(it: &mut std::iter::Peekable<I>, end: char) -> Option<String>
where
    I: Iterator<Item = char>,
{
    let mut buf = String::new();
    for ch in it.by_ref() {
        if ch == end {
            return Some(buf);
        }
        buf.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_file_missing() {
        let cfg = Config::load("/nonexistent/temperature-ingest.yaml").unwrap();
        assert_eq!(cfg.database.table, "temperature_readings");
        assert_eq!(cfg.api.port, 8080);
        assert_eq!(cfg.display.utc_offset_minutes, 60);
        assert_eq!(cfg.operation_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_expand_placeholders() {
        std::env::set_var("TI_TEST_DB_HOST", "db.local");
        let out = expand_env_placeholders("postgres://u@$(TI_TEST_DB_HOST)/${TI_TEST_DB_HOST}?a=$$1")
            .unwrap();
        assert_eq!(out, "postgres://u@db.local/db.local?a=$1");
    }

    #[test]
    fn test_expand_missing_var_is_empty() {
        let out = expand_env_placeholders("url: ${TI_TEST_SURELY_UNSET_VAR}").unwrap();
        assert_eq!(out, "url: ");
    }

    #[test]
    fn test_shipped_config_loads_without_database_url() {
        std::env::remove_var("DATABASE_URL");
        let mut cfg = Config::from_yaml(include_str!("../config/config.yaml")).unwrap();
        cfg.apply_overrides(|_| None);

        assert!(cfg.database_url().is_none());
        assert_eq!(cfg.database.table, "temperature_readings");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_expand_unterminated_fails() {
        assert!(expand_env_placeholders("url: ${OOPS").is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg = Config::from_yaml("api:\n  port: 9000\n").unwrap();
        assert_eq!(cfg.api.port, 9000);
        assert_eq!(cfg.api.host, "0.0.0.0");
        assert!(cfg.database.url.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "postgres://localhost/readings"),
            ("READINGS_TABLE", "lecturas"),
            ("SERVER_PORT", "3000"),
        ]);
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.database_url(), Some("postgres://localhost/readings"));
        assert_eq!(cfg.database.table, "lecturas");
        assert_eq!(cfg.api_bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_blank_url_is_unconfigured() {
        let mut cfg = Config::default();
        cfg.apply_overrides(|k| (k == "DATABASE_URL").then(|| "  ".to_string()));
        assert!(cfg.database_url().is_none());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("temperature_readings"));
        assert!(is_valid_identifier("_t1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("readings; DROP TABLE x"));
        assert!(!is_valid_identifier(&"a".repeat(64)));
    }

    #[test]
    fn test_validate_rejects_bad_table() {
        let mut cfg = Config::default();
        cfg.database.table = "bad-name".into();
        assert!(cfg.validate().is_err());
    }
}
