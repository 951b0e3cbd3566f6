use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    /// Directory for persistent state (SQLite database).
    /// Defaults to current working directory.
    pub state_dir: PathBuf,
    /// Root of the filesystem blob store. Defaults to `$STATE_DIR/blobs`.
    pub blob_dir: PathBuf,
    /// HMAC key for signed document URLs.
    pub url_signing_secret: String,
    /// Origin used when building signed URLs, without a trailing slash.
    pub public_base_url: String,
    pub signed_url_ttl: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("state_dir", &self.state_dir)
            .field("blob_dir", &self.blob_dir)
            .field("url_signing_secret", &"<redacted>")
            .field("public_base_url", &self.public_base_url)
            .field("signed_url_ttl", &self.signed_url_ttl)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .context("PORT must be a valid number")?;

        let state_dir = lookup("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let blob_dir = lookup("BLOB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| state_dir.join("blobs"));

        let url_signing_secret = lookup("URL_SIGNING_SECRET")
            .context("URL_SIGNING_SECRET environment variable is required")?;
        if url_signing_secret.trim().is_empty() {
            bail!("URL_SIGNING_SECRET must not be empty");
        }

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let ttl_secs = lookup("SIGNED_URL_TTL_SECS")
            .unwrap_or_else(|| "3600".to_string())
            .parse::<u64>()
            .context("SIGNED_URL_TTL_SECS must be a valid number")?;
        if ttl_secs == 0 {
            bail!("SIGNED_URL_TTL_SECS must be positive");
        }

        Ok(Config {
            port,
            state_dir,
            blob_dir,
            url_signing_secret,
            public_base_url,
            signed_url_ttl: Duration::from_secs(ttl_secs),
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.state_dir.join("sk-portal.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("URL_SIGNING_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.state_dir, PathBuf::from("."));
        assert_eq!(config.blob_dir, PathBuf::from("./blobs"));
        assert_eq!(config.public_base_url, "http://localhost:3000");
        assert_eq!(config.signed_url_ttl, Duration::from_secs(3600));
        assert_eq!(config.database_path(), PathBuf::from("./sk-portal.db"));
    }

    #[test]
    fn test_secret_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("URL_SIGNING_SECRET", "   ")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("URL_SIGNING_SECRET", "s3cret"),
            ("PORT", "8080"),
            ("STATE_DIR", "/var/lib/sk"),
            ("PUBLIC_BASE_URL", "https://sk.example.org/"),
            ("SIGNED_URL_TTL_SECS", "60"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.blob_dir, PathBuf::from("/var/lib/sk/blobs"));
        assert_eq!(config.public_base_url, "https://sk.example.org");
        assert_eq!(config.signed_url_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(config_from(&[("URL_SIGNING_SECRET", "s"), ("PORT", "http")]).is_err());
        assert!(config_from(&[("URL_SIGNING_SECRET", "s"), ("SIGNED_URL_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = config_from(&[("URL_SIGNING_SECRET", "s3cret")]).unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
