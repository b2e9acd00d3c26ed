//! Connection settings and file locations.
//!
//! Each setting comes from the command line or its environment variable
//! first, then from the manifest's `[provider]` table, then from defaults.

use crate::cli::ConnectionArgs;
use crate::schema::{DEFAULT_MANIFEST, ProviderConfig};
use anyhow::{Context, Result};
use gravitee::{Client, Credentials, DEFAULT_ENVIRONMENT, DEFAULT_TIMEOUT, HttpBackend};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved connection settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub management_url: String,
    pub environment: String,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl Settings {
    /// Resolve settings from flags/environment and the manifest
    pub fn resolve(args: &ConnectionArgs, provider: &ProviderConfig) -> Result<Self> {
        let management_url = non_empty(args.management_url.as_deref())
            .or_else(|| non_empty(provider.management_url.as_deref()))
            .context(
                "Management URL is not set (use --management-url, GRAVITEE_MANAGEMENT_URL \
                 or [provider].management_url)",
            )?;

        let environment = non_empty(args.environment.as_deref())
            .or_else(|| non_empty(provider.environment.as_deref()))
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());

        let timeout = match args.timeout.or(provider.timeout) {
            Some(0) => anyhow::bail!("Timeout must be at least one second"),
            Some(seconds) => Duration::from_secs(seconds),
            None => DEFAULT_TIMEOUT,
        };

        let credentials = resolve_credentials(args)?;

        Ok(Self {
            management_url,
            environment,
            credentials,
            timeout,
        })
    }

    /// Client scoped to the resolved environment
    pub fn client(&self) -> Client {
        log::debug!(
            "Connecting to {} (environment {}, timeout {}s)",
            self.management_url,
            self.environment,
            self.timeout.as_secs()
        );
        let backend =
            HttpBackend::with_timeout(self.management_url.as_str(), &self.credentials, self.timeout);
        Client::with_backend(Box::new(backend)).environment(self.environment.clone())
    }
}

fn resolve_credentials(args: &ConnectionArgs) -> Result<Credentials> {
    if let Some(token) = non_empty(args.token.as_deref()) {
        return Ok(Credentials::Bearer(token));
    }

    match (
        non_empty(args.username.as_deref()),
        non_empty(args.password.as_deref()),
    ) {
        (Some(username), Some(password)) => Ok(Credentials::Basic { username, password }),
        (Some(_), None) => anyhow::bail!("Password is not set (use --password or GRAVITEE_PASSWORD)"),
        (None, Some(_)) => anyhow::bail!("Username is not set (use --username or GRAVITEE_USERNAME)"),
        (None, None) => anyhow::bail!(
            "Credentials are not set (use GRAVITEE_USERNAME and GRAVITEE_PASSWORD, or GRAVITEE_TOKEN)"
        ),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Expand `~` and environment variables in a user-supplied path
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(path).with_context(|| format!("Could not expand path: {}", path))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Manifest location: the given path, or `gravitee.toml` in the working directory
pub fn manifest_path(path: Option<&str>) -> Result<PathBuf> {
    match path {
        Some(p) => expand_path(p),
        None => Ok(PathBuf::from(DEFAULT_MANIFEST)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ConnectionArgs {
        ConnectionArgs {
            management_url: None,
            environment: None,
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
            token: None,
            timeout: None,
        }
    }

    fn provider(url: Option<&str>, environment: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            management_url: url.map(ToString::to_string),
            environment: environment.map(ToString::to_string),
            timeout: None,
        }
    }

    #[test]
    fn test_flags_win_over_manifest() {
        let args = ConnectionArgs {
            management_url: Some("https://flag.example.com".to_string()),
            environment: Some("PROD".to_string()),
            ..args()
        };
        let settings = Settings::resolve(
            &args,
            &provider(Some("https://manifest.example.com"), Some("DEV")),
        )
        .unwrap();

        assert_eq!(settings.management_url, "https://flag.example.com");
        assert_eq!(settings.environment, "PROD");
    }

    #[test]
    fn test_manifest_and_defaults() {
        let settings =
            Settings::resolve(&args(), &provider(Some("https://manifest.example.com"), None))
                .unwrap();

        assert_eq!(settings.management_url, "https://manifest.example.com");
        assert_eq!(settings.environment, DEFAULT_ENVIRONMENT);
        assert!(matches!(settings.credentials, Credentials::Basic { .. }));
    }

    #[test]
    fn test_timeout_resolution() {
        let manifest = ProviderConfig {
            timeout: Some(60),
            ..provider(Some("https://manifest.example.com"), None)
        };

        let settings = Settings::resolve(&args(), &manifest).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(60));

        let flagged = ConnectionArgs {
            timeout: Some(10),
            ..args()
        };
        let settings = Settings::resolve(&flagged, &manifest).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(10));

        let settings =
            Settings::resolve(&args(), &provider(Some("https://manifest.example.com"), None))
                .unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let args = ConnectionArgs {
            timeout: Some(0),
            ..args()
        };
        let err = Settings::resolve(&args, &provider(Some("https://manifest.example.com"), None))
            .unwrap_err();
        assert!(err.to_string().contains("Timeout"));
    }

    #[test]
    fn test_missing_url() {
        let err = Settings::resolve(&args(), &ProviderConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Management URL"));
    }

    #[test]
    fn test_blank_flag_falls_through() {
        let args = ConnectionArgs {
            management_url: Some("  ".to_string()),
            ..args()
        };
        let settings =
            Settings::resolve(&args, &provider(Some("https://manifest.example.com"), None))
                .unwrap();
        assert_eq!(settings.management_url, "https://manifest.example.com");
    }

    #[test]
    fn test_token_wins_over_basic() {
        let args = ConnectionArgs {
            token: Some("tok".to_string()),
            ..args()
        };
        let credentials = resolve_credentials(&args).unwrap();
        assert!(matches!(credentials, Credentials::Bearer(t) if t == "tok"));
    }

    #[test]
    fn test_missing_credentials() {
        let none = ConnectionArgs {
            username: None,
            password: None,
            ..args()
        };
        assert!(resolve_credentials(&none).is_err());

        let no_password = ConnectionArgs {
            password: None,
            ..args()
        };
        let err = resolve_credentials(&no_password).unwrap_err();
        assert!(err.to_string().contains("Password"));
    }

    #[test]
    fn test_manifest_path_default() {
        assert_eq!(
            manifest_path(None).unwrap(),
            PathBuf::from("gravitee.toml")
        );
        assert_eq!(
            manifest_path(Some("/tmp/m.toml")).unwrap(),
            PathBuf::from("/tmp/m.toml")
        );
    }
}
