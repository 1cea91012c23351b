use crate::application::error::PipelineError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Every recognized option. Loaded from an optional TOML file, then from
/// `QUOTA_*` environment variables (`__` separates nested keys, e.g.
/// `QUOTA_STORE__GIST_ID`).
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Signed hour offset (`+9`, `-5`) or zone name. UTC when absent.
    pub timezone: Option<String>,
    /// Bucket hours on the process-local clock instead of `timezone`.
    #[serde(default)]
    pub bucket_in_local_time: bool,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub diagnostics: DiagnosticsSettings,
    #[serde(default)]
    pub chart: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub gist_id: Option<String>,
    pub token: Option<String>,
    pub file_name: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            gist_id: None,
            token: None,
            file_name: "data.json".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PortalSettings {
    pub username: Option<String>,
    pub password: Option<String>,
    pub login_url: Option<String>,
    /// Page holding the quota value, when it is not the landing page.
    pub quota_url: Option<String>,
    pub selectors: SelectorSettings,
}

/// CSS selectors for the portal pages.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SelectorSettings {
    pub username: String,
    pub password: String,
    pub submit: String,
    /// Present only once the login went through.
    pub logged_in: String,
    pub quota: String,
}

impl Default for SelectorSettings {
    fn default() -> Self {
        Self {
            username: "input[name=\"username\"]".to_string(),
            password: "input[name=\"password\"]".to_string(),
            submit: "button[type=\"submit\"]".to_string(),
            logged_in: ".remaining-data".to_string(),
            quota: ".remaining-data".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    pub element_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: true,
            element_timeout_ms: 5_000,
            navigation_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DiagnosticsSettings {
    pub report_path: PathBuf,
    pub page_path: PathBuf,
}

impl Default for DiagnosticsSettings {
    fn default() -> Self {
        Self {
            report_path: PathBuf::from("error-report.json"),
            page_path: PathBuf::from("error-page.html"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub output_path: PathBuf,
    pub title: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("docs/index.html"),
            title: "Remaining data quota".to_string(),
        }
    }
}

pub fn load_settings(config_file: &Path) -> anyhow::Result<Settings> {
    load_settings_with_env(config_file, None)
}

/// Environment values stay strings until deserialization, so `+9` and
/// `007` arrive untouched. `env` replaces the process environment.
fn load_settings_with_env(config_file: &Path, env: Option<config::Map<String, String>>) -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::from(config_file).required(false))
        .add_source(
            config::Environment::with_prefix("QUOTA")
                .prefix_separator("_")
                .separator("__")
                .source(env),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Unwrap a required option, naming its environment variable when missing.
pub fn require<'a>(value: &'a Option<String>, env_name: &str) -> Result<&'a str, PipelineError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PipelineError::Config(format!("{} is not set", env_name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.store.file_name, "data.json");
        assert_eq!(settings.browser.element_timeout_ms, 5_000);
        assert_eq!(settings.browser.navigation_timeout_ms, 10_000);
        assert_eq!(settings.chart.output_path, PathBuf::from("docs/index.html"));
        assert!(settings.timezone.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("quota-tracker-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r##"
timezone = "+9"

[store]
gist_id = "abc123"
file_name = "quota.json"

[portal.selectors]
quota = "#remaining"
"##
        )
        .unwrap();

        let settings = load_settings(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.timezone.as_deref(), Some("+9"));
        assert_eq!(settings.store.gist_id.as_deref(), Some("abc123"));
        assert_eq!(settings.store.file_name, "quota.json");
        assert_eq!(settings.store.timeout_secs, 30);
        assert_eq!(settings.portal.selectors.quota, "#remaining");
        assert_eq!(settings.portal.selectors.submit, "button[type=\"submit\"]");
    }

    #[test]
    fn test_environment_values_keep_their_text() {
        let mut env = config::Map::new();
        env.insert("QUOTA_TIMEZONE".to_string(), "+9".to_string());
        env.insert("QUOTA_PORTAL__PASSWORD".to_string(), "007".to_string());
        env.insert("QUOTA_STORE__GIST_ID".to_string(), "1e5".to_string());
        env.insert("QUOTA_BROWSER__HEADLESS".to_string(), "false".to_string());
        env.insert("QUOTA_STORE__TIMEOUT_SECS".to_string(), "10".to_string());
        env.insert("QUOTA_BUCKET_IN_LOCAL_TIME".to_string(), "true".to_string());

        let missing = std::env::temp_dir().join(format!("quota-tracker-missing-{}", std::process::id()));
        let settings = load_settings_with_env(&missing, Some(env)).unwrap();

        assert_eq!(settings.timezone.as_deref(), Some("+9"));
        assert_eq!(settings.portal.password.as_deref(), Some("007"));
        assert_eq!(settings.store.gist_id.as_deref(), Some("1e5"));
        assert!(!settings.browser.headless);
        assert_eq!(settings.store.timeout_secs, 10);
        assert!(settings.bucket_in_local_time);
        assert_eq!(
            crate::domain::timezone::resolve_timezone(settings.timezone.as_deref()).timezone,
            "Etc/GMT-9"
        );
    }

    #[test]
    fn test_require() {
        assert_eq!(require(&Some("token".to_string()), "X").unwrap(), "token");
        assert!(matches!(require(&Some("  ".to_string()), "X"), Err(PipelineError::Config(_))));
        let error = require(&None, "QUOTA_STORE__TOKEN").unwrap_err();
        assert!(error.to_string().contains("QUOTA_STORE__TOKEN"));
    }
}
