use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::{Labels, Locale};

/// Default OpenAI-compatible endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "deepseek-chat";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Turn free-form expense notes into a categorised ledger and chart it
#[derive(Parser, Debug, Clone)]
#[command(
    name = "ledger-viz",
    about = "Turn free-form expense notes into a categorised ledger and chart it",
    version
)]
pub struct Settings {
    /// What to run: classify notes with the model, report on an existing
    /// ledger file, or check the API connection
    #[arg(long, default_value = "classify", value_parser = ["classify", "report", "check"])]
    pub mode: String,

    /// API key for the completion endpoint
    #[arg(long, env = "LEDGER_VIZ_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Chat model
    #[arg(
        long,
        default_value = DEFAULT_MODEL,
        value_parser = ["deepseek-chat", "deepseek-ai/DeepSeek-R1", "deepseek-ai/DeepSeek-V3"]
    )]
    pub model: String,

    /// File listing the category standard
    #[arg(long, default_value = "分类标准.md")]
    pub categories_file: PathBuf,

    /// File with the free-form expense notes
    #[arg(long, default_value = "记账内容.md")]
    pub content_file: PathBuf,

    /// Prompt template (a built-in template is used when missing)
    #[arg(long, default_value = "prompt.md")]
    pub prompt_file: PathBuf,

    /// Ledger file written by classify and read by report
    #[arg(long, default_value = "config.txt")]
    pub ledger_file: PathBuf,

    /// Directory receiving the chart data
    #[arg(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Display language for labels and dates
    #[arg(long, default_value = "zh", value_parser = ["zh", "en"])]
    pub locale: String,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "auto"])]
    pub theme: String,

    /// Print the log and summary to stdout instead of the terminal UI
    #[arg(long)]
    pub plain: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

impl Settings {
    /// Display labels for the configured locale.
    pub fn labels(&self) -> Labels {
        Labels::for_locale(Locale::from_code(&self.locale))
    }

    /// Fail early when the selected mode needs an API key and none is set.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.mode != "report" && self.api_key.trim().is_empty() {
            return Err(crate::error::VizError::Config(
                "an API key is required (--api-key or LEDGER_VIZ_API_KEY)".to_string(),
            ));
        }
        Ok(())
    }
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.ledger-viz/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.ledger-viz/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".ledger-viz").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path.
    ///
    /// The file holds the API key, so on Unix it is readable by the owner
    /// only (mode 0600).
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes())?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the default config file if it exists.
    pub fn clear() -> Result<(), std::io::Error> {
        Self::clear_at(&Self::config_path())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!("failed to clear {}: {}", config_path.display(), e);
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI (and, for the key, the environment) always wins over persisted
        // values.  'mode' is never loaded from last-used.
        if !is_arg_explicit(&matches, "api_key") {
            if let Some(v) = last.api_key {
                settings.api_key = v;
            }
        }
        if !is_arg_explicit(&matches, "base_url") {
            if let Some(v) = last.base_url {
                settings.base_url = v;
            }
        }
        if !is_arg_explicit(&matches, "model") {
            if let Some(v) = last.model {
                settings.model = v;
            }
        }
        if !is_arg_explicit(&matches, "categories_file") {
            if let Some(v) = last.categories_file {
                settings.categories_file = v;
            }
        }
        if !is_arg_explicit(&matches, "content_file") {
            if let Some(v) = last.content_file {
                settings.content_file = v;
            }
        }
        if !is_arg_explicit(&matches, "output_dir") {
            if let Some(v) = last.output_dir {
                settings.output_dir = v;
            }
        }
        if !is_arg_explicit(&matches, "locale") {
            if let Some(v) = last.locale {
                settings.locale = v;
            }
        }
        if !is_arg_explicit(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!("failed to persist settings: {}", e);
        }

        settings
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            api_key: Some(s.api_key.clone()).filter(|k| !k.is_empty()),
            base_url: Some(s.base_url.clone()),
            model: Some(s.model.clone()),
            categories_file: Some(s.categories_file.clone()),
            content_file: Some(s.content_file.clone()),
            output_dir: Some(s.output_dir.clone()),
            locale: Some(s.locale.clone()),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Returns `true` when `name` was supplied on the command line or, for
/// arguments that have one, through the environment.
fn is_arg_explicit(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}

/// Write `bytes` to `path`, restricting it to the owner on Unix.
fn write_private(path: &std::path::Path, bytes: &[u8]) -> Result<(), std::io::Error> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // `mode` only applies on creation; a leftover temp file keeps its bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(bytes)?;
    file.sync_all()
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    fn args(list: &[&str]) -> Vec<std::ffi::OsString> {
        list.iter().map(|s| (*s).into()).collect()
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            api_key: Some("sk-test".to_string()),
            base_url: Some("http://localhost:8080/v1".to_string()),
            model: Some("deepseek-ai/DeepSeek-V3".to_string()),
            categories_file: Some(PathBuf::from("cats.md")),
            content_file: Some(PathBuf::from("notes.md")),
            output_dir: Some(PathBuf::from("charts")),
            locale: Some("en".to_string()),
            theme: Some("dark".to_string()),
        };

        params.save_to(&path).expect("save");
        let loaded = LastUsedParams::load_from(&path);

        assert_eq!(loaded.api_key, Some("sk-test".to_string()));
        assert_eq!(loaded.base_url, Some("http://localhost:8080/v1".to_string()));
        assert_eq!(loaded.model, Some("deepseek-ai/DeepSeek-V3".to_string()));
        assert_eq!(loaded.categories_file, Some(PathBuf::from("cats.md")));
        assert_eq!(loaded.content_file, Some(PathBuf::from("notes.md")));
        assert_eq!(loaded.output_dir, Some(PathBuf::from("charts")));
        assert_eq!(loaded.locale, Some("en".to_string()));
        assert_eq!(loaded.theme, Some("dark".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_last_used_params_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        // A stale world-readable temp file from an interrupted save.
        let stale = path.with_extension("json.tmp");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "{}").unwrap();
        std::fs::set_permissions(&stale, std::fs::Permissions::from_mode(0o644)).unwrap();

        let params = LastUsedParams {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        params.save_to(&path).expect("save");

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!stale.exists());
        assert_eq!(
            LastUsedParams::load_from(&path).api_key,
            Some("sk-secret".to_string())
        );
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            theme: Some("light".to_string()),
            ..Default::default()
        };
        params.save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_last_used_params_default_when_missing_or_corrupt() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        assert!(LastUsedParams::load_from(&path).api_key.is_none());

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert!(LastUsedParams::load_from(&path).model.is_none());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["ledger-viz"]);

        assert_eq!(settings.mode, "classify");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.model, DEFAULT_MODEL);
        assert_eq!(settings.categories_file, PathBuf::from("分类标准.md"));
        assert_eq!(settings.content_file, PathBuf::from("记账内容.md"));
        assert_eq!(settings.prompt_file, PathBuf::from("prompt.md"));
        assert_eq!(settings.ledger_file, PathBuf::from("config.txt"));
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.locale, "zh");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.plain);
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_rejects_unknown_model() {
        let result = Settings::try_parse_from(["ledger-viz", "--model", "gpt-99"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_key_outside_report_mode() {
        let mut settings = Settings::parse_from(["ledger-viz", "--api-key", ""]);
        assert!(settings.validate().is_err());

        settings.mode = "report".to_string();
        assert!(settings.validate().is_ok());

        settings.mode = "classify".to_string();
        settings.api_key = "sk-1234".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_labels_follow_locale() {
        let settings = Settings::parse_from(["ledger-viz", "--locale", "en"]);
        assert_eq!(settings.labels().other, "other");
    }

    #[test]
    fn test_from_settings_skips_empty_key() {
        let settings = Settings::parse_from(["ledger-viz", "--api-key", ""]);
        let last = LastUsedParams::from(&settings);
        assert!(last.api_key.is_none());
        assert_eq!(last.model, Some(DEFAULT_MODEL.to_string()));
    }

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            base_url: Some("http://localhost:9000/v1".to_string()),
            output_dir: Some(PathBuf::from("charts")),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings = Settings::load_with_last_used_impl(args(&["ledger-viz"]), &config_path);
        assert_eq!(settings.base_url, "http://localhost:9000/v1");
        assert_eq!(settings.output_dir, PathBuf::from("charts"));
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let params = LastUsedParams {
            model: Some("deepseek-ai/DeepSeek-R1".to_string()),
            ..Default::default()
        };
        params.save_to(&config_path).expect("save");

        let settings = Settings::load_with_last_used_impl(
            args(&["ledger-viz", "--model", "deepseek-chat"]),
            &config_path,
        );
        assert_eq!(settings.model, "deepseek-chat");
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        LastUsedParams {
            theme: Some("dark".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        Settings::load_with_last_used_impl(args(&["ledger-viz", "--clear"]), &config_path);
        assert!(!config_path.exists());
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings =
            Settings::load_with_last_used_impl(args(&["ledger-viz", "--debug"]), &config_path);
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            args(&["ledger-viz", "--output-dir", "charts", "--locale", "en"]),
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.output_dir, Some(PathBuf::from("charts")));
        assert_eq!(loaded.locale, Some("en".to_string()));
    }
}
