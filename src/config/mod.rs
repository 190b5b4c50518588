//! Configuration
//!
//! Settings load from an optional `fitcode.toml`, then `FITCODE_*`
//! environment overrides, then CLI flags (strongest). Every field has a
//! default, so running with no config file at all works.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::CompressionLevel;
use crate::error::{FitError, FitResult};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub planner: PlannerSection,
    pub render: RenderSection,
    pub api: ApiSection,
    pub tokenizer: TokenizerSection,
    pub output: OutputSection,
}

/// Planning knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlannerSection {
    /// Model used for advisory planning
    pub model: String,
    /// Advisory round-trip timeout in seconds
    pub timeout_secs: u64,
    /// Maximum plan/render rounds per run
    pub max_rounds: usize,
    /// Level applied to free files when no budget is given
    pub default_level: CompressionLevel,
    /// Budget percentage held back as safety margin while planning
    pub buffer_percent: u8,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            model: "o3-mini".to_string(),
            timeout_secs: 120,
            max_rounds: 3,
            default_level: CompressionLevel::Trim,
            buffer_percent: 10,
        }
    }
}

/// Rendering knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderSection {
    /// Model used to rewrite file content
    pub model: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Total retry window for transient failures, in seconds
    pub retry_window_secs: u64,
    /// Parallel render width
    pub concurrency: usize,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-nano".to_string(),
            timeout_secs: 300,
            retry_window_secs: 120,
            concurrency: 8,
        }
    }
}

/// Upstream API endpoint shared by the advisor and the renderer
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiSection {
    /// OpenAI-compatible base URL
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

/// Token counting knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenizerSection {
    /// Model or encoding name for counting
    pub encoding: String,
}

impl Default for TokenizerSection {
    fn default() -> Self {
        Self {
            encoding: "cl100k_base".to_string(),
        }
    }
}

/// Output knobs
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSection {
    /// Directory the result files land in
    pub dir: PathBuf,
    /// Copy the document to the clipboard
    pub clipboard: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./"),
            clipboard: true,
        }
    }
}

impl Settings {
    /// Load settings from `path` (missing file is fine) with `FITCODE_*`
    /// environment overrides, e.g. `FITCODE_RENDER__CONCURRENCY=16`.
    pub fn load(path: &Path) -> FitResult<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(
                Environment::with_prefix("FITCODE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| FitError::Configuration(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::load(Path::new("does-not-exist.toml")).unwrap();
        assert_eq!(settings.planner.max_rounds, 3);
        assert_eq!(settings.planner.default_level, CompressionLevel::Trim);
        assert_eq!(settings.render.concurrency, 8);
        assert!(settings.output.clipboard);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fitcode.toml");
        std::fs::write(
            &path,
            r#"
[planner]
model = "o3"
max_rounds = 5
default_level = "light"

[render]
concurrency = 2

[output]
clipboard = false
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.planner.model, "o3");
        assert_eq!(settings.planner.max_rounds, 5);
        assert_eq!(settings.planner.default_level, CompressionLevel::Light);
        assert_eq!(settings.render.concurrency, 2);
        assert!(!settings.output.clipboard);
        // Untouched sections keep their defaults
        assert_eq!(settings.api.api_key_env, "OPENAI_API_KEY");
    }

    #[test]
    fn test_malformed_file_is_a_configuration_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("fitcode.toml");
        std::fs::write(&path, "[planner\nmodel = ").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(FitError::Configuration(_))
        ));
    }
}
