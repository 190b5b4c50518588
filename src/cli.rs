use clap::Parser;
use std::path::PathBuf;

use crate::config::Settings;
use crate::domain::CompressionLevel;
use crate::overrides::OverrideRule;

fn parse_level(s: &str) -> Result<CompressionLevel, String> {
    s.parse()
}

/// Compress a codebase into an LLM-ready document under a token budget
#[derive(Parser, Debug, Clone)]
#[command(name = "fitcode", version, about, long_about = None)]
pub struct Cli {
    /// Path to scan (directory or file)
    pub path: PathBuf,

    /// Path to the configuration file
    #[arg(long, env = "FITCODE_CONFIG", default_value = "fitcode.toml")]
    pub config: PathBuf,

    /// Output directory for results
    #[arg(short = 'o', long)]
    pub output_dir: Option<PathBuf>,

    /// Comma-separated glob patterns to include.
    /// "*.py::TODO" matches Python files whose content contains TODO
    #[arg(short = 'i', long, default_value = "**/*")]
    pub include: String,

    /// Comma-separated glob patterns to exclude
    #[arg(short = 'e', long, default_value = "")]
    pub exclude: String,

    /// Maximum token budget (triggers the planning pass). Non-digit
    /// characters are ignored, so "100_000" works
    #[arg(short = 'b', long)]
    pub budget: Option<String>,

    /// Budget percentage held back as safety margin while planning
    #[arg(long, env = "FITCODE_BUFFER_PERCENT")]
    pub buffer_percent: Option<u8>,

    /// LLM model for compression planning
    #[arg(long, env = "FITCODE_PLANNER_MODEL")]
    pub planner_model: Option<String>,

    /// LLM model for rendering file content
    #[arg(long, env = "FITCODE_RENDER_MODEL")]
    pub render_model: Option<String>,

    /// Tiktoken model or encoding for token counting
    #[arg(short = 'm', long, env = "FITCODE_ENCODING")]
    pub encoding: Option<String>,

    /// Default compression level when no budget and no rule applies
    /// (none/0, trim/5, light/15, medium/50, heavy/90, max/100)
    #[arg(long, value_parser = parse_level)]
    pub default_compression: Option<CompressionLevel>,

    /// Comma-separated globs for files to preserve unchanged
    #[arg(long = "compression-0", value_name = "GLOBS", default_value = "")]
    pub compression_0: String,

    /// Comma-separated globs for trim compression (remove imports/whitespace)
    #[arg(long = "compression-5", value_name = "GLOBS", default_value = "")]
    pub compression_5: String,

    /// Comma-separated globs for light compression (remove redundant comments)
    #[arg(long = "compression-15", value_name = "GLOBS", default_value = "")]
    pub compression_15: String,

    /// Comma-separated globs for medium compression (simplify functions)
    #[arg(long = "compression-50", value_name = "GLOBS", default_value = "")]
    pub compression_50: String,

    /// Comma-separated globs for heavy compression (skeleton only)
    #[arg(long = "compression-90", value_name = "GLOBS", default_value = "")]
    pub compression_90: String,

    /// Comma-separated globs for maximum compression (1-3 sentence summary)
    #[arg(long = "compression-100", value_name = "GLOBS", default_value = "")]
    pub compression_100: String,

    /// Parallel render width
    #[arg(long, env = "FITCODE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Maximum plan/render rounds
    #[arg(long)]
    pub max_rounds: Option<usize>,

    /// Overall deadline in seconds for the whole run
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Use glob patterns exactly as written, without recursive rewriting
    #[arg(long)]
    pub strict_glob: bool,

    /// Do not respect .gitignore patterns
    #[arg(long)]
    pub no_ignore: bool,

    /// Do not copy output to the clipboard
    #[arg(long)]
    pub no_clipboard: bool,

    /// Only count tokens without compressing
    #[arg(long)]
    pub count_only: bool,
}

impl Cli {
    /// Comma-separated include patterns as a list
    pub fn include_patterns(&self) -> Vec<String> {
        split_patterns(&self.include)
    }

    /// Comma-separated exclude patterns as a list
    pub fn exclude_patterns(&self) -> Vec<String> {
        split_patterns(&self.exclude)
    }

    /// Parse the budget, ignoring every non-digit character
    pub fn budget_tokens(&self) -> Result<Option<usize>, String> {
        let Some(raw) = &self.budget else {
            return Ok(None);
        };
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return Err(format!("budget '{raw}' contains no digits"));
        }
        digits
            .parse::<usize>()
            .map(Some)
            .map_err(|e| format!("budget '{raw}': {e}"))
    }

    /// Override rules from the per-level glob flags.
    ///
    /// Stronger compression flags rank first, so a file matching both
    /// `--compression-100` and `--compression-5` gets maximum compression.
    pub fn override_rules(&self) -> Vec<OverrideRule> {
        let groups: [(&str, CompressionLevel); 6] = [
            (&self.compression_100, CompressionLevel::Max),
            (&self.compression_90, CompressionLevel::Heavy),
            (&self.compression_50, CompressionLevel::Medium),
            (&self.compression_15, CompressionLevel::Light),
            (&self.compression_5, CompressionLevel::Trim),
            (&self.compression_0, CompressionLevel::None),
        ];

        let mut rules = Vec::new();
        for (globs, level) in groups {
            for pattern in split_patterns(globs) {
                rules.push(OverrideRule::new(pattern, level));
            }
        }
        rules
    }

    /// Fold CLI flags into loaded settings; flags win
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(model) = &self.planner_model {
            settings.planner.model = model.clone();
        }
        if let Some(model) = &self.render_model {
            settings.render.model = model.clone();
        }
        if let Some(encoding) = &self.encoding {
            settings.tokenizer.encoding = encoding.clone();
        }
        if let Some(level) = self.default_compression {
            settings.planner.default_level = level;
        }
        if let Some(buffer) = self.buffer_percent {
            settings.planner.buffer_percent = buffer;
        }
        if let Some(concurrency) = self.concurrency {
            settings.render.concurrency = concurrency;
        }
        if let Some(rounds) = self.max_rounds {
            settings.planner.max_rounds = rounds;
        }
        if let Some(dir) = &self.output_dir {
            settings.output.dir = dir.clone();
        }
        if self.no_clipboard {
            settings.output.clipboard = false;
        }
    }
}

fn split_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| p.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["fitcode", "."]);
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.config, PathBuf::from("fitcode.toml"));
        assert_eq!(cli.include, "**/*");
        assert!(cli.budget.is_none());
        assert!(!cli.count_only);
        assert!(cli.override_rules().is_empty());
    }

    #[test]
    fn test_cli_with_args() {
        let cli = Cli::parse_from([
            "fitcode",
            "src",
            "--budget",
            "100_000",
            "--include",
            "*.rs, *.toml",
            "--compression-0",
            "src/main.rs",
            "--compression-100",
            "*.md",
            "--default-compression",
            "light",
            "--max-rounds",
            "5",
            "--no-clipboard",
        ]);

        assert_eq!(cli.budget_tokens().unwrap(), Some(100_000));
        assert_eq!(cli.include_patterns(), vec!["*.rs", "*.toml"]);
        assert_eq!(cli.default_compression, Some(CompressionLevel::Light));
        assert_eq!(cli.max_rounds, Some(5));
        assert!(cli.no_clipboard);

        let rules = cli.override_rules();
        assert_eq!(rules.len(), 2);
        // Stronger compression ranks first
        assert_eq!(rules[0].pattern, "*.md");
        assert_eq!(rules[0].level, CompressionLevel::Max);
        assert_eq!(rules[1].pattern, "src/main.rs");
        assert_eq!(rules[1].level, CompressionLevel::None);
    }

    #[test]
    fn test_budget_parse_rejects_digitless() {
        let cli = Cli::parse_from(["fitcode", ".", "--budget", "lots"]);
        assert!(cli.budget_tokens().is_err());
    }

    #[test]
    fn test_apply_to_settings() {
        let cli = Cli::parse_from([
            "fitcode",
            ".",
            "--planner-model",
            "o3",
            "--concurrency",
            "2",
            "--no-clipboard",
        ]);
        let mut settings = Settings::default();
        cli.apply_to(&mut settings);
        assert_eq!(settings.planner.model, "o3");
        assert_eq!(settings.render.concurrency, 2);
        assert!(!settings.output.clipboard);
        // Untouched values keep defaults
        assert_eq!(settings.planner.max_rounds, 3);
    }
}
