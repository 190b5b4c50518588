//! File discovery
//!
//! Walks a scan root respecting gitignore, applies include/exclude glob
//! patterns, and filters out binary, empty, and unreadable files. Patterns
//! may carry a `::text` suffix restricting matches to files whose content
//! matches the text (as a case-insensitive regex, or literally when the
//! regex does not compile).

use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;
use regex::RegexBuilder;
use tracing::debug;

use crate::error::{FitError, FitResult};

/// Extensions never worth tokenizing
const BINARY_EXTENSIONS: &[&str] = &[
    "pyc", "pyo", "so", "dll", "dylib", "exe", "bin", "o", "a", "rlib", "jpg", "jpeg", "png",
    "gif", "bmp", "ico", "svg", "mp3", "mp4", "avi", "mov", "wmv", "flv", "zip", "tar", "gz",
    "bz2", "7z", "rar", "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "sqlite", "db",
    "pkl", "npy", "npz", "woff", "woff2", "ttf", "eot", "otf", "lock",
];

/// A discovered file with its content already read
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the scan root
    pub path: PathBuf,
    /// File content
    pub content: String,
}

/// Discovery knobs
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Include patterns; empty means everything
    pub include: Vec<String>,
    /// Exclude patterns
    pub exclude: Vec<String>,
    /// Honor .gitignore files along the walk
    pub respect_gitignore: bool,
    /// Use patterns exactly as written instead of making them recursive
    pub strict_glob: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            respect_gitignore: true,
            strict_glob: false,
        }
    }
}

/// One parsed pattern: a glob plus an optional content filter
struct ContentPattern {
    glob: Pattern,
    basename_ok: bool,
    content: Option<regex::Regex>,
}

/// Finds and reads the files a run should consider
pub struct FileDiscovery {
    include: Vec<ContentPattern>,
    exclude: Vec<ContentPattern>,
    respect_gitignore: bool,
}

impl FileDiscovery {
    /// Compile options into a discovery. Unusable patterns are reported in
    /// the returned warnings and skipped rather than failing the run.
    pub fn new(options: &DiscoveryOptions) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let include = compile_patterns(&options.include, options.strict_glob, &mut warnings);
        let exclude = compile_patterns(&options.exclude, options.strict_glob, &mut warnings);
        (
            Self {
                include,
                exclude,
                respect_gitignore: options.respect_gitignore,
            },
            warnings,
        )
    }

    /// Walk `root` and return matching files (sorted by path) plus
    /// non-fatal warnings.
    pub fn discover(&self, root: &Path) -> FitResult<(Vec<DiscoveredFile>, Vec<String>)> {
        if !root.exists() {
            return Err(FitError::Configuration(format!(
                "path does not exist: {}",
                root.display()
            )));
        }

        let mut warnings = Vec::new();
        let mut files = Vec::new();

        if root.is_file() {
            let rel = PathBuf::from(root.file_name().unwrap_or(root.as_os_str()));
            if let Some(file) = self.admit(root, &rel, &mut warnings) {
                files.push(file);
            }
            return Ok((files, warnings));
        }

        let walker = WalkBuilder::new(root)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warnings.push(format!("walk error: {e}"));
                    continue;
                }
            };
            if !entry.file_type().map_or(false, |t| t.is_file()) {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            if let Some(file) = self.admit(entry.path(), &rel, &mut warnings) {
                files.push(file);
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok((files, warnings))
    }

    /// Apply pattern, binary, and readability filters to one file
    fn admit(&self, full: &Path, rel: &Path, warnings: &mut Vec<String>) -> Option<DiscoveredFile> {
        if is_binary_path(rel) {
            return None;
        }

        let needs_content = self.include.iter().any(|p| p.content.is_some())
            || self.exclude.iter().any(|p| p.content.is_some());

        // Cheap glob-only decision first; content filters read the file
        let glob_included =
            self.include.is_empty() || self.include.iter().any(|p| matches_glob(p, rel));
        if !glob_included && !needs_content {
            return None;
        }

        let content = match fs::read(full) {
            Ok(bytes) => {
                if bytes.is_empty() || bytes[..bytes.len().min(8192)].contains(&0) {
                    return None;
                }
                match String::from_utf8(bytes) {
                    Ok(text) => text,
                    Err(_) => {
                        debug!(path = %rel.display(), "skipping non-utf8 file");
                        return None;
                    }
                }
            }
            Err(e) => {
                warnings.push(format!("cannot read {}: {e}", rel.display()));
                return None;
            }
        };

        let included = self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| matches_glob(p, rel) && matches_content(p, &content));
        if !included {
            return None;
        }

        let excluded = self
            .exclude
            .iter()
            .any(|p| matches_glob(p, rel) && matches_content(p, &content));
        if excluded {
            return None;
        }

        Some(DiscoveredFile {
            path: rel.to_path_buf(),
            content,
        })
    }
}

fn matches_glob(pattern: &ContentPattern, rel: &Path) -> bool {
    if pattern.glob.matches_path(rel) {
        return true;
    }
    if pattern.basename_ok {
        if let Some(name) = rel.file_name().and_then(|n| n.to_str()) {
            return pattern.glob.matches(name);
        }
    }
    false
}

fn matches_content(pattern: &ContentPattern, content: &str) -> bool {
    match &pattern.content {
        Some(re) => re.is_match(content),
        None => true,
    }
}

fn compile_patterns(
    patterns: &[String],
    strict: bool,
    warnings: &mut Vec<String>,
) -> Vec<ContentPattern> {
    let mut compiled = Vec::new();
    for raw in patterns {
        let (glob_part, content_part) = match raw.split_once("::") {
            Some((g, c)) => (g.to_string(), Some(c.to_string())),
            None => (raw.clone(), None),
        };

        let glob_text = if strict {
            glob_part.clone()
        } else {
            make_recursive(&glob_part)
        };

        let glob = match Pattern::new(&glob_text) {
            Ok(p) => p,
            Err(e) => {
                warnings.push(format!("invalid pattern '{raw}': {}", e.msg));
                continue;
            }
        };

        let content = content_part.map(|text| {
            RegexBuilder::new(&text)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .unwrap_or_else(|_| {
                    // Fall back to a literal search when the text is not
                    // a valid regex
                    RegexBuilder::new(&regex::escape(&text))
                        .case_insensitive(true)
                        .build()
                        .expect("escaped literal always compiles")
                })
        });

        compiled.push(ContentPattern {
            glob,
            basename_ok: !glob_part.contains('/'),
            content,
        });
    }
    compiled
}

/// Make a pattern match at any depth: `*.rs` becomes `**/*.rs`,
/// `src/*.rs` becomes `src/**/*.rs`. Patterns already containing `**`
/// pass through.
fn make_recursive(pattern: &str) -> String {
    if pattern.contains("**") {
        return pattern.to_string();
    }
    match pattern.rsplit_once('/') {
        Some((dir, name)) => format!("{dir}/**/{name}"),
        None => format!("**/{pattern}"),
    }
}

fn is_binary_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| BINARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
