//! Caller-supplied compression overrides
//!
//! Override rules pin a compression level to every path matching a glob
//! pattern. Rules are evaluated in caller-declared order and the first
//! matching pattern wins; planning never revisits a pinned file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::domain::CompressionLevel;
use crate::error::PatternError;

/// One pattern → level rule, position in the list is its priority
#[derive(Debug, Clone)]
pub struct OverrideRule {
    /// Glob pattern, matched against the path relative to the scan root
    pub pattern: String,
    /// Level forced on matching files
    pub level: CompressionLevel,
}

impl OverrideRule {
    pub fn new(pattern: impl Into<String>, level: CompressionLevel) -> Self {
        Self {
            pattern: pattern.into(),
            level,
        }
    }
}

/// Resolves override rules to per-file forced levels.
///
/// Compilation is all-or-nothing: one malformed pattern fails the whole
/// construction with a [`PatternError`] naming the offending rule, and no
/// partial rule set survives.
#[derive(Debug)]
pub struct OverrideResolver {
    rules: Vec<(Pattern, CompressionLevel, bool)>,
}

impl OverrideResolver {
    /// Compile `rules`, preserving their declared order
    pub fn new(rules: &[OverrideRule]) -> Result<Self, PatternError> {
        let mut compiled = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let pattern = Pattern::new(&rule.pattern).map_err(|e| PatternError {
                rule: index,
                pattern: rule.pattern.clone(),
                reason: e.msg.to_string(),
            })?;
            // Bare-name patterns like `*.proto` also match on the basename
            let basename_ok = !rule.pattern.contains('/');
            compiled.push((pattern, rule.level, basename_ok));
        }
        Ok(Self { rules: compiled })
    }

    /// A resolver with no rules; every path is free
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Level forced on `path` by the first matching rule, if any
    pub fn resolve(&self, path: &Path) -> Option<CompressionLevel> {
        for (pattern, level, basename_ok) in &self.rules {
            if pattern.matches_path(path) {
                return Some(*level);
            }
            if *basename_ok {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if pattern.matches(name) {
                        return Some(*level);
                    }
                }
            }
        }
        None
    }

    /// Resolve a whole path set; unmatched paths are absent from the map
    pub fn resolve_all<'a, I>(&self, paths: I) -> BTreeMap<PathBuf, CompressionLevel>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        paths
            .into_iter()
            .filter_map(|p| self.resolve(p).map(|level| (p.to_path_buf(), level)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(rules: &[(&str, CompressionLevel)]) -> OverrideResolver {
        let rules: Vec<OverrideRule> = rules
            .iter()
            .map(|(p, l)| OverrideRule::new(*p, *l))
            .collect();
        OverrideResolver::new(&rules).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let resolver = resolver(&[
            ("src/**/*.rs", CompressionLevel::None),
            ("**/*.rs", CompressionLevel::Heavy),
        ]);
        assert_eq!(
            resolver.resolve(Path::new("src/planner/mod.rs")),
            Some(CompressionLevel::None)
        );
        assert_eq!(
            resolver.resolve(Path::new("tests/planner_test.rs")),
            Some(CompressionLevel::Heavy)
        );
    }

    #[test]
    fn test_declared_order_not_specificity() {
        // The broader rule is declared first, so it wins even against a
        // more specific one later in the list.
        let resolver = resolver(&[
            ("**/*.rs", CompressionLevel::Heavy),
            ("src/**/*.rs", CompressionLevel::None),
        ]);
        assert_eq!(
            resolver.resolve(Path::new("src/planner/mod.rs")),
            Some(CompressionLevel::Heavy)
        );
    }

    #[test]
    fn test_unmatched_paths_absent() {
        let resolver = resolver(&[("*.md", CompressionLevel::Max)]);
        let paths = [Path::new("README.md"), Path::new("src/lib.rs")];
        let resolved = resolver.resolve_all(paths.iter().copied());
        assert_eq!(resolved.len(), 1);
        assert_eq!(
            resolved.get(Path::new("README.md")),
            Some(&CompressionLevel::Max)
        );
        assert!(!resolved.contains_key(Path::new("src/lib.rs")));
    }

    #[test]
    fn test_basename_match_for_bare_patterns() {
        let resolver = resolver(&[("*.lock", CompressionLevel::Max)]);
        assert_eq!(
            resolver.resolve(Path::new("vendor/deep/Cargo.lock")),
            Some(CompressionLevel::Max)
        );
    }

    #[test]
    fn test_malformed_pattern_fails_whole_set() {
        let rules = [
            OverrideRule::new("*.rs", CompressionLevel::None),
            OverrideRule::new("[invalid", CompressionLevel::Max),
        ];
        let err = OverrideResolver::new(&rules).unwrap_err();
        assert_eq!(err.rule, 1);
        assert_eq!(err.pattern, "[invalid");
    }
}
