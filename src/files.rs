//! Local file patterns for release assets.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use crate::error::{ReleaseError, Result};

/// Split a pattern list on newlines and commas, dropping blanks.
#[must_use]
pub fn parse_patterns(input: &str) -> Vec<String> {
    input
        .split(['\n', ','])
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(str::to_string)
        .collect()
}

/// Files matched by a set of glob patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileMatches {
    /// Regular files, in pattern order, each listed once.
    pub paths: Vec<PathBuf>,
    /// Patterns that matched no regular file.
    pub unmatched: Vec<String>,
}

/// Expand `patterns`. Directories are never matched.
pub fn resolve(patterns: &[String]) -> Result<FileMatches> {
    let mut matches = FileMatches::default();
    let mut seen = HashSet::new();

    for pattern in patterns {
        let entries = glob::glob(pattern).map_err(|err| {
            ReleaseError::Config(format!("invalid file pattern {pattern}: {err}"))
        })?;

        let mut matched = false;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "Skipping unreadable path");
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }
            matched = true;
            if seen.insert(path.clone()) {
                matches.paths.push(path);
            }
        }

        if !matched {
            matches.unmatched.push(pattern.clone());
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn pattern(dir: &TempDir, suffix: &str) -> String {
        format!("{}/{suffix}", dir.path().display())
    }

    #[test]
    fn parse_patterns_splits_lines_and_commas() {
        assert_eq!(
            parse_patterns("dist/*.zip, dist/*.tar.gz\n\nCHANGELOG.md\n"),
            vec!["dist/*.zip", "dist/*.tar.gz", "CHANGELOG.md"]
        );
        assert!(parse_patterns(" \n , ").is_empty());
    }

    #[test]
    fn resolve_matches_files_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::create_dir(dir.path().join("c.txt")).unwrap();

        let matches = resolve(&[pattern(&dir, "*.txt")]).unwrap();
        let names: Vec<_> = matches
            .paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
        assert!(matches.unmatched.is_empty());
    }

    #[test]
    fn resolve_reports_unmatched_patterns() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::create_dir(dir.path().join("only-dir")).unwrap();

        let patterns = vec![
            pattern(&dir, "a.txt"),
            pattern(&dir, "*.zip"),
            pattern(&dir, "only-dir"),
        ];
        let matches = resolve(&patterns).unwrap();
        assert_eq!(matches.paths.len(), 1);
        assert_eq!(matches.unmatched, vec![patterns[1].clone(), patterns[2].clone()]);
    }

    #[test]
    fn resolve_lists_each_file_once() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let matches = resolve(&[pattern(&dir, "*.txt"), pattern(&dir, "a.txt")]).unwrap();
        assert_eq!(matches.paths.len(), 1);
        assert!(matches.unmatched.is_empty());
    }

    #[test]
    fn resolve_rejects_invalid_pattern() {
        let err = resolve(&["[".to_string()]).unwrap_err();
        assert!(matches!(err, ReleaseError::Config(ref msg) if msg.contains("invalid file pattern")));
    }
}
