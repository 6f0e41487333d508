//! Tree walking and file kind classification.
//!
//! Only this module looks at file names; everything downstream works from the
//! `FileKind` tag attached to each `SourceRecord`.

use crate::error::{Error, Result};
use crate::log::Logger;
use glob_match::glob_match;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directories never worth descending into (VCS, IDE and build output).
const ALWAYS_SKIP_DIRS: &[&str] = &[".git", ".svn", ".hg", ".gradle", ".idea", "build"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Java/Kotlin sources and XML resources: fully-qualified names are rewritten.
    Source,
    /// Gradle scripts: dependency coordinates are rewritten.
    BuildFile,
    /// Gradle properties: untouched, but the migration flags are appended.
    Config,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Source => "source",
            FileKind::BuildFile => "build-file",
            FileKind::Config => "config",
        }
    }
}

impl FromStr for FileKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "source" => Ok(FileKind::Source),
            "build-file" => Ok(FileKind::BuildFile),
            "config" => Ok(FileKind::Config),
            _ => Err(Error::config_invalid_value(
                "classify.kind",
                Some(s.to_string()),
                format!("unknown file kind '{}'. Use: source, build-file, config", s),
            )),
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A file to migrate and how to treat it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord {
    pub path: PathBuf,
    pub kind: FileKind,
}

/// File name globs for one kind.
#[derive(Debug, Clone)]
pub struct ClassifyRule {
    pub kind: FileKind,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FileClassifier {
    rules: Vec<ClassifyRule>,
    excludes: Vec<Regex>,
}

impl FileClassifier {
    pub fn new(rules: Vec<ClassifyRule>, excludes: Vec<Regex>) -> Self {
        Self { rules, excludes }
    }

    /// Kind of a file by name; first matching rule wins.
    pub fn classify(&self, path: &Path) -> Option<FileKind> {
        let name = path.file_name()?.to_str()?;
        self.rules
            .iter()
            .find(|rule| rule.patterns.iter().any(|p| glob_match(p, name)))
            .map(|rule| rule.kind)
    }

    fn is_excluded(&self, dir: &Path, log: &Logger) -> bool {
        let name = dir.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if ALWAYS_SKIP_DIRS.contains(&name) {
            return true;
        }

        let text = dir.to_string_lossy();
        let excluded = self.excludes.iter().any(|re| re.is_match(&text));
        if excluded {
            log.info(|| format!("Discarding source dir: {}", text));
        }
        excluded
    }

    /// Every classifiable file under `root`, in sorted path order.
    pub fn scan(&self, root: &Path, log: &Logger) -> Result<Vec<SourceRecord>> {
        if !root.is_dir() {
            return Err(Error::validation_invalid_argument(
                "root",
                format!("'{}' is not a directory", root.display()),
            ));
        }

        let mut records = Vec::new();
        self.walk(root, log, &mut records)?;

        // A file linked into the tree twice is still one file.
        let mut seen = HashSet::new();
        records.retain(|record| {
            let real = fs::canonicalize(&record.path).unwrap_or_else(|_| record.path.clone());
            let first = seen.insert(real);
            if !first {
                log.info(|| format!("Skipping second path to the same file: {}", record.path.display()));
            }
            first
        });

        log.info(|| format!("Found {} files to migrate under {}", records.len(), root.display()));
        Ok(records)
    }

    fn walk(&self, dir: &Path, log: &Logger, records: &mut Vec<SourceRecord>) -> Result<()> {
        let entries = fs::read_dir(dir).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("read dir {}", dir.display())))
        })?;

        let mut entries: Vec<fs::DirEntry> = entries.flatten().collect();
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };

            if file_type.is_dir() {
                if !self.is_excluded(&path, log) {
                    self.walk(&path, log, records)?;
                }
                continue;
            }

            // Directory links are never descended; file links are followed.
            if file_type.is_symlink() && !path.is_file() {
                log.info(|| format!("Not following symlink: {}", path.display()));
                continue;
            }

            if let Some(kind) = self.classify(&path) {
                log.debug(|| format!("{} file at '{}'", kind, path.display()));
                records.push(SourceRecord { path, kind });
            }
        }

        Ok(())
    }
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::new(default_rules(), Vec::new())
    }
}

pub fn default_rules() -> Vec<ClassifyRule> {
    vec![
        ClassifyRule {
            kind: FileKind::Source,
            patterns: vec!["*.java".into(), "*.kt".into(), "*.xml".into()],
        },
        ClassifyRule {
            kind: FileKind::BuildFile,
            patterns: vec!["*.gradle".into()],
        },
        ClassifyRule {
            kind: FileKind::Config,
            patterns: vec!["gradle.properties".into()],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn kind_round_trips_through_names() {
        for kind in [FileKind::Source, FileKind::BuildFile, FileKind::Config] {
            assert_eq!(kind.as_str().parse::<FileKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_is_config_error() {
        let err = "resource".parse::<FileKind>().unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["value"], "resource");
    }

    #[test]
    fn classify_by_file_name() {
        let classifier = FileClassifier::default();
        assert_eq!(classifier.classify(Path::new("a/Main.java")), Some(FileKind::Source));
        assert_eq!(classifier.classify(Path::new("a/Main.kt")), Some(FileKind::Source));
        assert_eq!(classifier.classify(Path::new("res/layout/main.xml")), Some(FileKind::Source));
        assert_eq!(classifier.classify(Path::new("app/build.gradle")), Some(FileKind::BuildFile));
        assert_eq!(classifier.classify(Path::new("gradle.properties")), Some(FileKind::Config));
        assert_eq!(classifier.classify(Path::new("README.md")), None);
    }

    #[test]
    fn scan_skips_build_output_and_excluded_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/src/main/java")).unwrap();
        fs::create_dir_all(root.join("app/build/generated")).unwrap();
        fs::create_dir_all(root.join("thirdparty/lib")).unwrap();
        fs::write(root.join("app/src/main/java/Main.java"), "class Main {}\n").unwrap();
        fs::write(root.join("app/build/generated/R.java"), "class R {}\n").unwrap();
        fs::write(root.join("thirdparty/lib/Vendored.java"), "class V {}\n").unwrap();
        fs::write(root.join("app/build.gradle"), "\n").unwrap();
        fs::write(root.join("gradle.properties"), "\n").unwrap();
        fs::write(root.join("notes.txt"), "\n").unwrap();

        let classifier = FileClassifier::new(
            default_rules(),
            vec![Regex::new("thirdparty").unwrap()],
        );
        let records = classifier.scan(root, &Logger::quiet()).unwrap();

        let found: Vec<(String, FileKind)> = records
            .iter()
            .map(|r| {
                (
                    r.path.strip_prefix(root).unwrap().to_string_lossy().to_string(),
                    r.kind,
                )
            })
            .collect();
        assert_eq!(
            found,
            vec![
                ("app/build.gradle".to_string(), FileKind::BuildFile),
                ("app/src/main/java/Main.java".to_string(), FileKind::Source),
                ("gradle.properties".to_string(), FileKind::Config),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn scan_does_not_follow_directory_links() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/gradle.properties"), "a=1\n").unwrap();
        fs::write(root.join("app/Main.java"), "class Main {}\n").unwrap();
        symlink(root.join("app"), root.join("alias")).unwrap();
        symlink(root, root.join("app/loop")).unwrap();

        let records = FileClassifier::default().scan(root, &Logger::quiet()).unwrap();

        let found: Vec<PathBuf> = records
            .iter()
            .map(|r| r.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            found,
            vec![PathBuf::from("app/Main.java"), PathBuf::from("app/gradle.properties")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn scan_keeps_one_record_per_linked_file() {
        use std::os::unix::fs::symlink;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("shared")).unwrap();
        fs::write(root.join("shared/gradle.properties"), "b=2\n").unwrap();
        symlink(root.join("shared/gradle.properties"), root.join("gradle.properties")).unwrap();
        symlink(root.join("missing.java"), root.join("Broken.java")).unwrap();

        let records = FileClassifier::default().scan(root, &Logger::quiet()).unwrap();

        let configs: Vec<&SourceRecord> =
            records.iter().filter(|r| r.kind == FileKind::Config).collect();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].path, root.join("gradle.properties"));
        assert!(records.iter().all(|r| !r.path.ends_with("Broken.java")));
    }

    #[test]
    fn scan_rejects_missing_root() {
        let err = FileClassifier::default()
            .scan(Path::new("/nonexistent/nsmigrate/root"), &Logger::quiet())
            .unwrap_err();
        assert_eq!(err.code.as_str(), "validation.invalid_argument");
    }
}
