//! Batch migration over a source tree.
//!
//! Order of work: configuration, both tables, classification, the build-file
//! version audit, then one rewrite per file. Nothing on disk is touched until
//! the tables and the classifier are known to be good.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::classify::{FileKind, SourceRecord};
use crate::config::MigrateConfig;
use crate::error::{Error, Result};
use crate::log::Logger;
use crate::mapping::{
    Correspondences, DuplicateSymbol, Projection, TableSource, VersionReplacement,
};
use crate::rewrite::{FileOutcome, LineRewriter, RewriteOptions, WriteMode};

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub root: PathBuf,
    /// Overrides `symbol_table` from the config file.
    pub symbols: Option<String>,
    /// Overrides `artifact_table` from the config file.
    pub artifacts: Option<String>,
    pub config: Option<PathBuf>,
    /// Added to the config file's `excludes`.
    pub excludes: Vec<String>,
    pub mode: WriteMode,
}

impl MigrateOptions {
    pub fn new(root: impl Into<PathBuf>, mode: WriteMode) -> Self {
        Self {
            root: root.into(),
            symbols: None,
            artifacts: None,
            config: None,
            excludes: Vec::new(),
            mode,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MigrationReport {
    pub root: String,
    pub dry_run: bool,
    pub files_scanned: usize,
    pub files_changed: usize,
    pub lines_changed: usize,
    /// Files whose content differs from the original (or would, in dry-run).
    pub files: Vec<FileOutcome>,
    pub version_replacements: Vec<VersionReplacement>,
}

#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub root: String,
    pub sources: usize,
    pub build_files: usize,
    pub config_files: usize,
    pub files: Vec<SourceRecord>,
    pub version_replacements: Vec<VersionReplacement>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactSummary {
    pub source: String,
    pub target: String,
    pub version_variable: String,
    pub target_version: String,
}

#[derive(Debug, Serialize)]
pub struct MappingSummary {
    pub symbol_table: String,
    pub artifact_table: String,
    pub symbols: usize,
    pub duplicates: Vec<DuplicateSymbol>,
    pub projections: Vec<Projection>,
    pub artifacts: Vec<ArtifactSummary>,
}

/// Everything resolved before the first file is opened.
struct Prepared {
    config: MigrateConfig,
    symbol_table: TableSource,
    artifact_table: TableSource,
}

fn prepare(options: &MigrateOptions) -> Result<Prepared> {
    let mut config = MigrateConfig::load(&options.root, options.config.as_deref())?;
    config.excludes.extend(options.excludes.iter().cloned());

    let symbol_table = resolve_table(
        "symbol_table",
        options.symbols.as_deref(),
        config.symbol_table.as_deref(),
        &options.root,
        "--symbols",
    )?;
    let artifact_table = resolve_table(
        "artifact_table",
        options.artifacts.as_deref(),
        config.artifact_table.as_deref(),
        &options.root,
        "--artifacts",
    )?;

    Ok(Prepared {
        config,
        symbol_table,
        artifact_table,
    })
}

/// CLI value as given; config value with relative paths taken from the root.
fn resolve_table(
    key: &str,
    flag: Option<&str>,
    configured: Option<&str>,
    root: &Path,
    flag_name: &str,
) -> Result<TableSource> {
    if let Some(raw) = flag {
        return Ok(TableSource::parse(raw));
    }

    match configured.map(TableSource::parse) {
        Some(TableSource::File(path)) if path.is_relative() => Ok(TableSource::File(root.join(path))),
        Some(source) => Ok(source),
        None => Err(Error::config_invalid_value(
            key,
            None,
            format!("no {} given", key.replace('_', " ")),
        )
        .with_hint(format!(
            "Pass {} or set \"{}\" in nsmigrate.json",
            flag_name, key
        ))),
    }
}

/// Load tables, classify the tree and run the version audit.
fn survey(
    prepared: &Prepared,
    root: &Path,
    log: &Logger,
) -> Result<(Correspondences, Vec<SourceRecord>)> {
    let classifier = prepared.config.classifier()?;
    let mut correspondences =
        Correspondences::load(&prepared.symbol_table, &prepared.artifact_table, log)?;
    let records = classifier.scan(root, log)?;
    correspondences.extend_with_buildfiles(&records, log)?;
    Ok((correspondences, records))
}

/// Rewrite every classified file under the root.
///
/// The first failing file stops the run. Files finished before it keep their
/// new content; the failing file keeps its old content.
pub fn run(options: &MigrateOptions, log: &Logger) -> Result<MigrationReport> {
    let prepared = prepare(options)?;
    let (correspondences, records) = survey(&prepared, &options.root, log)?;
    let rewrite_options = prepared.config.rewrite_options(options.mode);

    let mut files = Vec::new();
    for record in &records {
        let outcome = rewrite_file(&correspondences, record, &rewrite_options, log)?;
        if outcome.changed_lines > 0 || outcome.appended {
            files.push(outcome);
        }
    }

    let lines_changed = files.iter().map(|f| f.changed_lines).sum();
    log.info(|| {
        format!(
            "{} {} of {} files",
            if options.mode == WriteMode::DryRun { "Would change" } else { "Changed" },
            files.len(),
            records.len()
        )
    });

    Ok(MigrationReport {
        root: options.root.display().to_string(),
        dry_run: options.mode == WriteMode::DryRun,
        files_scanned: records.len(),
        files_changed: files.len(),
        lines_changed,
        files,
        version_replacements: correspondences.version_replacements().to_vec(),
    })
}

/// Rewrite one file. Errors raised for a line name the file and line.
pub fn rewrite_file(
    correspondences: &Correspondences,
    record: &SourceRecord,
    options: &RewriteOptions,
    log: &Logger,
) -> Result<FileOutcome> {
    log.debug(|| format!("Migrating {} file {}", record.kind, record.path.display()));

    LineRewriter::open(record, options, log)?.rewrite_with(|line| {
        correspondences
            .fix_line(line.text, record.kind, log)
            .map_err(|e| e.at(&record.path, line.number))
    })
}

/// Classify the tree and audit build files without rewriting anything.
pub fn scan(options: &MigrateOptions, log: &Logger) -> Result<ScanReport> {
    let prepared = prepare(options)?;
    let (correspondences, records) = survey(&prepared, &options.root, log)?;

    let count = |kind: FileKind| records.iter().filter(|r| r.kind == kind).count();

    Ok(ScanReport {
        root: options.root.display().to_string(),
        sources: count(FileKind::Source),
        build_files: count(FileKind::BuildFile),
        config_files: count(FileKind::Config),
        version_replacements: correspondences.version_replacements().to_vec(),
        files: records,
    })
}

/// Load both tables and describe what they contain.
pub fn describe_mapping(options: &MigrateOptions, log: &Logger) -> Result<MappingSummary> {
    let prepared = prepare(options)?;
    let correspondences =
        Correspondences::load(&prepared.symbol_table, &prepared.artifact_table, log)?;

    let artifacts = correspondences
        .artifacts()
        .iter()
        .map(|rule| ArtifactSummary {
            source: rule.source().to_string(),
            target: rule.target().to_string(),
            version_variable: rule.version_variable().to_string(),
            target_version: rule.target_version().to_string(),
        })
        .collect();

    Ok(MappingSummary {
        symbol_table: prepared.symbol_table.label(),
        artifact_table: prepared.artifact_table.label(),
        symbols: correspondences.symbols().len(),
        duplicates: correspondences.symbols().duplicates().to_vec(),
        projections: correspondences.projections().iter().collect(),
        artifacts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SYMBOLS: &str = "old,new\n\
        android.support.annotation.NonNull,androidx.annotation.NonNull\n\
        android.support.v4.app.Fragment,androidx.fragment.app.Fragment\n\
        android.support.v4.app.NotificationCompat,androidx.core.app.NotificationCompat\n";

    const ARTIFACTS: &str = "old,new\n\
        com.android.support:support-annotations,androidx.annotation:annotation:1.0.0\n";

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("symbols.csv"), SYMBOLS).unwrap();
        fs::write(root.join("artifacts.csv"), ARTIFACTS).unwrap();
        fs::create_dir_all(root.join("app/src")).unwrap();
        fs::write(
            root.join("app/src/A.java"),
            "import android.support.annotation.NonNull;\nclass A {}\n",
        )
        .unwrap();
        fs::write(root.join("app/src/B.java"), "class B {}\n").unwrap();
        fs::write(
            root.join("app/build.gradle"),
            "dependencies {\n    implementation \"com.android.support:support-annotations:$supportVersion\"\n}\n",
        )
        .unwrap();
        fs::write(root.join("gradle.properties"), "org.gradle.jvmargs=-Xmx2g\n").unwrap();
        dir
    }

    fn options(dir: &TempDir, mode: WriteMode) -> MigrateOptions {
        let mut options = MigrateOptions::new(dir.path(), mode);
        options.symbols = Some(dir.path().join("symbols.csv").display().to_string());
        options.artifacts = Some(dir.path().join("artifacts.csv").display().to_string());
        options
    }

    #[test]
    fn run_rewrites_every_kind() {
        let dir = tree();
        let report = run(&options(&dir, WriteMode::Apply), &Logger::quiet()).unwrap();

        assert!(!report.dry_run);
        assert_eq!(report.files_scanned, 4);
        assert_eq!(report.files_changed, 3);
        assert_eq!(report.version_replacements.len(), 1);
        assert_eq!(report.version_replacements[0].variable, "supportVersion");

        let root = dir.path();
        assert_eq!(
            fs::read_to_string(root.join("app/src/A.java")).unwrap(),
            "import androidx.annotation.NonNull;\nclass A {}\n"
        );
        assert_eq!(fs::read_to_string(root.join("app/src/B.java")).unwrap(), "class B {}\n");
        assert!(fs::read_to_string(root.join("app/build.gradle"))
            .unwrap()
            .contains("\"androidx.annotation:annotation:$annotationVersion\" // Latest version: 1.0.0\n"));
        assert!(fs::read_to_string(root.join("gradle.properties"))
            .unwrap()
            .ends_with("android.useAndroidX=true\nandroid.enableJetifier=true\n"));
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let dir = tree();
        let before = fs::read_to_string(dir.path().join("app/src/A.java")).unwrap();
        let report = run(&options(&dir, WriteMode::DryRun), &Logger::quiet()).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.files_changed, 3);
        assert!(report.files.iter().all(|f| !f.written));
        assert_eq!(fs::read_to_string(dir.path().join("app/src/A.java")).unwrap(), before);
    }

    #[test]
    fn missing_table_source_is_config_error() {
        let dir = tree();
        let mut options = options(&dir, WriteMode::DryRun);
        options.artifacts = None;

        let err = run(&options, &Logger::quiet()).unwrap_err();
        assert_eq!(err.code.as_str(), "config.invalid_value");
        assert_eq!(err.details["key"], "artifact_table");
        assert!(!err.hints.is_empty());
    }

    #[test]
    fn config_file_supplies_relative_table_paths() {
        let dir = tree();
        fs::write(
            dir.path().join("nsmigrate.json"),
            r#"{ "symbol_table": "symbols.csv", "artifact_table": "artifacts.csv" }"#,
        )
        .unwrap();

        let report = scan(&MigrateOptions::new(dir.path(), WriteMode::DryRun), &Logger::quiet()).unwrap();
        assert_eq!(report.sources, 2);
        assert_eq!(report.build_files, 1);
        assert_eq!(report.config_files, 1);
    }

    #[test]
    fn ambiguous_wildcard_aborts_with_location() {
        let dir = tree();
        let path = dir.path().join("app/src/C.java");
        fs::write(&path, "package c;\nimport android.support.v4.app.*;\n").unwrap();

        let err = run(&options(&dir, WriteMode::Apply), &Logger::quiet()).unwrap_err();
        assert_eq!(err.code.as_str(), "projection.ambiguous");
        assert_eq!(err.details["lineNumber"], 2);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "package c;\nimport android.support.v4.app.*;\n"
        );
    }

    #[test]
    fn describe_mapping_lists_projections_and_rules() {
        let dir = tree();
        let summary = describe_mapping(&options(&dir, WriteMode::DryRun), &Logger::quiet()).unwrap();

        assert_eq!(summary.symbols, 3);
        assert!(summary.duplicates.is_empty());
        assert_eq!(summary.artifacts.len(), 1);
        assert_eq!(summary.artifacts[0].version_variable, "annotationVersion");
        let v4 = summary
            .projections
            .iter()
            .find(|p| p.package == "android.support.v4.app.")
            .unwrap();
        assert!(!v4.unique);
    }
}
