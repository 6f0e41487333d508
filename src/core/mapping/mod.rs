//! Correspondence resolution: old names and coordinates to new ones.
//!
//! Loads the symbol and artifact tables once, derives the wildcard projection
//! index, and answers "what should this line become?" for each file kind.

pub mod artifact;
pub mod projection;
pub mod qualified;
pub mod table;

pub use artifact::{
    version_variable_name, ArtifactCoordinate, ArtifactRule, DeclarationForm, VersionReplacement,
};
pub use projection::{package_of, Projection, StarProjectionIndex};
pub use qualified::QualifiedNameRewriter;
pub use table::{read_rows, DuplicateSymbol, MappingTable, TableRow, TableSource};

use crate::classify::{FileKind, SourceRecord};
use crate::error::{Error, Result};
use crate::log::Logger;
use crate::utils::io;

pub struct Correspondences {
    symbols: MappingTable,
    projections: StarProjectionIndex,
    artifacts: Vec<ArtifactRule>,
    version_replacements: Vec<VersionReplacement>,
}

impl Correspondences {
    /// Fetch and parse both tables. Nothing is usable if either one fails.
    pub fn load(symbols: &TableSource, artifacts: &TableSource, log: &Logger) -> Result<Self> {
        let symbol_label = symbols.label();
        let symbol_rows = read_rows(&symbol_label, &symbols.fetch(log)?, log)?;

        let artifact_label = artifacts.label();
        let artifact_rows = read_rows(&artifact_label, &artifacts.fetch(log)?, log)?;

        Self::from_rows(&symbol_rows, &artifact_rows, &artifact_label, log)
    }

    pub fn from_rows(
        symbol_rows: &[TableRow],
        artifact_rows: &[TableRow],
        artifact_source: &str,
        log: &Logger,
    ) -> Result<Self> {
        let symbols = MappingTable::from_rows(symbol_rows, log);

        // Every row counts, including ones a later duplicate overwrote.
        let mut projections = StarProjectionIndex::default();
        for row in symbol_rows {
            projections.add(package_of(&row.from), package_of(&row.to));
        }

        let artifacts = artifact_rows
            .iter()
            .map(|row| {
                ArtifactRule::new(&row.from, &row.to)
                    .map_err(|problem| Error::table_invalid(artifact_source, Some(row.line), problem))
            })
            .collect::<Result<Vec<_>>>()?;

        let correspondences = Self {
            symbols,
            projections,
            artifacts,
            version_replacements: Vec::new(),
        };
        correspondences.log_summary(log);
        Ok(correspondences)
    }

    fn log_summary(&self, log: &Logger) {
        log.info(|| {
            format!(
                "Loaded {} symbols, {} packages, {} artifact rules",
                self.symbols.len(),
                self.projections.len(),
                self.artifacts.len()
            )
        });

        if !log.enabled(crate::log::Verbosity::Debug) {
            return;
        }
        for (from, to) in self.symbols.sorted_entries() {
            log.debug(|| format!("{} -> {}", from, to));
        }
        for projection in self.projections.iter() {
            if projection.unique {
                log.debug(|| {
                    format!(
                        "Source package '{}*' can be replaced with {}*",
                        projection.package, projection.targets[0]
                    )
                });
            } else {
                log.debug(|| {
                    format!(
                        "Source package '{}' maps to more than one destination: {:?}",
                        projection.package, projection.targets
                    )
                });
            }
        }
        for rule in &self.artifacts {
            log.debug(|| rule.to_string());
        }
    }

    pub fn symbols(&self) -> &MappingTable {
        &self.symbols
    }

    pub fn projections(&self) -> &StarProjectionIndex {
        &self.projections
    }

    pub fn artifacts(&self) -> &[ArtifactRule] {
        &self.artifacts
    }

    pub fn version_replacements(&self) -> &[VersionReplacement] {
        &self.version_replacements
    }

    pub fn qualified(&self) -> QualifiedNameRewriter<'_> {
        QualifiedNameRewriter::new(&self.symbols, &self.projections)
    }

    /// Replacement for one line of a file of the given kind, or `None` to keep it.
    pub fn fix_line(&self, line: &str, kind: FileKind, log: &Logger) -> Result<Option<String>> {
        match kind {
            FileKind::Source => self.qualified().rewrite(line, log),
            FileKind::BuildFile => Ok(self.fix_build_line(line, log)),
            FileKind::Config => Ok(None),
        }
    }

    fn fix_build_line(&self, line: &str, log: &Logger) -> Option<String> {
        let (rule, rewritten) = self
            .artifacts
            .iter()
            .find_map(|rule| rule.rewrite(line).map(|out| (rule, out)))?;
        log.raw(|| format!("Replace '{}' with '{}' ({})", line.trim(), rewritten.trim(), rule));
        Some(rewritten)
    }

    /// First rule that recognises a version placeholder on this line.
    pub fn extract_version_var(
        &self,
        record: &SourceRecord,
        line: &str,
        line_number: usize,
    ) -> Option<VersionReplacement> {
        self.artifacts
            .iter()
            .find_map(|rule| rule.matches(&record.path, line, line_number))
    }

    /// Index version placeholders across build files. Reporting only; the
    /// rewrite pass never consults it.
    pub fn extend_with_buildfiles<'r>(
        &mut self,
        records: impl IntoIterator<Item = &'r SourceRecord>,
        log: &Logger,
    ) -> Result<()> {
        for record in records {
            if record.kind != FileKind::BuildFile {
                continue;
            }

            let text = io::read_utf8(&record.path)?;
            for (idx, line) in text.lines().enumerate() {
                if let Some(found) = self.extract_version_var(record, line, idx + 1) {
                    log.debug(|| format!("Found version replacement: {}", found));
                    self.version_replacements.push(found);
                }
            }
        }

        Ok(())
    }
}
