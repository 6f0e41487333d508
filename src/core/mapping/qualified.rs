//! Fully-qualified name substitution for source lines.

use super::projection::StarProjectionIndex;
use super::table::MappingTable;
use crate::error::Result;
use crate::log::Logger;
use regex::Regex;
use std::sync::LazyLock;

/// Dotted identifier paths, optionally ending in a wildcard: `a.b.C`, `a.b.*`.
static QUALIFIED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\w+\.)+(?:\w+|\*)").unwrap());

pub struct QualifiedNameRewriter<'a> {
    symbols: &'a MappingTable,
    projections: &'a StarProjectionIndex,
}

impl<'a> QualifiedNameRewriter<'a> {
    pub fn new(symbols: &'a MappingTable, projections: &'a StarProjectionIndex) -> Self {
        Self {
            symbols,
            projections,
        }
    }

    /// Rewrite every mapped name on the line. `Ok(None)` when nothing changed.
    pub fn rewrite(&self, line: &str, log: &Logger) -> Result<Option<String>> {
        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        let mut changed = false;

        for found in QUALIFIED_NAME.find_iter(line) {
            let matched = found.as_str();
            let Some(replacement) = self.replacement_for(matched, log)? else {
                continue;
            };

            out.push_str(&line[last..found.start()]);
            out.push_str(&replacement);
            last = found.end();
            changed |= replacement != matched;
        }

        if !changed {
            return Ok(None);
        }
        out.push_str(&line[last..]);
        Ok(Some(out))
    }

    fn replacement_for(&self, matched: &str, log: &Logger) -> Result<Option<String>> {
        if let Some(symbol) = self.symbols.lookup(matched) {
            log.raw(|| format!("Subst '{}' with '{}'", matched, symbol));
            return Ok(Some(symbol.to_string()));
        }

        let projected = self.projections.unique_projection(matched)?;
        if let Some(star) = &projected {
            log.raw(|| format!("Star-Subst '{}' with '{}'", matched, star));
        }
        Ok(projected)
    }
}
