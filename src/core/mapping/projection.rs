//! Package-level wildcard projections (`a.b.*` → `x.y.*`).

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeMap;

/// Package prefix of a dotted name, keeping the trailing separator:
/// `a.b.C` → `a.b.`, `a.b.*` → `a.b.`.
pub fn package_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) => name[..=idx].to_string(),
        None => ".".to_string(),
    }
}

/// A source package and every destination package seen for it.
#[derive(Debug, Clone, Serialize)]
pub struct Projection {
    pub package: String,
    pub targets: Vec<String>,
    pub unique: bool,
}

#[derive(Debug, Clone, Default)]
pub struct StarProjectionIndex {
    packages: BTreeMap<String, Vec<String>>,
}

impl StarProjectionIndex {
    pub fn add(&mut self, source_package: String, target_package: String) {
        let targets = self.packages.entry(source_package).or_default();
        if !targets.contains(&target_package) {
            targets.push(target_package);
        }
    }

    /// Rewrite a wildcard reference through its package's single destination.
    ///
    /// Returns `Ok(None)` for non-wildcard input and unknown packages, and an
    /// ambiguity error when the package was seen moving to several places.
    pub fn unique_projection(&self, reference: &str) -> Result<Option<String>> {
        if !reference.ends_with('*') {
            return Ok(None);
        }

        let package = package_of(reference);
        match self.packages.get(&package).map(Vec::as_slice) {
            None | Some([]) => Ok(None),
            Some([target]) => Ok(Some(format!("{}*", target))),
            Some(targets) => Err(Error::projection_ambiguous(
                reference,
                package,
                targets.to_vec(),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Projection> + '_ {
        self.packages.iter().map(|(package, targets)| Projection {
            package: package.clone(),
            targets: targets.clone(),
            unique: targets.len() == 1,
        })
    }
}
