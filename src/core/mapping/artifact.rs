//! Dependency coordinate rules for build files.
//!
//! A rule recognises two declaration shapes, tried in order:
//!
//! 1. Coordinate strings with an interpolated version:
//!    `"com.android.support:appcompat-v7:${supportVersion}"`
//! 2. Keyword maps:
//!    `group: 'com.android.support', name: 'appcompat-v7', version: "$supportVersion"`
//!
//! Either way the group/module literals become the destination's, the version
//! placeholder becomes a variable named after the destination module, and a
//! trace comment with the target version is appended to the line.

use crate::utils::text::split_line_ending;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").unwrap());

/// Dotted property access in front of a version token (`rootProject.ext.`).
const PROPERTY_PREFIX: &str = r"(?:[A-Za-z_]\w*\.)*";
const VERSION_TOKEN: &str = r#"[^"'}\s]+"#;
/// Unquoted, unbraced tokens also stop at the next argument or closing paren.
const BARE_VERSION_TOKEN: &str = r#"[^"'}\s,)]+"#;

const VERSION_GROUPS: [&str; 6] = [
    "version_0",
    "version_1",
    "version_2",
    "version_3",
    "version_4",
    "version_5",
];

/// `group:module[:version]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactCoordinate {
    pub group: String,
    pub module: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ArtifactCoordinate {
    /// Parse an old coordinate. Only `group:module` takes part in matching.
    fn parse_source(raw: &str) -> Result<Self, String> {
        let parts: Vec<&str> = raw.trim().split(':').map(str::trim).collect();
        if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(format!("'{}' is not a group:module coordinate", raw));
        }

        Ok(Self {
            group: parts[0].to_string(),
            module: parts[1].to_string(),
            version: (parts.len() > 2).then(|| parts[2..].join(":")),
        })
    }

    /// Parse a new coordinate. The version is whatever follows the last colon.
    fn parse_target(raw: &str) -> Result<(Self, String), String> {
        let raw = raw.trim();
        let Some(idx) = raw.rfind(':') else {
            return Err(format!("'{}' has no version part", raw));
        };

        let artifact = raw[..idx].trim();
        let version = raw[idx + 1..].trim();
        let parts: Vec<&str> = artifact.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts[0].is_empty() || parts[1].is_empty() || version.is_empty() {
            return Err(format!("'{}' is not a group:module:version coordinate", raw));
        }

        let coordinate = Self {
            group: parts[0].to_string(),
            module: parts[1].to_string(),
            version: Some(version.to_string()),
        };
        Ok((coordinate, artifact.to_string()))
    }
}

impl fmt::Display for ArtifactCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.module, version),
            None => write!(f, "{}:{}", self.group, self.module),
        }
    }
}

/// Variable name for a module's version: `appcompat-v7` → `appcompatV7Version`.
///
/// Tokens are the runs between non-word characters; the first is lower-cased,
/// the rest get an upper-case first letter and lower-case remainder.
pub fn version_variable_name(module: &str) -> String {
    let mut name = String::new();
    for (idx, word) in NON_WORD.split(module).enumerate() {
        if idx == 0 {
            name.push_str(&word.to_lowercase());
        } else {
            name.push_str(&capitalize(word));
        }
    }
    name.push_str("Version");
    name
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => c.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
    }
}

/// Where a version placeholder was found and what it will become.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionReplacement {
    pub file: String,
    pub line: usize,
    pub variable: String,
    pub target_variable: String,
    pub version: String,
}

impl fmt::Display for VersionReplacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version replacement on '{}:{}'. Varname = {}, Substitution: {} = {}",
            self.file, self.line, self.variable, self.target_variable, self.version
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationForm {
    Coordinate,
    Keyword,
}

#[derive(Debug, Clone)]
struct FormMatcher {
    form: DeclarationForm,
    regex: Regex,
}

#[derive(Debug, Clone)]
pub struct ArtifactRule {
    source: ArtifactCoordinate,
    target: ArtifactCoordinate,
    /// Destination without its version, e.g. `androidx.appcompat:appcompat`.
    target_artifact: String,
    target_version: String,
    version_variable: String,
    matchers: Vec<FormMatcher>,
}

impl ArtifactRule {
    /// Build a rule from one artifact table row. The error is a description of
    /// what is wrong with the row.
    pub fn new(from: &str, to: &str) -> Result<Self, String> {
        let source = ArtifactCoordinate::parse_source(from)?;
        let (target, target_artifact) = ArtifactCoordinate::parse_target(to)?;
        let target_version = target.version.clone().unwrap_or_default();
        let version_variable = version_variable_name(&target.module);

        let group = regex::escape(&source.group);
        let module = regex::escape(&source.module);

        let coordinate = Regex::new(&coordinate_pattern(&group, &module))
            .map_err(|e| format!("cannot build coordinate matcher: {}", e))?;
        let keyword = Regex::new(&keyword_pattern(&group, &module))
            .map_err(|e| format!("cannot build keyword matcher: {}", e))?;

        Ok(Self {
            source,
            target,
            target_artifact,
            target_version,
            version_variable,
            matchers: vec![
                FormMatcher {
                    form: DeclarationForm::Coordinate,
                    regex: coordinate,
                },
                FormMatcher {
                    form: DeclarationForm::Keyword,
                    regex: keyword,
                },
            ],
        })
    }

    pub fn source(&self) -> &ArtifactCoordinate {
        &self.source
    }

    pub fn target(&self) -> &ArtifactCoordinate {
        &self.target
    }

    pub fn target_version(&self) -> &str {
        &self.target_version
    }

    pub fn version_variable(&self) -> &str {
        &self.version_variable
    }

    /// Locate a version placeholder on a build file line without rewriting it.
    pub fn matches(&self, file: &Path, line: &str, line_number: usize) -> Option<VersionReplacement> {
        self.matchers.iter().find_map(|matcher| {
            let caps = matcher.regex.captures(line)?;
            let version = version_span(&caps)?;
            Some(VersionReplacement {
                file: file.display().to_string(),
                line: line_number,
                variable: line[version].to_string(),
                target_variable: self.version_variable.clone(),
                version: self.target_version.clone(),
            })
        })
    }

    /// Rewrite a build file line, or `None` when this rule does not apply.
    pub fn rewrite(&self, line: &str) -> Option<String> {
        self.matchers
            .iter()
            .find_map(|matcher| self.substitute(matcher, line))
            .map(|rewritten| append_trace(&rewritten, &self.target_version))
    }

    fn substitute(&self, matcher: &FormMatcher, line: &str) -> Option<String> {
        let mut out = String::with_capacity(line.len() + 16);
        let mut last = 0;
        let mut replaced = 0;

        for caps in matcher.regex.captures_iter(line) {
            let Some(edits) = self.edits(matcher.form, &caps) else {
                continue;
            };
            for (span, replacement) in edits {
                out.push_str(&line[last..span.start]);
                out.push_str(replacement);
                last = span.end;
            }
            replaced += 1;
        }

        if replaced == 0 {
            return None;
        }
        out.push_str(&line[last..]);
        Some(out)
    }

    /// Spans to replace within one match, in ascending order.
    fn edits<'r>(
        &'r self,
        form: DeclarationForm,
        caps: &Captures<'_>,
    ) -> Option<Vec<(Range<usize>, &'r str)>> {
        let version = version_span(caps)?;
        match form {
            DeclarationForm::Coordinate => {
                let coordinate = caps.name("coordinate")?.range();
                Some(vec![
                    (coordinate, self.target_artifact.as_str()),
                    (version, self.version_variable.as_str()),
                ])
            }
            DeclarationForm::Keyword => {
                let group = first_span(caps, &["group_dq", "group_sq"])?;
                let module = first_span(caps, &["module_dq", "module_sq"])?;
                Some(vec![
                    (group, self.target.group.as_str()),
                    (module, self.target.module.as_str()),
                    (version, self.version_variable.as_str()),
                ])
            }
        }
    }
}

impl fmt::Display for ArtifactRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "From '{}:{}' to '{}' version: {}={}",
            self.source.group,
            self.source.module,
            self.target_artifact,
            self.version_variable,
            self.target_version
        )
    }
}

fn coordinate_pattern(group: &str, module: &str) -> String {
    format!(
        r"(?P<coordinate>{group}:{module}):\$\{{?{prefix}(?P<version_0>{token})\}}?",
        prefix = PROPERTY_PREFIX,
        token = VERSION_TOKEN,
    )
}

fn keyword_pattern(group: &str, module: &str) -> String {
    format!(
        r"group\s*:\s*{group}\s*,\s*name\s*:\s*{module}\s*,\s*version\s*:\s*{version}",
        group = quoted_literal("group", group),
        module = quoted_literal("module", module),
        version = version_value(),
    )
}

/// A literal in matching quotes; one named group per quote character.
fn quoted_literal(name: &str, escaped: &str) -> String {
    format!(r#"(?:"(?P<{name}_dq>{escaped})"|'(?P<{name}_sq>{escaped})')"#)
}

/// Every accepted version expression. Quotes and braces must be balanced, so
/// each combination is its own alternative with its own capture group.
fn version_value() -> String {
    let braced = |n: usize, token: &str| {
        format!(
            r"\$?\{{{prefix}(?P<{group}>{token})\}}",
            prefix = PROPERTY_PREFIX,
            group = VERSION_GROUPS[n],
        )
    };
    let plain = |n: usize, token: &str| {
        format!(
            r"\$?{prefix}(?P<{group}>{token})",
            prefix = PROPERTY_PREFIX,
            group = VERSION_GROUPS[n],
        )
    };

    let alternatives = [
        format!("\"{}\"", braced(0, VERSION_TOKEN)),
        format!("\"{}\"", plain(1, VERSION_TOKEN)),
        format!("'{}'", braced(2, VERSION_TOKEN)),
        format!("'{}'", plain(3, VERSION_TOKEN)),
        braced(4, VERSION_TOKEN),
        plain(5, BARE_VERSION_TOKEN),
    ];
    format!("(?:{})", alternatives.join("|"))
}

fn first_span(caps: &Captures<'_>, names: &[&str]) -> Option<Range<usize>> {
    names.iter().find_map(|name| caps.name(name)).map(|m| m.range())
}

fn version_span(caps: &Captures<'_>) -> Option<Range<usize>> {
    first_span(caps, &VERSION_GROUPS)
}

/// Append ` // Latest version: X`, keeping the line terminator last.
fn append_trace(line: &str, version: &str) -> String {
    let (body, ending) = split_line_ending(line);
    format!("{} // Latest version: {}{}", body, version, ending)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(from: &str, to: &str) -> ArtifactRule {
        ArtifactRule::new(from, to).unwrap()
    }

    #[test]
    fn variable_name_is_camel_cased_module() {
        assert_eq!(version_variable_name("lib"), "libVersion");
        assert_eq!(version_variable_name("appcompat-v7"), "appcompatV7Version");
        assert_eq!(
            version_variable_name("recyclerview-selection"),
            "recyclerviewSelectionVersion"
        );
        assert_eq!(version_variable_name("Core_KTX"), "core_ktxVersion");
        assert_eq!(version_variable_name("legacy-support-CORE-ui"), "legacySupportCoreUiVersion");
    }

    #[test]
    fn target_is_split_on_last_colon() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        assert_eq!(rule.target_version(), "2.0.0");
        assert_eq!(rule.target().group, "com.new");
        assert_eq!(rule.target().module, "lib");
        assert_eq!(rule.version_variable(), "libVersion");
    }

    #[test]
    fn malformed_rows_are_rejected() {
        assert!(ArtifactRule::new("com.old", "com.new:lib:1.0").is_err());
        assert!(ArtifactRule::new("com.old:lib", "com.new").is_err());
        assert!(ArtifactRule::new("com.old:lib", "com.new:lib:").is_err());
    }

    #[test]
    fn coordinate_form_rewrites_braced_placeholder() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        let out = rule
            .rewrite("    implementation \"com.old:lib:${libVersion}\"\n")
            .unwrap();
        assert_eq!(
            out,
            "    implementation \"com.new:lib:${libVersion}\" // Latest version: 2.0.0\n"
        );
    }

    #[test]
    fn coordinate_form_uses_destination_module_for_variable() {
        let rule = rule(
            "com.android.support:appcompat-v7",
            "androidx.appcompat:appcompat:1.0.0",
        );
        let out = rule
            .rewrite("implementation \"com.android.support:appcompat-v7:$rootProject.ext.supportVersion\", {")
            .unwrap();
        assert_eq!(
            out,
            "implementation \"androidx.appcompat:appcompat:$rootProject.ext.appcompatVersion\", { // Latest version: 1.0.0"
        );
    }

    #[test]
    fn keyword_form_preserves_quotes() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        let out = rule
            .rewrite("compile group: 'com.old', name: 'lib', version: \"$libVersion\"\n")
            .unwrap();
        assert_eq!(
            out,
            "compile group: 'com.new', name: 'lib', version: \"$libVersion\" // Latest version: 2.0.0\n"
        );
    }

    #[test]
    fn keyword_form_accepts_braces_prefixes_and_bare_values() {
        let rule = rule(
            "com.android.support:design",
            "com.google.android.material:material:1.0.0",
        );

        let braced = rule
            .rewrite("api group: \"com.android.support\", name: \"design\", version: \"${ext.designVer}\"")
            .unwrap();
        assert_eq!(
            braced,
            "api group: \"com.google.android.material\", name: \"material\", version: \"${ext.materialVersion}\" // Latest version: 1.0.0"
        );

        let bare = rule
            .rewrite("api(group: 'com.android.support', name: 'design', version: designVer)")
            .unwrap();
        assert_eq!(
            bare,
            "api(group: 'com.google.android.material', name: 'material', version: materialVersion) // Latest version: 1.0.0"
        );
    }

    #[test]
    fn keyword_form_requires_matching_quotes() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        assert_eq!(rule.rewrite("group: 'com.old\", name: 'lib', version: '1.0'"), None);
        assert_eq!(rule.rewrite("group: 'com.old', name: 'lib', version: \"${v}'"), None);
    }

    #[test]
    fn literal_versions_do_not_match_coordinate_form() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        assert_eq!(rule.rewrite("implementation 'com.old:lib:1.2.3'"), None);
        assert_eq!(rule.rewrite("implementation 'com.other:lib:${v}'"), None);
    }

    #[test]
    fn every_occurrence_on_the_line_is_rewritten_once_traced() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        let out = rule
            .rewrite("deps = ['com.old:lib:$v', 'com.old:lib:${w}']\r\n")
            .unwrap();
        assert_eq!(
            out,
            "deps = ['com.new:lib:$libVersion', 'com.new:lib:${libVersion}'] // Latest version: 2.0.0\r\n"
        );
    }

    #[test]
    fn source_version_is_ignored_for_matching() {
        let rule = rule("com.old:lib:1.0", "com.new:lib:2.0.0");
        assert_eq!(rule.source().version.as_deref(), Some("1.0"));
        assert!(rule.rewrite("implementation \"com.old:lib:$libVer\"").is_some());
    }

    #[test]
    fn matches_reports_placeholder_token() {
        let rule = rule("com.old:lib", "com.new:lib:2.0.0");
        let found = rule
            .matches(Path::new("app/build.gradle"), "implementation \"com.old:lib:${ext.oldLib}\"", 7)
            .unwrap();
        assert_eq!(found.variable, "oldLib");
        assert_eq!(found.target_variable, "libVersion");
        assert_eq!(found.version, "2.0.0");
        assert_eq!(found.line, 7);
        assert_eq!(found.file, "app/build.gradle");

        let keyword = rule
            .matches(Path::new("build.gradle"), "group: 'com.old', name: 'lib', version: '1.4'", 2)
            .unwrap();
        assert_eq!(keyword.variable, "1.4");

        assert!(rule.matches(Path::new("build.gradle"), "apply plugin: 'java'", 1).is_none());
    }
}
