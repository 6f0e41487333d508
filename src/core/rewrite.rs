//! Line-by-line file rewriting driven by the caller.
//!
//! The whole file is read and decoded before any output is opened. The caller
//! pulls lines with [`LineRewriter::next_line`], optionally answers with
//! [`LineRewriter::replace`], and the rewriter commits each decision in order.
//! Output is collected in memory. On [`LineRewriter::finish`] in apply mode a
//! changed file is staged next to its real location (symlinks resolved) and
//! renamed over it; unchanged files are never reopened. In dry-run mode the
//! output only lands in the report and the log.

use crate::classify::{FileKind, SourceRecord};
use crate::error::{Error, Result};
use crate::log::Logger;
use crate::utils::io;
use crate::utils::text::split_line_ending;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appended to every config file: turn on the namespace migration toggles.
pub const CONFIG_TRAILER: [&str; 2] = ["android.useAndroidX=true", "android.enableJetifier=true"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    Apply,
    DryRun,
}

#[derive(Debug, Clone)]
pub struct RewriteOptions {
    pub mode: WriteMode,
    pub config_trailer: Vec<String>,
}

impl RewriteOptions {
    pub fn new(mode: WriteMode) -> Self {
        Self {
            mode,
            config_trailer: CONFIG_TRAILER.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// A line handed to the caller. `text` keeps its terminator.
#[derive(Debug, Clone, Copy)]
pub struct Line<'l> {
    pub number: usize,
    pub text: &'l str,
}

/// What happened to one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: String,
    pub kind: FileKind,
    pub lines: usize,
    pub changed_lines: usize,
    pub appended: bool,
    /// Whether the file on disk was replaced.
    pub written: bool,
    /// Dry-run output text.
    #[serde(skip)]
    pub output: Option<String>,
}

/// Output staged in a sibling file; removed again unless published.
struct StagedFile {
    target: PathBuf,
    staging: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl StagedFile {
    /// Stage beside the file a symlink points to, so the link survives the rename.
    fn create(path: &Path) -> Result<Self> {
        let target = fs::canonicalize(path).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("resolve {}", path.display())))
        })?;
        let staging = io::staging_path(&target)?;
        let file = File::create(&staging).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("create {}", staging.display())))
        })?;

        Ok(Self {
            target,
            staging,
            writer: Some(BufWriter::new(file)),
        })
    }

    fn write(&mut self, text: &str) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(Error::internal_unexpected("write after publish"));
        };
        writer.write_all(text.as_bytes()).map_err(|e| {
            Error::internal_io(e.to_string(), Some(format!("write {}", self.staging.display())))
        })
    }

    fn publish(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Err(Error::internal_unexpected("staged file published twice"));
        };
        let context = |step: &str| Some(format!("{} {}", step, self.target.display()));

        let file = writer
            .into_inner()
            .map_err(|e| Error::internal_io(e.to_string(), context("flush")))?;
        file.sync_all()
            .map_err(|e| Error::internal_io(e.to_string(), context("sync")))?;
        drop(file);

        if let Ok(meta) = fs::metadata(&self.target) {
            fs::set_permissions(&self.staging, meta.permissions())
                .map_err(|e| Error::internal_io(e.to_string(), context("copy permissions of")))?;
        }

        fs::rename(&self.staging, &self.target)
            .map_err(|e| Error::internal_io(e.to_string(), context("replace")))
    }

    fn discard(&mut self) {
        self.writer = None;
        let _ = fs::remove_file(&self.staging);
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.writer.is_some() {
            self.discard();
        }
    }
}

pub struct LineRewriter<'a> {
    path: PathBuf,
    kind: FileKind,
    lines: Vec<String>,
    next: usize,
    pending: Option<usize>,
    replacement: Option<String>,
    mode: WriteMode,
    output: String,
    trailer: Vec<String>,
    /// Terminator used for lines this rewriter adds.
    newline: &'static str,
    changed: usize,
    at_line_start: bool,
    log: &'a Logger,
}

impl<'a> LineRewriter<'a> {
    /// Read and decode the whole file. Nothing is written until `finish`.
    pub fn open(record: &SourceRecord, options: &RewriteOptions, log: &'a Logger) -> Result<Self> {
        let text = io::read_utf8(&record.path)?;
        let lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        let newline = last_terminator(&lines);

        let trailer = match record.kind {
            FileKind::Config => options.config_trailer.clone(),
            FileKind::Source | FileKind::BuildFile => Vec::new(),
        };

        Ok(Self {
            path: record.path.clone(),
            kind: record.kind,
            lines,
            next: 0,
            pending: None,
            replacement: None,
            mode: options.mode,
            output: String::with_capacity(text.len()),
            trailer,
            newline,
            changed: 0,
            at_line_start: true,
            log,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Commit the previous line and hand out the next one.
    pub fn next_line(&mut self) -> Option<Line<'_>> {
        self.commit_pending();

        if self.next >= self.lines.len() {
            return None;
        }

        let idx = self.next;
        self.next += 1;
        self.pending = Some(idx);
        Some(Line {
            number: idx + 1,
            text: &self.lines[idx],
        })
    }

    /// Replacement for the line most recently returned by `next_line`.
    /// Has no effect when no line is waiting for a decision.
    pub fn replace(&mut self, text: impl Into<String>) {
        if self.pending.is_some() {
            self.replacement = Some(text.into());
        }
    }

    /// Drive the whole file through `decide`, then finish.
    pub fn rewrite_with<F>(mut self, mut decide: F) -> Result<FileOutcome>
    where
        F: FnMut(Line<'_>) -> Result<Option<String>>,
    {
        while let Some(line) = self.next_line() {
            if let Some(replacement) = decide(line)? {
                self.replace(replacement);
            }
        }
        self.finish()
    }

    /// Commit what is left, append the config trailer, publish the output if
    /// it differs from the file.
    ///
    /// Lines the caller never pulled are copied through unchanged.
    pub fn finish(mut self) -> Result<FileOutcome> {
        self.commit_pending();
        while self.next < self.lines.len() {
            let idx = self.next;
            self.next += 1;
            let line = std::mem::take(&mut self.lines[idx]);
            self.emit(&line);
        }

        let appended = !self.trailer.is_empty();
        if appended {
            let newline = self.newline;
            if !self.at_line_start {
                self.emit(newline);
            }
            for line in std::mem::take(&mut self.trailer) {
                self.emit(&line);
                self.emit(newline);
            }
        }

        let path = self.path.display().to_string();
        let text = std::mem::take(&mut self.output);
        let (written, output) = match self.mode {
            WriteMode::Apply if self.changed > 0 || appended => {
                let mut staged = StagedFile::create(&self.path)?;
                staged.write(&text)?;
                staged.publish()?;
                self.log.info(|| format!("Rewrote {} ({} lines changed)", path, self.changed));
                (true, None)
            }
            WriteMode::Apply => (false, None),
            WriteMode::DryRun => {
                self.log.raw(|| format!("--- {} (dry run) ---\n{}", path, text));
                (false, Some(text))
            }
        };

        Ok(FileOutcome {
            path,
            kind: self.kind,
            lines: self.lines.len(),
            changed_lines: self.changed,
            appended,
            written,
            output,
        })
    }

    fn commit_pending(&mut self) {
        let Some(idx) = self.pending.take() else {
            return;
        };

        match self.replacement.take() {
            Some(replacement) if replacement != self.lines[idx] => {
                self.changed += 1;
                self.emit(&replacement);
            }
            _ => {
                let line = std::mem::take(&mut self.lines[idx]);
                self.emit(&line);
                self.lines[idx] = line;
            }
        }
    }

    fn emit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.at_line_start = text.ends_with('\n');
        self.output.push_str(text);
    }
}

/// Terminator of the last terminated line, `\n` when there is none.
fn last_terminator(lines: &[String]) -> &'static str {
    match lines
        .iter()
        .rev()
        .map(|line| split_line_ending(line).1)
        .find(|ending| !ending.is_empty())
    {
        Some("\r\n") => "\r\n",
        _ => "\n",
    }
}
