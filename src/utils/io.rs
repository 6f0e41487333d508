//! File I/O primitives with consistent error handling.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Read a whole file and decode it as strict UTF-8.
///
/// Invalid bytes are an error naming the line they occur on; nothing is
/// replaced or skipped.
pub fn read_utf8(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .map_err(|e| Error::internal_io(e.to_string(), Some(format!("read {}", path.display()))))?;

    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        Error::file_decode_failed(path, line, e.utf8_error().to_string())
    })
}

/// Sibling path a rewrite is staged in before it replaces `path`.
pub fn staging_path(path: &Path) -> Result<PathBuf> {
    let filename = path.file_name().ok_or_else(|| {
        Error::internal_io(
            format!("Invalid path: {}", path.display()),
            Some("stage rewrite".to_string()),
        )
    })?;

    Ok(path.with_file_name(format!("{}.nsmigrate.tmp", filename.to_string_lossy())))
}
