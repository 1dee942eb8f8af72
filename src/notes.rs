//! Release notes loading.
use std::fs;

use crate::{
    config::NotesSource,
    error::{Result, UploadError},
    publisher::LocalizedText,
};

/// Load release notes for `locale` from `source`.
///
/// Yields at most one note. File contents are used verbatim.
pub fn load(source: &NotesSource, locale: &str) -> Result<Vec<LocalizedText>> {
    let text = match source {
        NotesSource::Empty => return Ok(vec![]),
        NotesSource::Inline(text) => text.clone(),
        NotesSource::File(path) => fs::read_to_string(path).map_err(|source| {
            UploadError::NotesRead {
                path: path.clone(),
                source,
            }
        })?,
    };

    Ok(vec![LocalizedText {
        language: locale.to_string(),
        text,
    }])
}
