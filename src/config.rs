//! Validated upload configuration built from CLI arguments.
use std::{fmt::Display, path::PathBuf};
use url::Url;

use crate::{
    cli::{Args, localize},
    error::{Result, UploadError},
};

/// Language tag attached to release notes unless overridden.
pub const DEFAULT_LOCALE: &str = "en-US";
/// Google Play Developer API root.
pub const DEFAULT_API_URL: &str = "https://androidpublisher.googleapis.com/";

/// Where release notes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesSource {
    Empty,
    Inline(String),
    File(PathBuf),
}

/// Immutable configuration for a single upload run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Service account JSON key.
    pub key_path: PathBuf,
    /// Display name override, never empty when set.
    pub app_name: Option<String>,
    pub apk_path: PathBuf,
    pub track: String,
    pub notes: NotesSource,
    /// Language tag for release notes.
    pub locale: String,
    /// Publisher API base url, always ending in `/`.
    pub api_url: Url,
}

impl TryFrom<Args> for Config {
    type Error = UploadError;

    fn try_from(args: Args) -> Result<Self> {
        require_value("--key", &args.key.to_string_lossy())?;
        require_value("--apk", &args.apk.to_string_lossy())?;
        require_value("--track", &args.track)?;
        require_value("--locale", &args.locale)?;

        let notes = match (args.notes, args.notes_file) {
            (Some(_), Some(_)) => {
                let flags: [&dyn Display; 2] = [&"--notes", &"--notes-file"];
                return Err(UploadError::configuration(localize(
                    "option '{}' cannot be used with '{}'",
                )(&flags)));
            }
            (None, Some(path)) => NotesSource::File(path),
            (Some(text), None) => NotesSource::Inline(text),
            (None, None) => NotesSource::Empty,
        };

        Ok(Self {
            key_path: args.key,
            app_name: args.name.filter(|name| !name.is_empty()),
            apk_path: args.apk,
            track: args.track,
            notes,
            locale: args.locale,
            api_url: parse_api_url(&args.api_url)?,
        })
    }
}

fn require_value(flag: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        let flag: [&dyn Display; 1] = [&flag];
        return Err(UploadError::configuration(localize(
            "option '{}' must not be empty",
        )(&flag)));
    }
    Ok(())
}

/// Parse the API base url, adding the trailing slash `Url::join` relies on.
fn parse_api_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|err| {
        UploadError::configuration(format!("invalid --api-url '{raw}': {err}"))
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
