//! CLI argument parsing.
use clap::{CommandFactory, Parser, error::ErrorKind};
use std::{ffi::OsString, fmt::Display, path::PathBuf};

use crate::{
    config::{DEFAULT_API_URL, DEFAULT_LOCALE},
    error::{Result, UploadError},
};

/// Formats a message template, substituting `{}` placeholders in order.
pub type Localizer = Box<dyn Fn(&[&dyn Display]) -> String>;

/// Build a [`Localizer`] for `template`.
///
/// Surplus placeholders are left as-is and surplus arguments are ignored.
pub fn localize(template: &'static str) -> Localizer {
    Box::new(move |args| {
        let mut parts = template.split("{}");
        let mut out = parts.next().unwrap_or_default().to_string();
        let mut args = args.iter();
        for part in parts {
            match args.next() {
                Some(arg) => out.push_str(&arg.to_string()),
                None => out.push_str("{}"),
            }
            out.push_str(part);
        }
        out
    })
}

/// Uploads an apk to a Google Play release track.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "PATH")]
    /// JSON key file of an authorized service account.
    pub key: PathBuf,

    #[arg(long)]
    /// App name on Play Store. Defaults to the name in the apk.
    pub name: Option<String>,

    #[arg(long, value_name = "PATH")]
    /// The apk file to upload.
    pub apk: PathBuf,

    #[arg(long)]
    /// Release track to use, e.g. alpha, beta, production.
    pub track: String,

    #[arg(long, conflicts_with = "notes_file")]
    /// Release notes.
    pub notes: Option<String>,

    #[arg(long, value_name = "PATH", conflicts_with = "notes")]
    /// Release notes read from a file.
    pub notes_file: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_LOCALE)]
    /// Language tag attached to the release notes.
    pub locale: String,

    #[arg(long, default_value = DEFAULT_API_URL)]
    /// Google Play Developer API base url.
    pub api_url: String,

    #[arg(long, default_value_t = false)]
    /// Enable debug logging.
    pub debug: bool,
}

/// Parse process arguments, printing usage to stderr on failure.
///
/// `--help` and `--version` print and exit the process.
pub fn parse_args<I, T>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    let result = if args.len() < 2 {
        let no_args: [&dyn Display; 0] = [];
        Err(localize("No arguments given")(&no_args))
    } else {
        Args::try_parse_from(args).map_err(|err| {
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) {
                err.exit();
            }
            err.to_string()
        })
    };

    result.map_err(|msg| {
        eprintln!("Invalid arguments.");
        eprintln!("{}", msg.trim_end());
        eprintln!("Options:");
        eprintln!("{}", usage());
        UploadError::configuration(summary(&msg))
    })
}

/// Full help text for the command.
pub fn usage() -> String {
    Args::command().render_help().to_string()
}

/// Collapse a parser message into one line, dropping its usage footer.
fn summary(msg: &str) -> String {
    let line = msg
        .lines()
        .take_while(|line| !line.starts_with("Usage:"))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");

    line.strip_prefix("error: ").unwrap_or(&line).to_string()
}
