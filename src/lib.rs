//! Upload an Android apk to Google Play and release it on a track.
pub mod cli;
pub mod command;
pub mod config;
pub mod credentials;
pub mod error;
pub mod notes;
pub mod orchestrator;
pub mod package;
pub mod publisher;

pub use error::{Result, UploadError};

#[cfg(test)]
pub mod test_helpers;
