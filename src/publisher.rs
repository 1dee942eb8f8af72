//! Publisher API abstraction and its request/response types.
use async_trait::async_trait;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Google Play Developer API client.
pub mod google_play;

/// Content type for apk uploads.
pub const APK_MIME_TYPE: &str = "application/vnd.android.package-archive";

/// Remote operations needed to publish an apk on a track.
///
/// Every call is scoped to an application package. All calls except
/// `open_edit` operate on an edit returned by `open_edit`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn open_edit(&self, package_name: &str) -> Result<AppEdit>;
    async fn upload_apk(
        &self,
        package_name: &str,
        edit_id: &str,
        apk_path: &Path,
    ) -> Result<Apk>;
    async fn update_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: Track,
    ) -> Result<Track>;
    async fn commit_edit(
        &self,
        package_name: &str,
        edit_id: &str,
    ) -> Result<AppEdit>;
    async fn delete_edit(&self, package_name: &str, edit_id: &str)
    -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// An in-progress edit session.
pub struct AppEdit {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// An uploaded apk, as accepted by the server.
pub struct Apk {
    pub version_code: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Release notes text for one language.
pub struct LocalizedText {
    pub language: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseStatus {
    /// Rolled out to every user of the track.
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Builder, Serialize, Deserialize)]
#[builder(setter(into))]
#[serde(rename_all = "camelCase")]
/// A release on a track.
pub struct TrackRelease {
    #[serde(default)]
    pub name: String,
    pub status: ReleaseStatus,
    /// Version codes as decimal strings, the API's int64 encoding.
    #[serde(default)]
    pub version_codes: Vec<String>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub release_notes: Vec<LocalizedText>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A track and the releases assigned to it.
pub struct Track {
    pub track: String,
    #[serde(default)]
    pub releases: Vec<TrackRelease>,
}
