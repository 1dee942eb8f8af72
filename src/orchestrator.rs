//! Drives one apk release through a Play edit session.
use derive_builder::Builder;
use log::*;
use std::{fmt, path::PathBuf};

use crate::{
    error::{Result, UploadError},
    publisher::{
        LocalizedText, Publisher, ReleaseStatus, Track, TrackReleaseBuilder,
    },
};

/// Name given to every release created by this tool.
pub const RELEASE_NAME: &str = "Automated upload";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseState {
    Start,
    EditOpened,
    ApkUploaded,
    TrackUpdated,
    Committed,
    Aborting,
    Aborted,
    AbortFailed,
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::EditOpened => "edit opened",
            Self::ApkUploaded => "apk uploaded",
            Self::TrackUpdated => "track updated",
            Self::Committed => "committed",
            Self::Aborting => "aborting",
            Self::Aborted => "aborted",
            Self::AbortFailed => "abort failed",
        };
        f.write_str(name)
    }
}

/// What to publish and where.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct ReleaseRequest {
    pub package_name: String,
    pub apk_path: PathBuf,
    pub track: String,
    #[builder(default)]
    pub release_notes: Vec<LocalizedText>,
}

impl ReleaseRequestBuilder {
    pub fn build(&self) -> Result<ReleaseRequest> {
        self._build().map_err(|e| {
            UploadError::configuration(format!(
                "Failed to build release request: {e}"
            ))
        })
    }
}

impl ReleaseRequest {
    pub fn builder() -> ReleaseRequestBuilder {
        ReleaseRequestBuilder::default()
    }
}

/// Result of a committed release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub edit_id: String,
    pub track: String,
    /// Version code as reported by the server.
    pub version_code: i64,
}

pub struct ReleaseOrchestrator<'a> {
    publisher: &'a dyn Publisher,
}

impl<'a> ReleaseOrchestrator<'a> {
    pub fn new(publisher: &'a dyn Publisher) -> Self {
        Self { publisher }
    }

    /// Open an edit, upload the apk, make it the sole release on the track
    /// and commit. Any failure after the edit is opened discards the edit.
    pub async fn publish(
        &self,
        request: &ReleaseRequest,
    ) -> Result<ReleaseOutcome> {
        let mut state = ReleaseState::Start;
        debug!("release state: {state}");

        info!("Initialising new edit...");
        let edit = self.publisher.open_edit(&request.package_name).await?;
        transition(&mut state, ReleaseState::EditOpened);
        info!("Edit created. Id: {}", edit.id);

        match self.run_edit(request, &edit.id, &mut state).await {
            Ok(outcome) => Ok(outcome),
            Err(cause) => {
                Err(self.abort(request, &edit.id, &mut state, cause).await)
            }
        }
    }

    async fn run_edit(
        &self,
        request: &ReleaseRequest,
        edit_id: &str,
        state: &mut ReleaseState,
    ) -> Result<ReleaseOutcome> {
        let package_name = request.package_name.as_str();

        info!("Uploading apk file...");
        let uploaded = self
            .publisher
            .upload_apk(package_name, edit_id, &request.apk_path)
            .await?;
        transition(state, ReleaseState::ApkUploaded);
        info!("Version code {} has been uploaded", uploaded.version_code);

        let release = TrackReleaseBuilder::default()
            .name(RELEASE_NAME)
            .status(ReleaseStatus::Completed)
            .version_codes(vec![uploaded.version_code.to_string()])
            .release_notes(request.release_notes.clone())
            .build()?;

        let track = Track {
            track: request.track.clone(),
            releases: vec![release],
        };

        info!("Updating track {}...", request.track);
        let updated = self
            .publisher
            .update_track(package_name, edit_id, track)
            .await?;
        transition(state, ReleaseState::TrackUpdated);
        info!("Track {} has been updated.", updated.track);

        info!("Committing edit...");
        let committed = self.publisher.commit_edit(package_name, edit_id).await?;
        transition(state, ReleaseState::Committed);
        info!("App edit with id {} has been committed", committed.id);

        Ok(ReleaseOutcome {
            edit_id: edit_id.to_string(),
            track: request.track.clone(),
            version_code: uploaded.version_code,
        })
    }

    /// Delete the edit once and wrap `cause` with the outcome.
    async fn abort(
        &self,
        request: &ReleaseRequest,
        edit_id: &str,
        state: &mut ReleaseState,
        cause: UploadError,
    ) -> UploadError {
        transition(state, ReleaseState::Aborting);
        warn!("release failed: {cause}");
        info!("Deleting edit {edit_id}...");

        match self
            .publisher
            .delete_edit(&request.package_name, edit_id)
            .await
        {
            Ok(()) => {
                transition(state, ReleaseState::Aborted);
                UploadError::EditDiscarded {
                    edit_id: edit_id.to_string(),
                    cause: Box::new(cause),
                }
            }
            Err(delete_error) => {
                transition(state, ReleaseState::AbortFailed);
                UploadError::AbortFailed {
                    edit_id: edit_id.to_string(),
                    cause: Box::new(cause),
                    delete_error: Box::new(delete_error),
                }
            }
        }
    }
}

fn transition(state: &mut ReleaseState, next: ReleaseState) {
    debug!("release state: {state} -> {next}");
    *state = next;
}
