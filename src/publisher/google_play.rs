//! Implements the Publisher trait for the Google Play Developer API (v3)
use async_trait::async_trait;
use log::*;
use reqwest::{
    Body, Client, RequestBuilder, Response, Url,
    header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, de::DeserializeOwned};
use std::path::Path;
use tokio::fs::File;

use crate::{
    credentials::TokenProvider,
    error::{Result, UploadError},
    publisher::{APK_MIME_TYPE, Apk, AppEdit, Publisher, Track},
};

const API_PATH: [&str; 3] = ["androidpublisher", "v3", "applications"];
const UPLOAD_PATH: [&str; 4] =
    ["upload", "androidpublisher", "v3", "applications"];

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Google Play publisher using reqwest with bearer token authentication.
pub struct GooglePlay {
    base_url: Url,
    client: Client,
    auth: Box<dyn TokenProvider>,
}

impl GooglePlay {
    /// Create a client for the API rooted at `base_url`, identifying itself
    /// as `application_name` in the user agent.
    pub fn new(
        base_url: Url,
        auth: Box<dyn TokenProvider>,
        application_name: &str,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.append(
            USER_AGENT,
            HeaderValue::from_str(&user_agent(application_name))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url,
            client,
            auth,
        })
    }

    /// `base_url` extended by `root` and `segments`, each segment
    /// percent-encoded so values cannot change the path structure.
    fn api_url(&self, root: &[&str], segments: &[&str]) -> Result<Url> {
        for segment in segments {
            if matches!(*segment, "" | "." | "..") {
                return Err(UploadError::configuration(format!(
                    "invalid url path segment '{segment}'"
                )));
            }
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                UploadError::configuration(format!(
                    "API url {} cannot be a base",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend(root)
            .extend(segments);

        Ok(url)
    }

    fn edits_url(&self, package_name: &str) -> Result<Url> {
        self.api_url(&API_PATH, &[package_name, "edits"])
    }

    fn edit_url(&self, package_name: &str, edit_id: &str) -> Result<Url> {
        self.api_url(&API_PATH, &[package_name, "edits", edit_id])
    }

    fn track_url(
        &self,
        package_name: &str,
        edit_id: &str,
        track: &str,
    ) -> Result<Url> {
        self.api_url(&API_PATH, &[package_name, "edits", edit_id, "tracks", track])
    }

    fn commit_url(&self, package_name: &str, edit_id: &str) -> Result<Url> {
        // validate the id on its own before the action suffix is attached
        self.edit_url(package_name, edit_id)?;
        let action = format!("{edit_id}:commit");
        self.api_url(&API_PATH, &[package_name, "edits", action.as_str()])
    }

    fn upload_url(&self, package_name: &str, edit_id: &str) -> Result<Url> {
        let mut url =
            self.api_url(&UPLOAD_PATH, &[package_name, "edits", edit_id, "apks"])?;
        url.query_pairs_mut().append_pair("uploadType", "media");
        Ok(url)
    }

    /// Authorize and send `request`, turning non-success statuses into
    /// errors that name `operation`.
    async fn execute(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        let token = self.auth.access_token().await?;

        let response = request
            .bearer_auth(token.expose_secret())
            .send()
            .await
            .map_err(|err| {
                UploadError::remote(format!("{operation} failed: {err}"))
            })?;

        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .map(|err| err.error.message)
            .unwrap_or(body);

        Err(UploadError::remote(format!(
            "{operation} failed with status {status}: {message}"
        )))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(operation, request).await?;
        response.json::<T>().await.map_err(|err| {
            UploadError::remote(format!(
                "{operation} returned an invalid response: {err}"
            ))
        })
    }
}

#[async_trait]
impl Publisher for GooglePlay {
    async fn open_edit(&self, package_name: &str) -> Result<AppEdit> {
        let url = self.edits_url(package_name)?;
        debug!("POST {url}");
        let request = self.client.post(url).json(&serde_json::json!({}));
        self.execute_json("Create edit", request).await
    }

    async fn upload_apk(
        &self,
        package_name: &str,
        edit_id: &str,
        apk_path: &Path,
    ) -> Result<Apk> {
        let url = self.upload_url(package_name, edit_id)?;

        let file = File::open(apk_path)
            .await
            .map_err(|err| UploadError::package_parse(apk_path, err))?;
        let size = file
            .metadata()
            .await
            .map_err(|err| UploadError::package_parse(apk_path, err))?
            .len();

        debug!("POST {url} ({size} bytes)");
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, APK_MIME_TYPE)
            .header(CONTENT_LENGTH, size)
            .body(Body::from(file));
        self.execute_json("Upload apk", request).await
    }

    async fn update_track(
        &self,
        package_name: &str,
        edit_id: &str,
        track: Track,
    ) -> Result<Track> {
        let url = self.track_url(package_name, edit_id, &track.track)?;
        debug!("PUT {url}");
        let request = self.client.put(url).json(&track);
        self.execute_json("Update track", request).await
    }

    async fn commit_edit(
        &self,
        package_name: &str,
        edit_id: &str,
    ) -> Result<AppEdit> {
        let url = self.commit_url(package_name, edit_id)?;
        debug!("POST {url}");
        let request = self.client.post(url).header(CONTENT_LENGTH, 0);
        self.execute_json("Commit edit", request).await
    }

    async fn delete_edit(
        &self,
        package_name: &str,
        edit_id: &str,
    ) -> Result<()> {
        let url = self.edit_url(package_name, edit_id)?;
        debug!("DELETE {url}");
        let request = self.client.delete(url);
        self.execute("Delete edit", request).await?;
        Ok(())
    }
}

/// User agent prefixed with the app's display name, reduced to the visible
/// ASCII a header value accepts.
fn user_agent(application_name: &str) -> String {
    let product = format!(
        "{}/{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let name = application_name
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect::<String>();
    let name = name.trim();

    if name.is_empty() {
        product
    } else {
        format!("{name} {product}")
    }
}
