//! The upload command: load inputs, then publish the apk.
//!
//! Everything local (credentials, apk metadata, release notes) is loaded and
//! validated before the first remote call is made.
use log::*;

use crate::{
    config::Config,
    credentials::{
        ANDROID_PUBLISHER_SCOPE, ServiceAccountAuthenticator,
        ServiceAccountCredentials,
    },
    error::Result,
    notes,
    orchestrator::{ReleaseOrchestrator, ReleaseOutcome, ReleaseRequest},
    package,
    publisher::google_play::GooglePlay,
};

/// Upload the configured apk and release it on the configured track.
pub async fn execute(config: &Config) -> Result<ReleaseOutcome> {
    info!("Loading account credentials...");
    let credentials = ServiceAccountCredentials::from_file(&config.key_path)?
        .scoped([ANDROID_PUBLISHER_SCOPE]);
    debug!("using service account {}", credentials.client_email());

    info!("Loading apk file information...");
    let metadata = package::read_metadata(&config.apk_path)?;
    info!("App Name: {}", metadata.name);
    info!("App Id: {}", metadata.package_name);
    info!("App Version Code: {}", metadata.version_code);
    info!("App Version Name: {}", metadata.version_name);

    info!("Loading release notes...");
    let release_notes = notes::load(&config.notes, &config.locale)?;

    info!("Initialising publisher service...");
    let app_name = metadata.display_name(config.app_name.as_deref());
    let authenticator = ServiceAccountAuthenticator::new(credentials)?;
    let publisher = GooglePlay::new(
        config.api_url.clone(),
        Box::new(authenticator),
        app_name,
    )?;

    let request = ReleaseRequest::builder()
        .package_name(metadata.package_name.as_str())
        .apk_path(config.apk_path.as_path())
        .track(config.track.as_str())
        .release_notes(release_notes)
        .build()?;

    let outcome = ReleaseOrchestrator::new(&publisher).publish(&request).await?;

    info!(
        "Version code {} released on track {}",
        outcome.version_code, outcome.track
    );

    Ok(outcome)
}
