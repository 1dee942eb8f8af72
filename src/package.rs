//! Apk metadata extraction.
//!
//! An apk is a zip archive. The package identifier and version live in the
//! compiled `AndroidManifest.xml`; the display name is the application label,
//! which usually points into `resources.arsc`. The manifest is decoded with
//! `axmldecoder`; the resource table lookup is local.
use log::*;
use std::{
    fs::File,
    io::{Read, Seek},
    path::Path,
};
use zip::{ZipArchive, result::ZipError};

use crate::error::{Result, UploadError};

mod chunk;
mod manifest;
mod resources;

use manifest::{AttributeValue, Manifest};
use resources::ResourceTable;

const MANIFEST_ENTRY: &str = "AndroidManifest.xml";
const RESOURCES_ENTRY: &str = "resources.arsc";

/// Metadata describing an apk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageMetadata {
    /// Application label.
    pub name: String,
    /// Package identifier, e.g. `com.example.app`.
    pub package_name: String,
    pub version_code: i64,
    pub version_name: String,
}

impl PackageMetadata {
    /// Name to publish under: a non-empty `override_name`, else the label.
    pub fn display_name<'a>(&'a self, override_name: Option<&'a str>) -> &'a str {
        match override_name {
            Some(name) if !name.is_empty() => name,
            _ => &self.name,
        }
    }
}

/// Read package metadata from the apk at `path`.
///
/// The archive is open only for the duration of this call.
pub fn read_metadata(path: &Path) -> Result<PackageMetadata> {
    let file =
        File::open(path).map_err(|err| UploadError::package_parse(path, err))?;
    let mut archive = ZipArchive::new(file).map_err(|err| {
        UploadError::package_parse(path, format!("not a valid apk: {err}"))
    })?;

    let manifest_data = read_entry(&mut archive, MANIFEST_ENTRY)
        .map_err(|err| UploadError::package_parse(path, err))?
        .ok_or_else(|| {
            UploadError::package_parse(path, format!("missing {MANIFEST_ENTRY}"))
        })?;

    let manifest = Manifest::parse(&manifest_data).map_err(|err| {
        UploadError::package_parse(path, format!("invalid {MANIFEST_ENTRY}: {err}"))
    })?;

    let resources = read_entry(&mut archive, RESOURCES_ENTRY)
        .map_err(|err| UploadError::package_parse(path, err))?
        .map(|data| ResourceTable::parse(&data))
        .transpose()
        .map_err(|err| {
            UploadError::package_parse(
                path,
                format!("invalid {RESOURCES_ENTRY}: {err}"),
            )
        })?;

    let name = resolve_text(manifest.label.as_ref(), resources.as_ref())
        .unwrap_or_else(|| {
            debug!("no application label found, using package name");
            manifest.package_name.clone()
        });

    let version_name =
        resolve_text(manifest.version_name.as_ref(), resources.as_ref())
            .unwrap_or_default();

    Ok(PackageMetadata {
        name,
        package_name: manifest.package_name,
        version_code: manifest.version_code as i64,
        version_name,
    })
}

fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> std::result::Result<Option<Vec<u8>>, String> {
    match archive.by_name(name) {
        Ok(mut entry) => {
            let mut data = vec![];
            entry
                .read_to_end(&mut data)
                .map_err(|err| format!("failed to read {name}: {err}"))?;
            Ok(Some(data))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(format!("failed to read {name}: {err}")),
    }
}

/// Turn an attribute into text, resolving resource references when a
/// resource table is available.
fn resolve_text(
    value: Option<&AttributeValue>,
    resources: Option<&ResourceTable>,
) -> Option<String> {
    let text = match value? {
        AttributeValue::String(text) => Some(text.clone()),
        AttributeValue::Reference(id) => {
            let resources = resources?;
            match resources.resolve_string(*id) {
                Ok(text) => text,
                Err(err) => {
                    warn!("failed to resolve resource {id:#010x}: {err}");
                    None
                }
            }
        }
    };

    text.filter(|text| !text.is_empty())
}
