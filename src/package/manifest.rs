//! Reads the package attributes out of the compiled `AndroidManifest.xml`.
use axmldecoder::{Element, Node};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("{0}")]
    Decode(String),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {name} attribute '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// An attribute value as stored in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    String(String),
    /// Resource id to resolve through the resource table.
    Reference(u32),
}

impl AttributeValue {
    /// Decoded attributes arrive as text; references are rendered as
    /// `@<type>/0x<id>` or `@0x<id>`.
    fn from_text(text: &str) -> Self {
        text.strip_prefix('@')
            .map(|reference| reference.rsplit('/').next().unwrap_or(reference))
            .and_then(parse_hex)
            .map(AttributeValue::Reference)
            .unwrap_or_else(|| AttributeValue::String(text.to_string()))
    }
}

/// The manifest attributes needed to describe a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub package_name: String,
    pub version_code: u32,
    pub version_name: Option<AttributeValue>,
    pub label: Option<AttributeValue>,
}

impl Manifest {
    pub fn parse(data: &[u8]) -> Result<Self, ManifestError> {
        let document = axmldecoder::parse(data)
            .map_err(|err| ManifestError::Decode(err.to_string()))?;

        let manifest = match document.get_root() {
            Some(Node::Element(root)) if root.get_tag() == "manifest" => root,
            _ => return Err(ManifestError::Missing("manifest element")),
        };

        let package_name = attribute(manifest, "package")
            .ok_or(ManifestError::Missing("package attribute"))?
            .to_string();

        let version_code = attribute(manifest, "versionCode")
            .ok_or(ManifestError::Missing("versionCode attribute"))?;
        let version_code =
            parse_integer(version_code).ok_or_else(|| ManifestError::Invalid {
                name: "versionCode",
                value: version_code.to_string(),
            })?;

        let application =
            manifest.get_children().iter().find_map(|node| match node {
                Node::Element(element) if element.get_tag() == "application" => {
                    Some(element)
                }
                _ => None,
            });

        Ok(Self {
            package_name,
            version_code,
            version_name: attribute(manifest, "versionName")
                .map(AttributeValue::from_text),
            label: application
                .and_then(|application| attribute(application, "label"))
                .map(AttributeValue::from_text),
        })
    }
}

/// Look up `name` with or without its namespace prefix.
fn attribute<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element
        .get_attributes()
        .iter()
        .find(|(key, _)| {
            key.as_str() == name
                || key.rsplit_once(':').is_some_and(|(_, local)| local == name)
        })
        .map(|(_, value)| value.as_str())
}

fn parse_hex(text: &str) -> Option<u32> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

fn parse_integer(text: &str) -> Option<u32> {
    if text.starts_with("0x") || text.starts_with("0X") {
        parse_hex(text)
    } else {
        text.parse().ok()
    }
}
