use std::sync::Arc;

use serde::{Deserialize, de::Deserializer};
use serde_json::Value;
use url::Url;

use crate::error::{Error, failed_metadata_load};

/// The fields of a `package.json` that take part in resolution. Every other
/// field of the file is ignored.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "deserialize_loose_string")]
    pub main: Option<String>,

    #[serde(default, rename = "type")]
    pub package_type: PackageType,

    // exports: "./index.js"
    // exports: { ".": { "require": "./index.cjs", "default": "./index.js" } }
    #[serde(default, deserialize_with = "deserialize_mapping_field")]
    pub exports: Option<Value>,

    // imports: { "#internal/": "./src/internal/" }
    #[serde(default, deserialize_with = "deserialize_mapping_field")]
    pub imports: Option<Value>,

    // default: [{ "require": "./index.cjs" }, "./index.js"]
    #[serde(default, deserialize_with = "deserialize_mapping_field")]
    pub default: Option<Value>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PackageType {
    Module,
    #[default]
    CommonJs,
}

impl<'de> Deserialize<'de> for PackageType {
    fn deserialize<D>(d: D) -> Result<PackageType, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Unknown values are ignored so that newer package types don't break lookups
        match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) if s == "module" => Ok(PackageType::Module),
            _ => Ok(PackageType::CommonJs),
        }
    }
}

impl PackageMetadata {
    pub fn from_json_str(package_json: &Url, content: &str) -> Result<PackageMetadata, Error> {
        serde_json::from_str(content)
            .map_err(|err| failed_metadata_load(package_json, format!("Invalid package.json: {err}")))
    }
}

/// A directory holding a `package.json`, together with its parsed content.
#[derive(Clone, Debug, PartialEq)]
pub struct PackageBoundary {
    /// Directory URL, always slash-terminated.
    pub root: Url,
    pub metadata: Arc<PackageMetadata>,
}

impl PackageBoundary {
    pub fn package_json_url(&self) -> Url {
        self.root.join("package.json").unwrap_or_else(|_| self.root.clone())
    }
}

fn deserialize_loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

/// `null` is treated the same as an absent field.
fn deserialize_mapping_field<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => Ok(Some(value)),
    }
}
