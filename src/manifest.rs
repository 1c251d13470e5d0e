//! Firmware manifest model.
//!
//! Manifests are read leniently: any JSON shape is accepted and missing or
//! oddly-typed fields fall back to defaults. Only the first build descriptor
//! is consulted.

use serde::Serialize;
use serde_json::Value;

use crate::error::LoadError;

/// Version shown when the manifest carries none.
pub const VERSION_FALLBACK: &str = "dev";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// The fields the status page displays, plus a few extras for `--details`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestSummary {
    pub version: String,
    pub chip_family: Option<String>,
    pub name: Option<String>,
    pub parts: Vec<BuildPart>,
}

/// One flash image of the first build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPart {
    pub path: String,
    pub offset: Option<u64>,
}

impl ManifestSummary {
    /// Parse a response body.
    ///
    /// A leading UTF-8 byte order mark is skipped. Fails only when the body
    /// is not JSON or is JSON `null`.
    pub fn from_slice(body: &[u8]) -> Result<Self, LoadError> {
        let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
        let value: Value = serde_json::from_slice(body)?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        if value.is_null() {
            return Err(LoadError::Malformed("manifest is null".into()));
        }

        let build = first_build(value);
        Ok(Self {
            version: display_text(value.get("version"))
                .unwrap_or_else(|| VERSION_FALLBACK.to_string()),
            chip_family: build
                .and_then(|b| b.get("chipFamily"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            name: value
                .get("name")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            parts: build.map(build_parts).unwrap_or_default(),
        })
    }
}

fn first_build(manifest: &Value) -> Option<&Value> {
    manifest
        .get("builds")
        .and_then(Value::as_array)
        .and_then(|builds| builds.first())
        .filter(|b| b.is_object())
}

/// Text for a field as the page would show it; falsy values count as absent.
fn display_text(value: Option<&Value>) -> Option<String> {
    let value = value?;
    let falsy = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    (!falsy).then(|| text_of(value))
}

/// String conversion matching what the page renders for a JSON value.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            // Integral floats print without a fractional part.
            Some(f) if n.is_f64() => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(text_of).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn build_parts(build: &Value) -> Vec<BuildPart> {
    build
        .get("parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| {
                    let path = part.get("path")?.as_str()?.to_owned();
                    Some(BuildPart {
                        path,
                        offset: part.get("offset").and_then(Value::as_u64),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
