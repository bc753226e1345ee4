#![deny(missing_docs)]

//! # OpenAPI v3 Document Model
//!
//! Typed representation of an OpenAPI v3 document. Schemas, path items,
//! and parameters reuse the shared types; references live under
//! `#/components/<kind>/<name>`.

use crate::error::{AppError, AppResult};
use crate::model::extensions::{lowercase_extension_keys, Extensions};
use crate::model::schema::Schema;
use crate::model::v2::{Info, Parameter, Paths, Response};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A complete OpenAPI v3 document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenApi {
    /// Version marker, e.g. `"3.0.0"`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub openapi: String,

    /// Document metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,

    /// Server list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,

    /// Path pattern to path item mapping.
    #[serde(default, skip_serializing_if = "Paths::is_empty")]
    pub paths: Paths,

    /// Reusable components.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl OpenApi {
    /// Parses a document from a JSON string.
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| AppError::Malformed(format!("invalid OpenAPI JSON: {}", e)))
    }

    /// Parses a document from YAML, lower-casing extension keys.
    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        let mut raw: JsonValue = serde_yaml::from_str(yaml)
            .map_err(|e| AppError::Malformed(format!("invalid OpenAPI YAML: {}", e)))?;
        lowercase_extension_keys(&mut raw);
        serde_json::from_value(raw)
            .map_err(|e| AppError::Malformed(format!("invalid OpenAPI value: {}", e)))
    }

    /// Serializes to canonical JSON bytes.
    pub fn to_json_bytes(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| AppError::Malformed(format!("failed to serialize OpenAPI: {}", e)))
    }
}

/// The `components` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Reusable named schemas.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub schemas: IndexMap<String, Schema>,

    /// Reusable named responses.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,

    /// Reusable named parameters.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,

    /// Security scheme declarations.
    #[serde(
        rename = "securitySchemes",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub security_schemes: IndexMap<String, SecuritySchemeV3>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A v3 security scheme declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecuritySchemeV3 {
    /// Scheme type: `apiKey`, `http`, `oauth2`, or `openIdConnect`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub scheme_type: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Header, query, or cookie parameter name (`apiKey`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `query`, `header`, or `cookie` (`apiKey`).
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// HTTP auth scheme name (`http`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,

    /// Bearer token format hint (`http`).
    #[serde(rename = "bearerFormat", skip_serializing_if = "Option::is_none")]
    pub bearer_format: Option<String>,

    /// OAuth2 flow objects, kept raw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<JsonValue>,

    /// OpenID Connect discovery URL.
    #[serde(rename = "openIdConnectUrl", skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A server entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL template.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Template variables.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A server URL template variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    /// Admitted values.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,

    /// Default value.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
