#![deny(missing_docs)]

//! # Swagger 2.0 Document Model
//!
//! Typed representation of an OpenAPI v2 (Swagger) document with JSON and
//! YAML round-tripping.
//!
//! - `paths` is a flat object: keys beginning with `/` are path patterns,
//!   keys beginning with `x-` are extensions, anything else is ignored.
//! - `responses` keys are decimal status codes or the literal `default`.
//! - Vendor extensions are preserved verbatim on every object; on YAML
//!   decoding extension keys are lower-cased first.

use crate::error::{AppError, AppResult};
use crate::model::extensions::{lowercase_extension_keys, Extensions};
use crate::model::schema::Schema;
use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// A complete Swagger 2.0 document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Swagger {
    /// Version marker, always `"2.0"` for documents this crate emits.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub swagger: String,

    /// Document metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,

    /// Host serving the API.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Base path prepended to every path pattern.
    #[serde(rename = "basePath", skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,

    /// Transfer protocols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,

    /// Default consumed media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,

    /// Default produced media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,

    /// Path pattern to path item mapping (plus extensions).
    #[serde(default, skip_serializing_if = "Paths::is_empty")]
    pub paths: Paths,

    /// Reusable named schemas.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub definitions: IndexMap<String, Schema>,

    /// Reusable named parameters.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, Parameter>,

    /// Reusable named responses.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, Response>,

    /// Security scheme declarations.
    #[serde(
        rename = "securityDefinitions",
        default,
        skip_serializing_if = "IndexMap::is_empty"
    )]
    pub security_definitions: IndexMap<String, SecurityScheme>,

    /// Document-wide security requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<IndexMap<String, Vec<String>>>,

    /// Tag declarations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,

    /// Link to external documentation.
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl Swagger {
    /// Parses a document from a JSON string.
    pub fn from_json_str(json: &str) -> AppResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| AppError::Malformed(format!("invalid Swagger JSON: {}", e)))
    }

    /// Parses a document from an in-memory JSON value.
    pub fn from_json_value(value: JsonValue) -> AppResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| AppError::Malformed(format!("invalid Swagger value: {}", e)))
    }

    /// Parses a document from YAML, lower-casing extension keys.
    pub fn from_yaml_str(yaml: &str) -> AppResult<Self> {
        let mut raw: JsonValue = serde_yaml::from_str(yaml)
            .map_err(|e| AppError::Malformed(format!("invalid Swagger YAML: {}", e)))?;
        lowercase_extension_keys(&mut raw);
        Self::from_json_value(raw)
    }

    /// Serializes to a canonical JSON value (source-model key order).
    pub fn to_json_value(&self) -> AppResult<JsonValue> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Malformed(format!("failed to serialize Swagger: {}", e)))
    }

    /// Serializes to canonical JSON bytes.
    pub fn to_json_bytes(&self) -> AppResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| AppError::Malformed(format!("failed to serialize Swagger: {}", e)))
    }
}

/// The `info` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Terms-of-service URL.
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,

    /// Contact information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,

    /// License information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,

    /// API version string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// The `info.contact` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Contact name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// The `info.license` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// License name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// License URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Link to external documentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalDocs {
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Documentation URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// A tag declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Link to external documentation.
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,
    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// The flat `paths` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Paths {
    /// Path pattern (`/...`) to path item.
    pub paths: IndexMap<String, PathItem>,
    /// `x-` keys appearing alongside path patterns.
    pub extensions: Extensions,
}

impl Paths {
    /// True when neither paths nor extensions are present.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.extensions.is_empty()
    }
}

impl Serialize for Paths {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map =
            serializer.serialize_map(Some(self.paths.len() + self.extensions.0.len()))?;
        for (pattern, item) in &self.paths {
            map.serialize_entry(pattern, item)?;
        }
        for (key, value) in self.extensions.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Paths {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PathsVisitor;

        impl<'de> Visitor<'de> for PathsVisitor {
            type Value = Paths;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a paths object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Paths::default();
                while let Some(key) = access.next_key::<String>()? {
                    if key.starts_with('/') {
                        let item = access.next_value::<PathItem>()?;
                        out.paths.insert(key, item);
                    } else if key.starts_with("x-") {
                        let value = access.next_value::<JsonValue>()?;
                        out.extensions.insert(key, value);
                    } else {
                        let _ = access.next_value::<serde::de::IgnoredAny>()?;
                    }
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(PathsVisitor)
    }
}

/// One URL template's operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathItem {
    /// External path item reference.
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// GET operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// PUT operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// POST operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// DELETE operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// PATCH operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,

    /// Parameters shared by every operation under this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

impl PathItem {
    /// Iterates over the present operations in method order.
    pub fn operations(&self) -> impl Iterator<Item = (&'static str, &Operation)> {
        [
            ("get", self.get.as_ref()),
            ("put", self.put.as_ref()),
            ("post", self.post.as_ref()),
            ("delete", self.delete.as_ref()),
            ("options", self.options.as_ref()),
            ("head", self.head.as_ref()),
            ("patch", self.patch.as_ref()),
        ]
        .into_iter()
        .filter_map(|(m, op)| op.map(|op| (m, op)))
    }

    /// Iterates mutably over the present operations.
    pub fn operations_mut(&mut self) -> impl Iterator<Item = &mut Operation> {
        [
            self.get.as_mut(),
            self.put.as_mut(),
            self.post.as_mut(),
            self.delete.as_mut(),
            self.options.as_mut(),
            self.head.as_mut(),
            self.patch.as_mut(),
        ]
        .into_iter()
        .flatten()
    }
}

/// A single method+path endpoint description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Grouping tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Link to external documentation.
    #[serde(rename = "externalDocs", skip_serializing_if = "Option::is_none")]
    pub external_docs: Option<ExternalDocs>,

    /// Unique operation identifier.
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,

    /// Consumed media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub consumes: Vec<String>,

    /// Produced media types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub produces: Vec<String>,

    /// Transfer protocols.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schemes: Vec<String>,

    /// Operation parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,

    /// Status code to response mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Responses>,

    /// Marks the operation as deprecated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,

    /// Operation-level security requirements.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<IndexMap<String, Vec<String>>>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// The responses object: a default response plus decimal-code entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Responses {
    /// Response used for any undeclared status code.
    pub default: Option<Box<Response>>,
    /// Responses keyed by decimal status code.
    pub status_codes: IndexMap<u16, Response>,
    /// Vendor extensions.
    pub extensions: Extensions,
}

impl Serialize for Responses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.status_codes.len()
            + usize::from(self.default.is_some())
            + self.extensions.0.len();
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(default) = &self.default {
            map.serialize_entry("default", default)?;
        }
        for (code, response) in &self.status_codes {
            map.serialize_entry(&code.to_string(), response)?;
        }
        for (key, value) in self.extensions.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Responses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ResponsesVisitor;

        impl<'de> Visitor<'de> for ResponsesVisitor {
            type Value = Responses;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a responses object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Responses::default();
                while let Some(key) = access.next_key::<String>()? {
                    if key == "default" {
                        out.default = Some(Box::new(access.next_value::<Response>()?));
                    } else if let Ok(code) = key.parse::<u16>() {
                        out.status_codes.insert(code, access.next_value()?);
                    } else if key.starts_with("x-") {
                        out.extensions.insert(key, access.next_value::<JsonValue>()?);
                    } else {
                        return Err(serde::de::Error::custom(format!(
                            "response key '{}' is neither a status code nor 'default'",
                            key
                        )));
                    }
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(ResponsesVisitor)
    }
}

/// A single response description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Reference to a reusable response (`#/responses/<name>`).
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Body schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// Response header schemas.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, Schema>,

    /// Example payloads keyed by media type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<JsonValue>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A parameter, either body-carrying or inline-typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Reference to a reusable parameter (`#/parameters/<name>`).
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Parameter name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Location: `query`, `header`, `path`, `formData`, or `body`.
    #[serde(rename = "in", default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the parameter must be supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    /// Body schema (`in: body` only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    /// Inline type for simple parameters.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,

    /// Inline format for simple parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Element schema for `type: array` simple parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Array serialization style (`csv`, `ssv`, `tsv`, `pipes`, `multi`).
    #[serde(rename = "collectionFormat", skip_serializing_if = "Option::is_none")]
    pub collection_format: Option<String>,

    /// Default value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<JsonValue>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}

/// A security scheme declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityScheme {
    /// Scheme type: `basic`, `apiKey`, or `oauth2`.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub scheme_type: String,

    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Header or query parameter name (`apiKey`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `query` or `header` (`apiKey`).
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// OAuth2 flow kind.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    /// OAuth2 authorization endpoint.
    #[serde(rename = "authorizationUrl", skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,

    /// OAuth2 token endpoint.
    #[serde(rename = "tokenUrl", skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,

    /// OAuth2 scope descriptions.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub scopes: IndexMap<String, String>,

    /// Vendor extensions.
    #[serde(flatten)]
    pub extensions: Extensions,
}
