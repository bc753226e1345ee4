#![deny(missing_docs)]

//! # OpenAPI HTTP Service
//!
//! Serves a single Swagger document over HTTP with media-type
//! negotiation, SHA-512 ETags, conditional GET, and in-memory caching
//! through the pull-based cache graph:
//!
//! ```text
//! StaticSource(marshal) -> Replaceable(json) -> Transformer(proto) -> Replaceable(proto)
//! ```
//!
//! `update`/`update_lazy` swap the JSON source; the protobuf and ETag
//! stages are anchored on the JSON node and refresh on their own. A
//! build failure surfaces as 503 only while the cache is cold; later
//! failures fall through to the last good bytes.

pub mod negotiate;
pub mod proto;
pub mod v3;

pub use negotiate::{first_acceptable, parse_accept, AcceptClause};
pub use proto::{IdentityProto, ProtoEncoder};
pub use v3::OpenApiV3Service;

use crate::cache::{CacheError, CacheResult, Node, Replaceable, StaticSource, Transformer, Value};
use crate::error::AppResult;
use crate::model::v2::Swagger;
use actix_web::http::header;
use actix_web::{middleware, web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tracing::warn;

/// JSON media type.
pub const MIME_JSON: &str = "application/json";

/// Protobuf media type of the v2 document.
pub const MIME_PB_V2: &str = "application/com.github.proto-openapi.spec.v2@v1.0+protobuf";

/// Double-quoted uppercase SHA-512 hex of the bytes.
pub fn compute_etag(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode_upper(Sha512::digest(bytes)))
}

/// Renders an HTTP date (IMF-fixdate).
pub(crate) fn http_date(when: DateTime<Utc>) -> String {
    when.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(crate) struct Stamp {
    etag: String,
    last_modified: DateTime<Utc>,
}

/// Tracks the last served etag so Last-Modified only advances when the
/// document actually changes.
#[derive(Default)]
pub(crate) struct StampCell(Mutex<Option<Stamp>>);

impl StampCell {
    /// Returns the Last-Modified for `etag`, advancing it only when the
    /// etag differs from the previously served one.
    pub(crate) fn touch(&self, etag: &str) -> DateTime<Utc> {
        let mut stamp = self.0.lock();
        match &*stamp {
            Some(current) if current.etag == etag => current.last_modified,
            _ => {
                let now = Utc::now();
                *stamp = Some(Stamp {
                    etag: etag.to_string(),
                    last_modified: now,
                });
                now
            }
        }
    }
}

/// A factory producing the document to serve.
pub type SpecFactory = Box<dyn FnOnce() -> AppResult<Swagger> + Send>;

/// Serves one Swagger document with caching and negotiation.
pub struct OpenApiService {
    json: Arc<Replaceable<Vec<u8>>>,
    proto: Arc<Replaceable<Vec<u8>>>,
    update_lock: Mutex<()>,
    stamp: StampCell,
}

impl OpenApiService {
    /// Builds a service over an already-built document.
    pub fn new(spec: Swagger, encoder: Arc<dyn ProtoEncoder>) -> Arc<Self> {
        Self::new_lazy(Box::new(move || Ok(spec)), encoder)
    }

    /// Builds a service whose document is marshaled on first pull.
    pub fn new_lazy(factory: SpecFactory, encoder: Arc<dyn ProtoEncoder>) -> Arc<Self> {
        let json = Arc::new(Replaceable::new(json_source(factory)));

        let upstream: Arc<dyn Node<Vec<u8>>> = Arc::clone(&json) as Arc<dyn Node<Vec<u8>>>;
        let transformer = Transformer::new(
            move |up: CacheResult<Vec<u8>>| {
                let up = up?;
                let encoded = encoder
                    .encode(&up.data)
                    .map_err(|e| CacheError::new(e.to_string()))?;
                Ok(Value::new(encoded, up.etag))
            },
            upstream,
        );
        let proto = Arc::new(Replaceable::new(
            Arc::new(transformer) as Arc<dyn Node<Vec<u8>>>
        ));

        Arc::new(OpenApiService {
            json,
            proto,
            update_lock: Mutex::new(()),
            stamp: StampCell::default(),
        })
    }

    /// Replaces the served document.
    pub fn update(&self, spec: Swagger) {
        self.update_lazy(Box::new(move || Ok(spec)));
    }

    /// Replaces the served document with a lazily marshaled one.
    ///
    /// Updates are serialized; pulls outside the critical section keep
    /// succeeding with the prior value.
    pub fn update_lazy(&self, factory: SpecFactory) {
        let _guard = self.update_lock.lock();
        self.json.replace(json_source(factory));
    }

    /// Pulls the cached JSON bytes.
    pub fn get_json(&self) -> CacheResult<Vec<u8>> {
        self.json.get()
    }

    /// Pulls the cached protobuf bytes.
    pub fn get_proto(&self) -> CacheResult<Vec<u8>> {
        self.proto.get()
    }

    /// Answers one HTTP request against the cached document.
    pub fn respond(&self, req: &HttpRequest) -> HttpResponse {
        let accept = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        let Some(variant) = first_acceptable(accept, &[MIME_JSON, MIME_PB_V2]) else {
            return HttpResponse::NotAcceptable()
                .insert_header((header::VARY, "Accept"))
                .finish();
        };

        let pulled = if variant == MIME_JSON {
            self.get_json()
        } else {
            self.get_proto()
        };

        match pulled {
            Ok(value) => {
                let last_modified = self.stamp.touch(&value.etag);
                serve_cacheable(req, variant, &value, last_modified)
            }
            Err(error) => {
                warn!(%error, "OpenAPI cache build failed with no prior value");
                HttpResponse::ServiceUnavailable()
                    .insert_header((header::VARY, "Accept"))
                    .finish()
            }
        }
    }

    /// Registers the gzip-wrapped GET handler at `path`.
    pub fn configure(self: &Arc<Self>, path: &str) -> impl FnOnce(&mut web::ServiceConfig) {
        let service = Arc::clone(self);
        let path = path.to_string();
        move |cfg| {
            cfg.service(
                web::resource(path)
                    .app_data(web::Data::new(service))
                    .wrap(middleware::Compress::default())
                    .route(web::get().to(
                        |svc: web::Data<Arc<OpenApiService>>, req: HttpRequest| async move {
                            svc.respond(&req)
                        },
                    )),
            );
        }
    }
}

fn json_source(factory: SpecFactory) -> Arc<dyn Node<Vec<u8>>> {
    Arc::new(StaticSource::new(move || {
        let spec = factory().map_err(|e| CacheError::new(e.to_string()))?;
        let bytes = spec
            .to_json_bytes()
            .map_err(|e| CacheError::new(e.to_string()))?;
        let etag = compute_etag(&bytes);
        Ok(Value::new(bytes, etag))
    }))
}

/// Generic conditional-GET helper: honors `If-None-Match` and
/// `If-Modified-Since`, stamps `ETag`, `Last-Modified`, and
/// `Vary: Accept`.
pub(crate) fn serve_cacheable(
    req: &HttpRequest,
    content_type: &str,
    value: &Value<Vec<u8>>,
    last_modified: DateTime<Utc>,
) -> HttpResponse {
    let etag = value.etag.as_str();

    let if_none_match = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok());
    if let Some(candidates) = if_none_match {
        if candidates
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == etag || candidate == "*")
        {
            return HttpResponse::NotModified()
                .insert_header((header::ETAG, etag))
                .insert_header((header::VARY, "Accept"))
                .finish();
        }
    } else if let Some(since) = req
        .headers()
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|value| value.to_str().ok())
        .and_then(|text| DateTime::parse_from_rfc2822(text).ok())
    {
        if last_modified.timestamp() <= since.timestamp() {
            return HttpResponse::NotModified()
                .insert_header((header::ETAG, etag))
                .insert_header((header::VARY, "Accept"))
                .finish();
        }
    }

    HttpResponse::Ok()
        .content_type(content_type)
        .insert_header((header::ETAG, etag))
        .insert_header((header::LAST_MODIFIED, http_date(last_modified)))
        .insert_header((header::VARY, "Accept"))
        .body(value.data.as_ref().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_spec() -> Swagger {
        Swagger::from_json_value(json!({
            "swagger": "2.0",
            "info": {"title": "T", "version": "1"},
            "paths": {},
            "definitions": {"Pet": {"type": "object"}}
        }))
        .unwrap()
    }

    #[test]
    fn test_etag_is_quoted_sha512_of_json() {
        let service = OpenApiService::new(sample_spec(), Arc::new(IdentityProto));
        let value = service.get_json().unwrap();
        assert_eq!(value.etag, compute_etag(&value.data));
        assert!(value.etag.starts_with('"') && value.etag.ends_with('"'));
        assert_eq!(value.etag.len(), 128 + 2);
    }

    #[test]
    fn test_etag_stable_across_noop_update() {
        let service = OpenApiService::new(sample_spec(), Arc::new(IdentityProto));
        let first = service.get_json().unwrap();
        let stamp = service.stamp.touch(&first.etag);

        service.update(sample_spec());
        let second = service.get_json().unwrap();
        assert_eq!(first.etag, second.etag);
        assert_eq!(service.stamp.touch(&second.etag), stamp);
    }

    #[test]
    fn test_proto_follows_json_update() {
        let service = OpenApiService::new(sample_spec(), Arc::new(IdentityProto));
        let before = service.get_proto().unwrap();

        let mut changed = sample_spec();
        changed
            .definitions
            .insert("Order".to_string(), crate::model::Schema::of_type("object"));
        service.update(changed);

        let after = service.get_proto().unwrap();
        assert_ne!(before.etag, after.etag);
        assert_ne!(before.data, after.data);
    }

    #[test]
    fn test_cold_failure_then_recovery() {
        let service = OpenApiService::new_lazy(
            Box::new(|| Err(crate::error::AppError::Malformed("broken".into()))),
            Arc::new(IdentityProto),
        );
        assert!(service.get_json().is_err());

        service.update(sample_spec());
        assert!(service.get_json().is_ok());
    }

    #[test]
    fn test_failed_update_keeps_serving_last_good() {
        let service = OpenApiService::new(sample_spec(), Arc::new(IdentityProto));
        let before = service.get_json().unwrap();

        service.update_lazy(Box::new(|| {
            Err(crate::error::AppError::Malformed("factory exploded".into()))
        }));
        let after = service.get_json().unwrap();
        assert_eq!(before.etag, after.etag);
        assert_eq!(before.data, after.data);
    }

    #[test]
    fn test_last_modified_advances_on_change() {
        let service = OpenApiService::new(sample_spec(), Arc::new(IdentityProto));
        let first = service.get_json().unwrap();
        let stamp_one = service.stamp.touch(&first.etag);

        let mut changed = sample_spec();
        changed.definitions.shift_remove("Pet");
        service.update(changed);
        let second = service.get_json().unwrap();
        assert_ne!(first.etag, second.etag);
        let stamp_two = service.stamp.touch(&second.etag);
        assert!(stamp_two >= stamp_one);
    }
}
