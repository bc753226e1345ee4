#![deny(missing_docs)]

//! # OpenAPI v3 HTTP Service
//!
//! Serves one OpenAPI v3 document per group-version plus a discovery
//! index. Each group-version owns an independent cache sub-graph (JSON
//! node, protobuf transformer, stamp), so updating one group-version
//! never invalidates the others.
//!
//! - `GET <prefix>` returns `{"paths": [<gv>, ...]}`.
//! - `GET <prefix>/<gv>` returns that group-version's document.

use crate::cache::{CacheError, CacheResult, Node, Replaceable, StaticSource, Transformer, Value};
use crate::error::AppResult;
use crate::model::v3::OpenApi;
use crate::serve::negotiate::first_acceptable;
use crate::serve::proto::ProtoEncoder;
use crate::serve::{compute_etag, serve_cacheable, StampCell, MIME_JSON};
use actix_web::http::header;
use actix_web::{middleware, web, HttpRequest, HttpResponse};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Protobuf media type of a v3 document.
pub const MIME_PB_V3: &str = "application/com.github.proto-openapi.spec.v3@v1.0+protobuf";

/// A factory producing one group-version's document.
pub type V3SpecFactory = Box<dyn FnOnce() -> AppResult<OpenApi> + Send>;

/// The discovery document listing served group-versions.
#[derive(Debug, Serialize)]
struct Discovery {
    paths: Vec<String>,
}

struct GroupVersionEntry {
    json: Arc<Replaceable<Vec<u8>>>,
    proto: Arc<Replaceable<Vec<u8>>>,
    update_lock: Mutex<()>,
    stamp: StampCell,
}

impl GroupVersionEntry {
    fn new(factory: V3SpecFactory, encoder: Arc<dyn ProtoEncoder>) -> Arc<Self> {
        let json = Arc::new(Replaceable::new(v3_json_source(factory)));
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
        Arc::new(GroupVersionEntry {
            json,
            proto,
            update_lock: Mutex::new(()),
            stamp: StampCell::default(),
        })
    }

    fn update(&self, factory: V3SpecFactory) {
        let _guard = self.update_lock.lock();
        self.json.replace(v3_json_source(factory));
    }

    fn respond(&self, req: &HttpRequest) -> HttpResponse {
        let accept = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        let Some(variant) = first_acceptable(accept, &[MIME_JSON, MIME_PB_V3]) else {
            return HttpResponse::NotAcceptable()
                .insert_header((header::VARY, "Accept"))
                .finish();
        };

        let pulled = if variant == MIME_JSON {
            self.json.get()
        } else {
            self.proto.get()
        };

        match pulled {
            Ok(value) => {
                let last_modified = self.stamp.touch(&value.etag);
                serve_cacheable(req, variant, &value, last_modified)
            }
            Err(error) => {
                warn!(%error, "group-version cache build failed with no prior value");
                HttpResponse::ServiceUnavailable()
                    .insert_header((header::VARY, "Accept"))
                    .finish()
            }
        }
    }
}

fn v3_json_source(factory: V3SpecFactory) -> Arc<dyn Node<Vec<u8>>> {
    Arc::new(StaticSource::new(move || {
        let spec = factory().map_err(|e| CacheError::new(e.to_string()))?;
        let bytes = spec
            .to_json_bytes()
            .map_err(|e| CacheError::new(e.to_string()))?;
        let etag = compute_etag(&bytes);
        Ok(Value::new(bytes, etag))
    }))
}

/// Serves per-group-version v3 documents and the discovery index.
pub struct OpenApiV3Service {
    encoder: Arc<dyn ProtoEncoder>,
    groups: RwLock<BTreeMap<String, Arc<GroupVersionEntry>>>,
    discovery_stamp: StampCell,
}

impl OpenApiV3Service {
    /// Builds an empty service.
    pub fn new(encoder: Arc<dyn ProtoEncoder>) -> Arc<Self> {
        Arc::new(OpenApiV3Service {
            encoder,
            groups: RwLock::new(BTreeMap::new()),
            discovery_stamp: StampCell::default(),
        })
    }

    /// Installs or replaces one group-version's document.
    pub fn update_group_version(&self, group_version: &str, spec: OpenApi) {
        self.update_group_version_lazy(group_version, Box::new(move || Ok(spec)));
    }

    /// Installs or replaces one group-version with a lazy factory.
    /// Other group-versions' caches are untouched.
    pub fn update_group_version_lazy(&self, group_version: &str, factory: V3SpecFactory) {
        let existing = self.groups.read().get(group_version).cloned();
        match existing {
            Some(entry) => entry.update(factory),
            None => {
                let entry = GroupVersionEntry::new(factory, Arc::clone(&self.encoder));
                self.groups
                    .write()
                    .insert(group_version.to_string(), entry);
            }
        }
    }

    /// Removes a group-version from the index.
    pub fn remove_group_version(&self, group_version: &str) {
        self.groups.write().remove(group_version);
    }

    /// The currently served group-versions, sorted.
    pub fn group_versions(&self) -> Vec<String> {
        self.groups.read().keys().cloned().collect()
    }

    /// Pulls one group-version's cached JSON bytes.
    pub fn get_group_version_json(&self, group_version: &str) -> Option<CacheResult<Vec<u8>>> {
        self.groups
            .read()
            .get(group_version)
            .map(|entry| entry.json.get())
    }

    /// Serializes the discovery document.
    pub fn discovery_bytes(&self) -> Value<Vec<u8>> {
        let discovery = Discovery {
            paths: self.group_versions(),
        };
        let bytes = serde_json::to_vec(&discovery).unwrap_or_else(|_| b"{\"paths\":[]}".to_vec());
        let etag = compute_etag(&bytes);
        Value::new(bytes, etag)
    }

    /// Answers a discovery request.
    pub fn respond_discovery(&self, req: &HttpRequest) -> HttpResponse {
        let accept = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        if first_acceptable(accept, &[MIME_JSON]).is_none() {
            return HttpResponse::NotAcceptable()
                .insert_header((header::VARY, "Accept"))
                .finish();
        }
        let value = self.discovery_bytes();
        let last_modified = self.discovery_stamp.touch(&value.etag);
        serve_cacheable(req, MIME_JSON, &value, last_modified)
    }

    /// Answers a per-group-version request.
    pub fn respond_group_version(&self, req: &HttpRequest, group_version: &str) -> HttpResponse {
        let entry = self.groups.read().get(group_version).cloned();
        match entry {
            Some(entry) => entry.respond(req),
            None => HttpResponse::NotFound().finish(),
        }
    }

    /// Registers the discovery and per-group-version GET handlers under
    /// `prefix` (conventionally `/openapi/v3`).
    pub fn configure(self: &Arc<Self>, prefix: &str) -> impl FnOnce(&mut web::ServiceConfig) {
        let service = Arc::clone(self);
        let prefix = prefix.trim_end_matches('/').to_string();
        move |cfg| {
            let data = web::Data::new(service);
            cfg.service(
                web::resource(prefix.clone())
                    .app_data(data.clone())
                    .wrap(middleware::Compress::default())
                    .route(web::get().to(
                        |svc: web::Data<Arc<OpenApiV3Service>>, req: HttpRequest| async move {
                            svc.respond_discovery(&req)
                        },
                    )),
            );
            cfg.service(
                web::resource(format!("{}/{{group_version:.*}}", prefix))
                    .app_data(data)
                    .wrap(middleware::Compress::default())
                    .route(web::get().to(
                        |svc: web::Data<Arc<OpenApiV3Service>>,
                         path: web::Path<String>,
                         req: HttpRequest| async move {
                            svc.respond_group_version(&req, &path.into_inner())
                        },
                    )),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::proto::IdentityProto;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn v3_spec(title: &str) -> OpenApi {
        serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": title, "version": "v1"},
            "paths": {}
        }))
        .unwrap()
    }

    #[test]
    fn test_discovery_lists_sorted_group_versions() {
        let service = OpenApiV3Service::new(Arc::new(IdentityProto));
        service.update_group_version("apps/v1", v3_spec("apps"));
        service.update_group_version("batch/v1", v3_spec("batch"));
        assert_eq!(
            service.group_versions(),
            vec!["apps/v1".to_string(), "batch/v1".to_string()]
        );
        let discovery = service.discovery_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&discovery.data).unwrap();
        assert_eq!(parsed["paths"], json!(["apps/v1", "batch/v1"]));
    }

    #[test]
    fn test_updating_one_gv_leaves_others_cached() {
        let service = OpenApiV3Service::new(Arc::new(IdentityProto));
        service.update_group_version("apps/v1", v3_spec("apps"));
        service.update_group_version("batch/v1", v3_spec("batch"));

        let apps_before = service.get_group_version_json("apps/v1").unwrap().unwrap();
        let batch_before = service.get_group_version_json("batch/v1").unwrap().unwrap();

        service.update_group_version("batch/v1", v3_spec("batch-changed"));

        let apps_after = service.get_group_version_json("apps/v1").unwrap().unwrap();
        let batch_after = service.get_group_version_json("batch/v1").unwrap().unwrap();
        assert_eq!(apps_before.etag, apps_after.etag);
        assert_ne!(batch_before.etag, batch_after.etag);
    }

    #[test]
    fn test_remove_group_version() {
        let service = OpenApiV3Service::new(Arc::new(IdentityProto));
        service.update_group_version("apps/v1", v3_spec("apps"));
        service.remove_group_version("apps/v1");
        assert!(service.group_versions().is_empty());
        assert!(service.get_group_version_json("apps/v1").is_none());
    }

    #[test]
    fn test_failed_gv_update_keeps_last_good() {
        let service = OpenApiV3Service::new(Arc::new(IdentityProto));
        service.update_group_version("apps/v1", v3_spec("apps"));
        let before = service.get_group_version_json("apps/v1").unwrap().unwrap();

        service.update_group_version_lazy(
            "apps/v1",
            Box::new(|| Err(crate::error::AppError::Malformed("bad factory".into()))),
        );
        let after = service.get_group_version_json("apps/v1").unwrap().unwrap();
        assert_eq!(before.etag, after.etag);
    }
}
