//! Model round-trip and walker totality scenarios.

use openapi_kit::model::lint::lint_document;
use openapi_kit::model::v3::OpenApi;
use openapi_kit::walker::{collect_refs, walk_refs};
use openapi_kit::Swagger;
use pretty_assertions::assert_eq;
use serde_json::json;

fn pet_store() -> serde_json::Value {
    json!({
        "swagger": "2.0",
        "info": {
            "title": "Pet Store",
            "version": "1.0.0",
            "contact": {"name": "API team", "email": "api@example.com"},
            "x-audience": "public"
        },
        "basePath": "/api",
        "consumes": ["application/json"],
        "produces": ["application/json"],
        "securityDefinitions": {
            "api_key": {"type": "apiKey", "name": "X-API-Key", "in": "header"}
        },
        "security": [{"api_key": []}],
        "tags": [{"name": "pets", "description": "Pet operations"}],
        "paths": {
            "/pets": {
                "get": {
                    "operationId": "listPets",
                    "tags": ["pets"],
                    "parameters": [
                        {"name": "limit", "in": "query", "type": "integer",
                         "format": "int32"}
                    ],
                    "responses": {
                        "200": {
                            "description": "a list of pets",
                            "schema": {"type": "array",
                                       "items": {"$ref": "#/definitions/Pet"}}
                        },
                        "default": {"description": "error",
                                    "schema": {"$ref": "#/definitions/Error"}}
                    }
                },
                "post": {
                    "operationId": "createPet",
                    "parameters": [
                        {"name": "body", "in": "body", "required": true,
                         "schema": {"$ref": "#/definitions/Pet"}}
                    ],
                    "responses": {"201": {"description": "created"}}
                },
                "x-rate-limited": true
            },
            "/pets/{petId}": {
                "get": {
                    "operationId": "getPet",
                    "parameters": [
                        {"name": "petId", "in": "path", "required": true,
                         "type": "string"}
                    ],
                    "responses": {"200": {
                        "description": "one pet",
                        "schema": {"$ref": "#/definitions/Pet"}}}
                }
            }
        },
        "definitions": {
            "Pet": {
                "type": "object",
                "required": ["name"],
                "properties": {
                    "name": {"type": "string", "minLength": 1},
                    "tag": {"type": "string"},
                    "friends": {
                        "type": "array",
                        "items": {"$ref": "#/definitions/Pet"}
                    }
                },
                "x-storage": "v1"
            },
            "Error": {
                "type": "object",
                "properties": {
                    "code": {"type": "integer", "format": "int32"},
                    "message": {"type": "string"}
                }
            }
        }
    })
}

#[test]
fn full_document_round_trip() {
    let parsed = Swagger::from_json_value(pet_store()).unwrap();
    let emitted = parsed.to_json_value().unwrap();
    let reparsed = Swagger::from_json_value(emitted).unwrap();
    assert_eq!(parsed, reparsed);
}

#[test]
fn round_tripped_document_lints_clean() {
    let parsed = Swagger::from_json_value(pet_store()).unwrap();
    assert_eq!(lint_document(&parsed), Vec::new());
}

#[test]
fn walker_totality_with_sentinels() {
    let mut doc = Swagger::from_json_value(pet_store()).unwrap();
    let before = collect_refs(&doc);
    assert!(before.unresolved.is_empty());

    let mut n = 0usize;
    walk_refs(&mut doc, &mut |_: &str| {
        n += 1;
        Some(format!("#/definitions/Sentinel{}", n))
    });

    // Re-parse from bytes and scan: exactly the sentinel set remains.
    let bytes = doc.to_json_bytes().unwrap();
    let reparsed = Swagger::from_json_str(std::str::from_utf8(&bytes).unwrap()).unwrap();
    let mut found = collect_refs(&reparsed).refs;
    found.sort();
    let mut expected: Vec<String> = (1..=n)
        .map(|i| format!("#/definitions/Sentinel{}", i))
        .collect();
    expected.sort();
    assert_eq!(found, expected);
    assert_eq!(n, before.refs.len());
}

#[test]
fn yaml_and_json_decode_agree_modulo_extension_case() {
    let yaml = r#"
swagger: "2.0"
info:
  title: Case Study
  version: "1"
  x-Owner: infra
paths: {}
"#;
    let from_yaml = Swagger::from_yaml_str(yaml).unwrap();
    // YAML decoding lower-cases extension keys.
    assert!(from_yaml.info.as_ref().unwrap().extensions.get("x-owner").is_some());

    let json_text = r#"{
        "swagger": "2.0",
        "info": {"title": "Case Study", "version": "1", "x-Owner": "infra"},
        "paths": {}
    }"#;
    let from_json = Swagger::from_json_str(json_text).unwrap();
    // JSON decoding preserves extension key case.
    assert!(from_json.info.as_ref().unwrap().extensions.get("x-Owner").is_some());
}

#[test]
fn v3_document_round_trip() {
    let raw = json!({
        "openapi": "3.0.0",
        "info": {"title": "Cluster", "version": "v1"},
        "servers": [{"url": "https://cluster.local"}],
        "paths": {
            "/apis/apps/v1": {"get": {"responses": {"200": {"description": "ok"}}}}
        },
        "components": {
            "schemas": {
                "Deployment": {
                    "type": "object",
                    "properties": {"replicas": {"type": "integer", "nullable": true}}
                }
            },
            "securitySchemes": {
                "bearer": {"type": "http", "scheme": "bearer"}
            }
        }
    });
    let parsed: OpenApi = serde_json::from_value(raw).unwrap();
    let emitted = serde_json::to_value(&parsed).unwrap();
    let reparsed: OpenApi = serde_json::from_value(emitted).unwrap();
    assert_eq!(parsed, reparsed);
}
