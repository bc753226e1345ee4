//! Serves a merged OpenAPI v2 document on `/openapi/v2`.
//!
//! Two partial documents with a conflicting `Pet` definition are merged
//! in rename mode, then served with negotiation, ETags, and gzip.
//!
//! ```text
//! OPENAPI_DEMO_BIND=127.0.0.1:8080 cargo run --example serve_openapi
//! curl -v http://127.0.0.1:8080/openapi/v2
//! ```

use actix_web::{App, HttpServer};
use openapi_kit::{merge, IdentityProto, MergeMode, OpenApiService, Swagger};
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;

fn pets_part() -> Swagger {
    Swagger::from_json_value(json!({
        "swagger": "2.0",
        "info": {"title": "Demo API", "version": "1.0"},
        "paths": {
            "/pets": {"get": {"operationId": "listPets",
                "responses": {"200": {"description": "ok",
                    "schema": {"$ref": "#/definitions/Pet"}}}}}
        },
        "definitions": {
            "Pet": {"type": "object",
                    "properties": {"name": {"type": "string"}}}
        }
    }))
    .expect("static document")
}

fn orders_part() -> Swagger {
    Swagger::from_json_value(json!({
        "swagger": "2.0",
        "paths": {
            "/orders": {"get": {"operationId": "listOrders",
                "responses": {"200": {"description": "ok",
                    "schema": {"$ref": "#/definitions/Pet"}}}}}
        },
        "definitions": {
            "Pet": {"type": "object",
                    "properties": {"id": {"type": "integer"}}}
        }
    }))
    .expect("static document")
}

fn resolve_bind_addr() -> String {
    std::env::var("OPENAPI_DEMO_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut merged = pets_part();
    merge(&mut merged, &orders_part(), MergeMode::RenameOnConflict)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;

    let service = OpenApiService::new(merged, Arc::new(IdentityProto));

    let listener = TcpListener::bind(resolve_bind_addr())?;
    println!("serving on http://{}/openapi/v2", listener.local_addr()?);

    HttpServer::new(move || App::new().configure(service.configure("/openapi/v2")))
        .listen(listener)?
        .run()
        .await
}
