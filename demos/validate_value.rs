//! Validates a JSON value against a schema from the command line.
//!
//! ```text
//! cargo run --example validate_value -- schema.json value.json [old.json]
//! ```
//!
//! With a third argument the update path is taken: errors on unchanged
//! subtrees are downgraded to warnings.

use openapi_kit::model::Schema;
use openapi_kit::{Swagger, Validator};
use std::fs;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (schema_path, value_path, old_path) = match args.as_slice() {
        [schema, value] => (schema, value, None),
        [schema, value, old] => (schema, value, Some(old)),
        _ => {
            eprintln!("usage: validate_value <schema.json> <value.json> [old.json]");
            return ExitCode::from(2);
        }
    };

    let schema: Schema = match read_json(schema_path) {
        Ok(schema) => schema,
        Err(message) => {
            eprintln!("{}: {}", schema_path, message);
            return ExitCode::from(2);
        }
    };
    let value: serde_json::Value = match read_json(value_path) {
        Ok(value) => value,
        Err(message) => {
            eprintln!("{}: {}", value_path, message);
            return ExitCode::from(2);
        }
    };

    let root = Swagger::default();
    let validator = Validator::new(&root);

    let outcome = match old_path {
        None => validator.validate(&schema, &value),
        Some(old_path) => match read_json(old_path) {
            Ok(old) => validator.validate_update(&schema, &old, &value),
            Err(message) => {
                eprintln!("{}: {}", old_path, message);
                return ExitCode::from(2);
            }
        },
    };

    for warning in &outcome.warnings {
        println!("warning {}: {}", warning.path, warning.message);
    }
    for error in &outcome.errors {
        println!("error {}: {}", error.path, error.message);
    }

    if outcome.is_valid() {
        println!("valid");
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
