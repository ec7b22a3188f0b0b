use std::fmt;

use jsonschema::error::{TypeKind, ValidationErrorKind};
use serde_json::Value;
use thiserror::Error;

/// A single way in which a document fails the package schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to load package schema: {0}")]
    Load(String),
    #[error("{}", join_violations(.0))]
    Invalid(Vec<Violation>),
}

impl SchemaError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            SchemaError::Invalid(violations) => violations,
            SchemaError::Load(_) => &[],
        }
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Checks a generic document and reports every violation it finds.
///
/// Returning `Err` means the engine itself could not run, not that the
/// document is invalid.
pub trait SchemaEngine {
    fn check(&self, document: &Value) -> Result<Vec<Violation>, SchemaError>;
}

/// Schema every gofile must satisfy, checked after YAML is converted to JSON.
pub const PACKAGE_SCHEMA: &str = r#"
{
  "type": "array",
  "$schema": "http://json-schema.org/draft-04/schema#",
  "description": "",
  "minItems": 1,
  "uniqueItems": true,
  "items": {
    "type": "object",
    "required": [
      "url"
    ],
    "properties": {
      "url": {
        "type": "string"
      }
    }
  }
}
"#;

/// JSON-Schema engine compiled from [`PACKAGE_SCHEMA`] (or a replacement
/// source), plus a rule rejecting repeated `url` values in distinct items.
#[derive(Debug, Clone)]
pub struct PackageSchema {
    source: String,
}

impl Default for PackageSchema {
    fn default() -> Self {
        Self::from_source(PACKAGE_SCHEMA)
    }
}

impl PackageSchema {
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    fn compile(&self) -> Result<jsonschema::Validator, SchemaError> {
        let schema: Value = serde_json::from_str(&self.source)
            .map_err(|err| SchemaError::Load(err.to_string()))?;
        jsonschema::validator_for(&schema).map_err(|err| SchemaError::Load(err.to_string()))
    }
}

impl SchemaEngine for PackageSchema {
    fn check(&self, document: &Value) -> Result<Vec<Violation>, SchemaError> {
        let compiled = self.compile()?;

        let mut violations: Vec<Violation> = compiled
            .iter_errors(document)
            .map(|error| {
                Violation::new(
                    instance_path(&error.instance_path.to_string()),
                    describe(&error),
                )
            })
            .collect();

        if let Value::Array(items) = document {
            check_unique_urls(items, &mut violations);
        }

        Ok(violations)
    }
}

const ROOT: &str = "(root)";

/// `/0/url` becomes `0.url`; the empty pointer becomes `(root)`.
fn instance_path(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        ROOT.to_string()
    } else {
        trimmed.replace('/', ".")
    }
}

fn describe(error: &jsonschema::ValidationError<'_>) -> String {
    match &error.kind {
        ValidationErrorKind::Type {
            kind: TypeKind::Single(expected),
        } => format!(
            "Invalid type. Expected: {expected}, given: {}",
            json_type(&error.instance)
        ),
        ValidationErrorKind::Required { property } => format!(
            "required property {} is missing",
            property.as_str().unwrap_or_default()
        ),
        ValidationErrorKind::MinItems { limit } => {
            format!("Array must have at least {limit} items")
        }
        ValidationErrorKind::UniqueItems => "array items must be unique".to_string(),
        _ => error.to_string(),
    }
}

// Fully equal items are already reported by `uniqueItems`.
fn check_unique_urls(items: &[Value], violations: &mut Vec<Violation>) {
    for (later, item) in items.iter().enumerate() {
        let Some(url) = item.get("url").and_then(Value::as_str) else {
            continue;
        };
        let first = items[..later].iter().position(|other| {
            other != item && other.get("url").and_then(Value::as_str) == Some(url)
        });
        if let Some(earlier) = first {
            violations.push(Violation::new(
                format!("{later}.url"),
                format!("duplicate url {url}, first declared at index {earlier}"),
            ));
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Runs a [`SchemaEngine`] over a document and folds its findings into a
/// single error.
pub struct Validator {
    engine: Box<dyn SchemaEngine>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::with_engine(PackageSchema::default())
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator").finish_non_exhaustive()
    }
}

impl Validator {
    pub fn with_engine(engine: impl SchemaEngine + 'static) -> Self {
        Self {
            engine: Box::new(engine),
        }
    }

    pub fn validate(&self, document: &Value) -> Result<(), SchemaError> {
        let violations = self.engine.check(document)?;
        if violations.is_empty() {
            return Ok(());
        }

        for violation in &violations {
            tracing::error!("The document is not valid - {violation}.");
        }
        Err(SchemaError::Invalid(violations))
    }
}
