//! Parameter binding and the validator contract.
//!
//! A handler declares zero or more [`ParameterBinding`]s. Each binding names
//! an argument position, a request source (body, path params or query) and
//! optionally a key and a validator. [`bind`] extracts every declared value,
//! runs its validator, and either returns the positional argument list or a
//! single [`RequestValidationError`] holding every field error it saw.

use crate::{Error, RequestContext, RequestValidationError};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Field-level validation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    /// Attach the offending value
    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    /// Rename the field this error refers to.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = field.into();
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Outcome of a validator: the (possibly coerced) value, or every error found.
pub type ValidationResult<T = Value> = Result<T, Vec<ValidationError>>;

/// A validator as stored on a binding.
pub type ValidatorFn = Arc<dyn Fn(&Value) -> ValidationResult + Send + Sync>;

/// Wrap a closure as a [`ValidatorFn`].
pub fn validator<F>(f: F) -> ValidatorFn
where
    F: Fn(&Value) -> ValidationResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Highest argument position a binding may target.
pub const MAX_ARGUMENT_INDEX: usize = 31;

/// Where a bound value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterSource {
    Body,
    Param,
    Query,
}

impl ParameterSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterSource::Body => "body",
            ParameterSource::Param => "param",
            ParameterSource::Query => "query",
        }
    }
}

/// Declared mapping from a handler argument position to a request value.
#[derive(Clone)]
pub struct ParameterBinding {
    pub index: usize,
    pub source: ParameterSource,
    /// Absent means "the whole body / params / query object"
    pub key: Option<String>,
    pub validator: Option<ValidatorFn>,
}

impl ParameterBinding {
    /// Bind the whole decoded body.
    pub fn body(index: usize) -> Self {
        Self {
            index,
            source: ParameterSource::Body,
            key: None,
            validator: None,
        }
    }

    /// Bind one named path parameter.
    pub fn param(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            source: ParameterSource::Param,
            key: Some(name.into()),
            validator: None,
        }
    }

    /// Bind the whole path-parameter object.
    pub fn params(index: usize) -> Self {
        Self {
            index,
            source: ParameterSource::Param,
            key: None,
            validator: None,
        }
    }

    /// Bind one named query parameter.
    pub fn query(index: usize, name: impl Into<String>) -> Self {
        Self {
            index,
            source: ParameterSource::Query,
            key: Some(name.into()),
            validator: None,
        }
    }

    /// Bind the whole query object.
    pub fn queries(index: usize) -> Self {
        Self {
            index,
            source: ParameterSource::Query,
            key: None,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: ValidatorFn) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Whether the argument position is within [`MAX_ARGUMENT_INDEX`].
    pub fn is_in_range(&self) -> bool {
        self.index <= MAX_ARGUMENT_INDEX
    }

    /// Read the raw value for this binding. Missing keys yield `null`.
    pub fn extract(&self, request: &RequestContext) -> Value {
        match (self.source, &self.key) {
            (ParameterSource::Body, _) => request.body.clone(),
            (ParameterSource::Param, Some(key)) => request
                .path_params
                .get(key)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null),
            (ParameterSource::Param, None) => request.params_value(),
            (ParameterSource::Query, Some(key)) => request
                .query
                .get(key)
                .map(|v| v.to_value())
                .unwrap_or(Value::Null),
            (ParameterSource::Query, None) => request.query_value(),
        }
    }
}

impl fmt::Debug for ParameterBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBinding")
            .field("index", &self.index)
            .field("source", &self.source)
            .field("key", &self.key)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Result of binding a request.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundArgs {
    /// No bindings declared: the handler receives the raw request.
    Request,
    /// Positional values, one slot per argument index.
    Values(Vec<Value>),
}

/// Extract and validate every binding.
///
/// Bindings are processed in argument order. All validator errors are
/// collected before failing. Positions not covered by any binding are
/// filled with `null`.
pub fn bind(bindings: &[ParameterBinding], request: &RequestContext) -> Result<BoundArgs, Error> {
    if bindings.is_empty() {
        return Ok(BoundArgs::Request);
    }

    if let Some(binding) = bindings.iter().find(|b| !b.is_in_range()) {
        return Err(Error::Argument(format!(
            "binding index {} exceeds the maximum of {}",
            binding.index, MAX_ARGUMENT_INDEX
        )));
    }

    let mut sorted: Vec<&ParameterBinding> = bindings.iter().collect();
    sorted.sort_by_key(|b| b.index);

    let len = sorted.last().map(|b| b.index + 1).unwrap_or(0);
    let mut args = vec![Value::Null; len];
    let mut errors = Vec::new();

    for binding in sorted {
        let raw = binding.extract(request);
        trace!(
            index = binding.index,
            source = binding.source.as_str(),
            key = ?binding.key,
            "Binding parameter"
        );

        match &binding.validator {
            Some(validate) => match validate(&raw) {
                Ok(data) => args[binding.index] = data,
                Err(mut field_errors) => errors.append(&mut field_errors),
            },
            None => args[binding.index] = raw,
        }
    }

    if errors.is_empty() {
        Ok(BoundArgs::Values(args))
    } else {
        Err(Error::Validation(RequestValidationError::new(errors)))
    }
}
