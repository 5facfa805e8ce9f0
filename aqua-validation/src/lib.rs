//! Validators for Aqua parameter bindings
//!
//! Every validator here is an [`aqua_core::ValidatorFn`]: it takes the raw
//! bound value and returns either the (possibly coerced) value or every
//! field error it found.
//!
//! # Examples
//!
//! ```
//! use aqua_validation::{array, boolean, number, object, optional, string};
//! use serde_json::json;
//!
//! let user = object([
//!     ("name", string()),
//!     ("age", number()),
//!     ("admin", optional(boolean())),
//!     ("scores", array(number())),
//! ]);
//!
//! let data = user(&json!({"name": "Ann", "age": "31", "scores": ["1", 2]})).unwrap();
//! assert_eq!(data, json!({"name": "Ann", "age": 31, "scores": [1, 2]}));
//!
//! let errors = user(&json!({"name": 7, "age": "x", "scores": []})).unwrap_err();
//! assert_eq!(errors.len(), 2);
//! ```
//!
//! ## Binding a validated parameter
//!
//! ```
//! use aqua_core::ParameterBinding;
//! use aqua_validation::number;
//!
//! let id = ParameterBinding::param(0, "id").with_validator(number());
//! # let _ = id;
//! ```

mod rules;
mod validators;

pub use rules::*;
pub use validators::*;
