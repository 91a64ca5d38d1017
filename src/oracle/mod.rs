//! Response verification
//!
//! Each lifecycle step has a [`StepContract`]: the status line that must be
//! present among the response headers and an [`Expect`] tree describing the
//! body. Bodies are compared structurally. Objects must carry exactly the
//! expected keys, and individual fields may be relaxed to "any string" or
//! "null or string" where the server chooses the value.
//!
//! ## Usage
//!
//! ```
//! use belayer_e2e::oracle::{Expect, StepContract, verify};
//! use belayer_e2e::types::Step;
//! use serde_json::json;
//!
//! let contract = StepContract::ok(
//!     Step::Begin,
//!     Expect::object([
//!         ("transactionId", Expect::AnyString),
//!         ("endTime", Expect::Null),
//!     ]),
//! );
//! let headers = vec!["HTTP/1.1 200 OK".to_string()];
//! let body = json!({"transactionId": "T1", "endTime": null});
//! assert!(verify(&contract, &headers, &body).is_ok());
//! ```

pub mod contracts;

use crate::error::{Error, Result};
use crate::types::Step;
use serde_json::Value;

/// Status line every successful lifecycle step must return
pub const STATUS_LINE_OK: &str = "HTTP/1.1 200 OK";

/// Expected shape of a JSON value
#[derive(Debug, Clone, PartialEq)]
pub enum Expect {
    /// Exactly this value
    Exact(Value),
    /// Exactly `null`
    Null,
    /// Any string
    AnyString,
    /// `null` or any string
    NullOrString,
    /// An array with at least one element
    NonEmptyArray,
    /// An object with exactly these keys, each matching its expectation
    Object(Vec<(String, Expect)>),
    /// An array with exactly these elements, in order
    Array(Vec<Expect>),
}

impl Expect {
    /// Exact match against anything convertible to a JSON value
    pub fn exact(value: impl Into<Value>) -> Self {
        Expect::Exact(value.into())
    }

    /// Object expectation from `(key, expectation)` pairs
    pub fn object<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Expect)>,
    {
        Expect::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Match `actual` against this expectation
    ///
    /// On failure returns the first mismatch found, depth first, with the JSON
    /// path at which it occurred.
    pub fn check(&self, actual: &Value) -> std::result::Result<(), Mismatch> {
        self.check_at("$", actual)
    }

    fn check_at(&self, path: &str, actual: &Value) -> std::result::Result<(), Mismatch> {
        let ok = match self {
            Expect::Exact(expected) => expected == actual,
            Expect::Null => actual.is_null(),
            Expect::AnyString => actual.is_string(),
            Expect::NullOrString => actual.is_null() || actual.is_string(),
            Expect::NonEmptyArray => actual.as_array().is_some_and(|a| !a.is_empty()),
            Expect::Object(fields) => {
                let Some(object) = actual.as_object() else {
                    return Err(Mismatch::new(path, self, actual));
                };

                for (key, expect) in fields {
                    let field_path = format!("{}.{}", path, key);
                    match object.get(key) {
                        Some(value) => expect.check_at(&field_path, value)?,
                        None => {
                            return Err(Mismatch {
                                path: field_path,
                                expected: expect.to_string(),
                                actual: "<missing>".to_string(),
                            });
                        }
                    }
                }

                if let Some(extra) = object
                    .keys()
                    .find(|k| !fields.iter().any(|(name, _)| name == *k))
                {
                    return Err(Mismatch {
                        path: format!("{}.{}", path, extra),
                        expected: "<absent>".to_string(),
                        actual: object[extra].to_string(),
                    });
                }
                true
            }
            Expect::Array(items) => {
                let Some(array) = actual.as_array() else {
                    return Err(Mismatch::new(path, self, actual));
                };
                if array.len() != items.len() {
                    return Err(Mismatch::new(path, self, actual));
                }
                for (i, (expect, value)) in items.iter().zip(array).enumerate() {
                    expect.check_at(&format!("{}[{}]", path, i), value)?;
                }
                true
            }
        };

        if ok {
            Ok(())
        } else {
            Err(Mismatch::new(path, self, actual))
        }
    }
}

impl std::fmt::Display for Expect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expect::Exact(value) => write!(f, "{}", value),
            Expect::Null => f.write_str("null"),
            Expect::AnyString => f.write_str("any string"),
            Expect::NullOrString => f.write_str("null or string"),
            Expect::NonEmptyArray => f.write_str("non-empty array"),
            Expect::Object(fields) => {
                let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
                write!(f, "object with keys [{}]", keys.join(", "))
            }
            Expect::Array(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
        }
    }
}

/// First point at which an actual value diverged from its expectation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// JSON path of the mismatching value (`$` is the root)
    pub path: String,
    /// Description of the expectation
    pub expected: String,
    /// The actual value, serialized
    pub actual: String,
}

impl Mismatch {
    fn new(path: &str, expected: &Expect, actual: &Value) -> Self {
        Self {
            path: path.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// What a step's response must look like
#[derive(Debug, Clone, PartialEq)]
pub struct StepContract {
    /// Step the contract belongs to
    pub step: Step,
    /// Status line that must appear among the headers (None = not checked)
    pub status_line: Option<String>,
    /// Expected body
    pub body: Expect,
}

impl StepContract {
    /// Contract requiring `HTTP/1.1 200 OK` and the given body shape
    pub fn ok(step: Step, body: Expect) -> Self {
        Self {
            step,
            status_line: Some(STATUS_LINE_OK.to_string()),
            body,
        }
    }
}

/// Check a parsed response against a step contract
///
/// # Errors
///
/// Returns [`Error::Verification`] naming the step, the expectation and the
/// actual value of the first mismatch.
pub fn verify(contract: &StepContract, headers: &[String], body: &Value) -> Result<()> {
    let step = contract.step;

    if let Err(mismatch) = contract.body.check(body) {
        tracing::error!(
            %step,
            path = %mismatch.path,
            expected = %mismatch.expected,
            actual = %mismatch.actual,
            "response body violates contract"
        );
        return Err(Error::verification(
            step,
            format!("{} at {}", mismatch.expected, mismatch.path),
            mismatch.actual,
        ));
    }

    if let Some(line) = &contract.status_line
        && !headers.iter().any(|h| h == line)
    {
        let actual = headers
            .first()
            .cloned()
            .unwrap_or_else(|| "<no status line>".to_string());
        tracing::error!(%step, expected = %line, actual = %actual, "unexpected status line");
        return Err(Error::verification(
            step,
            format!("status line '{}'", line),
            actual,
        ));
    }

    tracing::debug!(%step, "response matches contract");
    Ok(())
}
