//! Error taxonomy for Backend API calls.
//!
//! Every request the [`ApiClient`](crate::client::ApiClient) issues resolves
//! to one of these variants:
//!
//! | Variant | Trigger | Caller behavior |
//! |---------|---------|-----------------|
//! | [`ApiError::Validation`] | 400/422 with a `{detail}` body | surfaced per field |
//! | [`ApiError::Auth`] | 401 on a protected call | token cleared, re-login |
//! | [`ApiError::NotFound`] | 404 | task fetches treat this as "no active task" |
//! | [`ApiError::Server`] | any other non-2xx | transient; polling continues |
//! | [`ApiError::Network`] | transport failure or timeout | transient; polling continues |

use std::collections::BTreeMap;

use serde::Deserialize;

/// Failure of a single Backend API request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(ValidationDetail),

    #[error("authentication required")]
    Auth,

    #[error("resource not found")]
    NotFound,

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// The `{detail}` payload of a validation error: either a plain message
/// or a map of field name to message (the signup endpoint returns both
/// shapes).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ValidationDetail {
    Message(String),
    Fields(BTreeMap<String, String>),
}

impl std::fmt::Display for ValidationDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationDetail::Message(msg) => write!(f, "{}", msg),
            ValidationDetail::Fields(fields) => {
                let mut first = true;
                for (field, msg) in fields {
                    if !first {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", field, msg)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

impl ApiError {
    /// Build an error from a non-2xx status and its raw body.
    ///
    /// Validation statuses try to parse the `{detail}` convention; if the
    /// body doesn't match, the raw text is kept as the message.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => ApiError::Auth,
            404 => ApiError::NotFound,
            400 | 422 => {
                #[derive(Deserialize)]
                struct DetailBody {
                    detail: ValidationDetail,
                }
                match serde_json::from_str::<DetailBody>(body) {
                    Ok(parsed) => ApiError::Validation(parsed.detail),
                    Err(_) => ApiError::Validation(ValidationDetail::Message(body.to_string())),
                }
            }
            _ => ApiError::Server {
                status,
                message: body.to_string(),
            },
        }
    }

    /// True for failures worth retrying on the next poll tick: transient
    /// transport and server-side errors, as opposed to contract errors.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Server { .. } | ApiError::Network(_))
    }
}
