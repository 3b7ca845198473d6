//! Unified error type.

use std::fmt;

/// The error type returned by veneer's fallible operations.
///
/// Most decoration is infallible. The two exceptions: asking for a signed
/// cookie when no signing secret is linked to the request, and a body that
/// refuses to serialize to JSON. Both fail the specific call and nothing
/// else; the response object stays usable.
#[derive(Debug)]
pub enum Error {
    /// A signed cookie was requested but no secret has been attached to the
    /// originating request. Call `req.set_secret(..)` (or have a
    /// cookie-parsing stage do it) before signing.
    MissingSecret,
    /// The value handed to `res.json(..)` or `res.send(..)` could not be
    /// serialized.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret => f.write_str("a signing secret is required for signed cookies"),
            Self::Json(e) => write!(f, "json: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::MissingSecret => None,
            Self::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
