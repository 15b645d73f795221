//! Opaque continuation tokens for paged scans.
//!
//! # Responsibility
//! - Own the token format handed out by list operations.
//! - Reject tokens that were minted for a different scan shape.
//!
//! # Invariants
//! - Callers cannot build a cursor from parts; they only receive one from a
//!   list call and hand its token back verbatim.
//! - A token resumes strictly after the last row of the page that minted it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CURSOR_FORMAT_VERSION: u8 = 1;
// Decode bound for untrusted token input.
const MAX_CURSOR_TOKEN_LEN: usize = 512;

/// Identifies one ordered scan. Tokens only resume the shape that minted them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanShape {
    pub kind: &'static str,
    pub order: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    v: u8,
    kind: String,
    order: String,
    after: i64,
}

/// Resume position within one scan shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    shape: ScanShape,
    after_key: i64,
}

#[derive(Debug, PartialEq, Eq)]
pub enum CursorDecodeError {
    Empty,
    TooLong { len: usize, max: usize },
    Encoding(String),
    Payload(String),
    UnsupportedVersion(u8),
    ShapeMismatch { expected: String, found: String },
}

impl Display for CursorDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "cursor token is empty"),
            Self::TooLong { len, max } => {
                write!(f, "cursor token exceeds max length: {len} chars (max {max})")
            }
            Self::Encoding(message) => write!(f, "cursor token is not valid base64: {message}"),
            Self::Payload(message) => write!(f, "cursor payload is malformed: {message}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "cursor format version {version} is not supported")
            }
            Self::ShapeMismatch { expected, found } => write!(
                f,
                "cursor belongs to scan `{found}`, expected `{expected}`"
            ),
        }
    }
}

impl Error for CursorDecodeError {}

impl ScanShape {
    fn label(&self) -> String {
        format!("{}/{}", self.kind, self.order)
    }
}

impl PageCursor {
    pub(crate) fn after(shape: ScanShape, after_key: i64) -> Self {
        Self { shape, after_key }
    }

    /// Storage key of the last row already returned.
    pub(crate) fn after_key(&self) -> i64 {
        self.after_key
    }

    /// Renders the opaque token text.
    pub fn encode(&self) -> String {
        let payload = CursorPayload {
            v: CURSOR_FORMAT_VERSION,
            kind: self.shape.kind.to_string(),
            order: self.shape.order.to_string(),
            after: self.after_key,
        };
        // Plain scalars only; serialization is infallible.
        let bytes = serde_json::to_vec(&payload).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Parses a token previously produced by `encode` for `shape`.
    pub(crate) fn decode(token: &str, shape: ScanShape) -> Result<Self, CursorDecodeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CursorDecodeError::Empty);
        }
        if token.len() > MAX_CURSOR_TOKEN_LEN {
            return Err(CursorDecodeError::TooLong {
                len: token.len(),
                max: MAX_CURSOR_TOKEN_LEN,
            });
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|err| CursorDecodeError::Encoding(err.to_string()))?;
        let payload: CursorPayload = serde_json::from_slice(&bytes)
            .map_err(|err| CursorDecodeError::Payload(err.to_string()))?;

        if payload.v != CURSOR_FORMAT_VERSION {
            return Err(CursorDecodeError::UnsupportedVersion(payload.v));
        }
        if payload.kind != shape.kind || payload.order != shape.order {
            return Err(CursorDecodeError::ShapeMismatch {
                expected: shape.label(),
                found: format!("{}/{}", payload.kind, payload.order),
            });
        }

        Ok(Self::after(shape, payload.after))
    }
}

#[cfg(test)]
mod tests {
    use super::{CursorDecodeError, PageCursor, ScanShape, MAX_CURSOR_TOKEN_LEN};

    const LISTINGS: ScanShape = ScanShape {
        kind: "Listing",
        order: "id_asc",
    };

    #[test]
    fn token_resumes_same_shape() {
        let token = PageCursor::after(LISTINGS, 41).encode();
        assert!(!token.is_empty());
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded = PageCursor::decode(&token, LISTINGS).expect("token should decode");
        assert_eq!(decoded.after_key(), 41);
    }

    #[test]
    fn rejects_token_from_other_shape() {
        let other = ScanShape {
            kind: "Counter",
            order: "id_asc",
        };
        let token = PageCursor::after(other, 3).encode();

        let err = PageCursor::decode(&token, LISTINGS).unwrap_err();
        assert_eq!(
            err,
            CursorDecodeError::ShapeMismatch {
                expected: "Listing/id_asc".to_string(),
                found: "Counter/id_asc".to_string(),
            }
        );
    }

    #[test]
    fn rejects_garbage_tokens() {
        assert_eq!(
            PageCursor::decode("   ", LISTINGS).unwrap_err(),
            CursorDecodeError::Empty
        );
        assert!(matches!(
            PageCursor::decode("!!not-base64!!", LISTINGS).unwrap_err(),
            CursorDecodeError::Encoding(_)
        ));
        assert!(matches!(
            PageCursor::decode("aGVsbG8", LISTINGS).unwrap_err(),
            CursorDecodeError::Payload(_)
        ));

        let oversized = "A".repeat(MAX_CURSOR_TOKEN_LEN + 1);
        assert!(matches!(
            PageCursor::decode(&oversized, LISTINGS).unwrap_err(),
            CursorDecodeError::TooLong { .. }
        ));
    }
}
