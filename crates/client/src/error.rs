//! Gateway error type.
//!
//! [`ApiError`] separates internal `Display` text (for logs) from
//! [`ApiError::user_message`], which is safe to show to the user.

use kisan_setu_core::Language;
use thiserror::Error;

/// Errors returned by backend and third-party calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server could not be reached (connection refused, DNS, timeout).
    ///
    /// Endpoints with an offline fallback never surface this variant.
    #[error("Backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    /// HTTP 401. The persisted user has already been purged.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with a non-success status.
    #[error("API error: {status} - {detail}")]
    Api { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Any other transport failure.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,

    /// The request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable(err)
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Http(err)
        }
    }
}

impl ApiError {
    /// Whether the failure happened before any response arrived.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable(_))
    }

    /// HTTP status, if the server responded.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    ///
    /// Server-provided `detail` text is passed through as-is; the backend
    /// only writes it in English.
    #[must_use]
    pub fn user_message(&self, language: Language) -> String {
        match (self, language) {
            (Self::Unreachable(_), Language::En) => {
                "Unable to reach the server. Please check your connection.".to_string()
            }
            (Self::Unreachable(_), Language::Hi) => {
                "सर्वर से संपर्क नहीं हो सका। कृपया अपना इंटरनेट कनेक्शन जांचें।".to_string()
            }
            (Self::Unauthorized(detail) | Self::Api { detail, .. }, _) if !detail.is_empty() => {
                detail.clone()
            }
            (Self::Unauthorized(_), Language::En) => {
                "Your session has expired. Please log in again.".to_string()
            }
            (Self::Unauthorized(_), Language::Hi) => {
                "आपका सत्र समाप्त हो गया है। कृपया फिर से लॉगिन करें।".to_string()
            }
            (Self::Cancelled, Language::En) => "Request cancelled.".to_string(),
            (Self::Cancelled, Language::Hi) => "अनुरोध रद्द किया गया।".to_string(),
            (Self::InvalidRequest(reason), _) => reason.clone(),
            (_, Language::En) => "Something went wrong. Please try again.".to_string(),
            (_, Language::Hi) => "कुछ गलत हो गया। कृपया पुनः प्रयास करें।".to_string(),
        }
    }
}

/// Result type alias for gateway calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_is_shown_to_user() {
        let err = ApiError::Api {
            status: 400,
            detail: "Username already exists".to_string(),
        };
        assert_eq!(err.user_message(Language::En), "Username already exists");
        assert_eq!(err.user_message(Language::Hi), "Username already exists");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_generic_messages() {
        let err = ApiError::Api {
            status: 500,
            detail: String::new(),
        };
        assert_eq!(
            err.user_message(Language::En),
            "Something went wrong. Please try again."
        );
        assert!(
            ApiError::Unauthorized(String::new())
                .user_message(Language::Hi)
                .contains("लॉगिन")
        );
    }

    #[test]
    fn test_parse_is_not_unreachable() {
        assert!(!ApiError::Parse("bad json".to_string()).is_unreachable());
        assert_eq!(ApiError::Cancelled.status(), None);
    }
}
