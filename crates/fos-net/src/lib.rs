//! fOS Networking
//!
//! Source fetching for component definitions and the memoizing source
//! cache that deduplicates in-flight requests.

mod loader;
mod memory;
mod cache;

pub use cache::{SourceCache, SourceFuture};
pub use loader::{FileFetcher, Fetcher};
pub use memory::MemoryFetcher;
pub use url::Url;

/// HTTP Response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// 200 response with a body
    pub fn ok_with(body: impl Into<Vec<u8>>) -> Self {
        Self::with_status(200, "OK", body)
    }

    pub fn with_status(status: u16, status_text: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Status is 2xx
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Decode the body as UTF-8
    pub fn text(&self) -> Result<String, NetError> {
        String::from_utf8(self.body.clone())
            .map_err(|e| NetError::Network(format!("Body is not valid UTF-8: {}", e)))
    }
}

/// Network error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetError {
    #[error("HTTP error: {status} {status_text}")]
    Http { status: u16, status_text: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl NetError {
    /// HTTP status, for HTTP errors
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_ok_range() {
        assert!(Response::with_status(204, "No Content", "").ok());
        assert!(!Response::with_status(301, "Moved", "").ok());
        assert!(!Response::with_status(404, "Not Found", "").ok());
    }

    #[test]
    fn test_response_text() {
        assert_eq!(Response::ok_with("hi").text().unwrap(), "hi");
        assert!(matches!(
            Response::ok_with(vec![0xff, 0xfe]).text(),
            Err(NetError::Network(_))
        ));
    }

    #[test]
    fn test_header_lookup() {
        let mut response = Response::ok_with("");
        response.headers.push(("Content-Type".into(), "text/html".into()));
        assert_eq!(response.header("content-type"), Some("text/html"));
    }

    #[test]
    fn test_error_status() {
        let err = NetError::Http { status: 404, status_text: "Not Found".into() };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP error: 404 Not Found");
        assert_eq!(NetError::Network("reset".into()).status(), None);
    }
}
