//! A fetched upstream HTTP response, as the fetch layer hands it to the
//! decoders.

use crate::error::{Error, Result};

/// A fetched upstream response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        RemoteResponse {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// First header value for `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Surfaces a non-success upstream answer with its status and body.
    pub fn ensure_success(&self) -> Result<()> {
        if self.is_success() {
            return Ok(());
        }
        Err(Error::UpstreamFetch {
            status: self.status,
            body: self.body.clone(),
        })
    }
}
