//! Response type.

use crate::{body::Body, header::HeaderFields};

/// Server response.
#[derive(Debug)]
pub struct Response {
    status_code: u16,
    reason: String,
    header: HeaderFields,
    body: Option<Body>,
}

impl Response {
    /// Create a new response with no header fields and no body.
    pub fn new<R>(status_code: u16, reason: R) -> Self
    where
        R: Into<String>,
    {
        Self {
            status_code,
            reason: reason.into(),
            header: HeaderFields::new(),
            body: None,
        }
    }

    /// Get the status code.
    #[inline]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Get the reason phrase.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Get the header fields.
    #[inline]
    pub fn header(&self) -> &HeaderFields {
        &self.header
    }

    /// Get a mutable reference to the header fields.
    #[inline]
    pub fn header_mut(&mut self) -> &mut HeaderFields {
        &mut self.header
    }

    /// Get the response body (if any).
    #[inline]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Set the response body.
    #[inline]
    pub fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Set the response body.
    #[inline]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Take the response body, leaving the response without one.
    #[inline]
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}
