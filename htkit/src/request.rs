//! Request type.

use url::Url;

use crate::{body::Body, header::HeaderFields};

/// Client request.
pub struct Request {
    method: String,
    url: Url,
    header: HeaderFields,
    body: Option<Body>,
}

impl Request {
    /// Create a new request with no header fields and no body.
    pub fn new<M>(method: M, url: Url) -> Self
    where
        M: Into<String>,
    {
        Self {
            method: method.into(),
            url,
            header: HeaderFields::new(),
            body: None,
        }
    }

    /// Get the request method.
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Get the request URL.
    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the Request-URI as it would appear in the request line, i.e. the
    /// URL path followed by the query string (if any).
    pub fn request_uri(&self) -> String {
        if let Some(query) = self.url.query() {
            format!("{}?{}", self.url.path(), query)
        } else {
            self.url.path().to_string()
        }
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

    /// Get the request body (if any).
    #[inline]
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Set the request body.
    #[inline]
    pub fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Set the request body.
    #[inline]
    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    /// Take the request body, leaving the request without one.
    #[inline]
    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::Request;

    #[test]
    fn test_request_uri() {
        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        assert_eq!(Request::new("GET", url).request_uri(), "/dir/index.html");

        let url = Url::parse("http://host.com/search?q=a%20b").unwrap();

        assert_eq!(Request::new("GET", url).request_uri(), "/search?q=a%20b");
    }
}
