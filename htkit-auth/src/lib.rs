//! # HTTP authentication for htkit clients.
//!
//! This crate negotiates `WWW-Authenticate` challenges on behalf of an HTTP
//! client. It parses Basic and Digest challenges, produces `Authorization`
//! header values from a set of configured credentials, and caches the
//! negotiated state in a thread-safe [`Session`] shared across requests.

mod authcache;
mod basic;
mod counter;
mod digest;
mod lexer;

pub mod challenge;
pub mod credentials;
pub mod session;

use url::Url;

pub use htkit::Error;

pub use crate::{
    challenge::Challenge,
    credentials::{Credential, CredentialStore},
    session::{Session, SessionBuilder},
};

/// Cache key for a given URL host.
///
/// The port is a part of the key whenever the URL carries one, so
/// `host:8080` and `host` denote different protection spaces.
pub(crate) fn host_key(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();

    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
