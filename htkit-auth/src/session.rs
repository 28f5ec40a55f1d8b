//! Authentication session.

use std::{collections::HashMap, path::PathBuf};

use base64::{Engine, prelude::BASE64_STANDARD};
use parking_lot::RwLock;
use url::Url;

use htkit::{Body, Error};
use htkit_io::BodySpool;

use crate::{authcache::AuthCache, counter::NonceCounter, credentials::CredentialStore, host_key};

/// Session builder.
pub struct SessionBuilder {
    nonce_capacity: usize,
    spool_dir: Option<PathBuf>,
    spool_limit: Option<usize>,
}

impl SessionBuilder {
    /// Create a new builder.
    const fn new() -> Self {
        Self {
            nonce_capacity: 1024,
            spool_dir: None,
            spool_limit: None,
        }
    }

    /// Set the nonce counter capacity (default is 1024).
    ///
    /// The capacity is clamped to at least one entry.
    #[inline]
    pub const fn nonce_capacity(mut self, capacity: usize) -> Self {
        self.nonce_capacity = capacity;
        self
    }

    /// Set the directory for body spool spill files.
    ///
    /// The OS temporary directory is used if not set.
    pub fn spool_dir<T>(mut self, dir: T) -> Self
    where
        T: Into<PathBuf>,
    {
        self.spool_dir = Some(dir.into());
        self
    }

    /// Set the in-memory limit for body spools (default is no limit, i.e.
    /// spools never spill to disk).
    #[inline]
    pub const fn spool_limit(mut self, limit: usize) -> Self {
        self.spool_limit = Some(limit);
        self
    }

    /// Build the session with a given credential store.
    pub fn build(self, credentials: CredentialStore) -> Session {
        Session {
            credentials,
            state: RwLock::new(SessionState {
                counter: NonceCounter::new(self.nonce_capacity),
                authorizations: AuthCache::new(),
                digest_credentials: HashMap::new(),
                digest_sessions: HashMap::new(),
            }),
            spool_dir: self.spool_dir,
            spool_limit: self.spool_limit,
        }
    }
}

/// Shared authentication state.
///
/// A session owns the credential store and everything negotiated with the
/// servers so far: cached `Authorization` headers, digest credential and
/// session hashes and the per-nonce request counters. One session is
/// expected to be shared by many concurrent requests; all mutable state
/// sits behind a reader-writer lock which is never held across IO or
/// hashing.
pub struct Session {
    credentials: CredentialStore,
    state: RwLock<SessionState>,
    spool_dir: Option<PathBuf>,
    spool_limit: Option<usize>,
}

/// The lock-protected part of the session.
struct SessionState {
    counter: NonceCounter,
    authorizations: AuthCache,
    digest_credentials: HashMap<String, String>,
    digest_sessions: HashMap<String, String>,
}

impl Session {
    /// Get a session builder.
    #[inline]
    pub const fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Find login credentials for a given URL.
    ///
    /// The realm is advisory only. Returns [`Error::NoCredentials`] if no
    /// credential matches.
    #[inline]
    pub fn login(&self, url: &Url, realm: &str) -> Result<(String, String), Error> {
        self.credentials.login(url, realm)
    }

    /// Generate a client nonce: 12 random bytes, base64-encoded.
    pub fn cnonce(&self) -> String {
        BASE64_STANDARD.encode(rand::random::<[u8; 12]>())
    }

    /// Increment the request counter for a given server nonce and return
    /// the new value as zero-padded lowercase hex.
    pub fn counter(&self, nonce: &str) -> String {
        let n = self.state.write().counter.next(nonce);

        format!("{n:08x}")
    }

    /// Get the cached `Authorization` header value for a given URL.
    pub fn authorization(&self, url: &Url) -> Option<String> {
        self.state
            .read()
            .authorizations
            .get(url)
            .map(str::to_string)
    }

    /// Cache an `Authorization` header value for the protection spaces a
    /// challenge advertised.
    ///
    /// Every domain URI is resolved against the request URL. An empty
    /// domain list caches the value for the whole server, i.e. under the
    /// URL host at the root path.
    pub fn set_authorization(&self, url: &Url, domain: &[String], auth: &str) {
        if domain.is_empty() {
            if let Ok(root) = url.join("/") {
                self.state.write().authorizations.set(&root, auth);
            }

            return;
        }

        let spaces = resolve_domain(url, domain);

        let mut state = self.state.write();

        for space in &spaces {
            state.authorizations.set(space, auth);
        }
    }

    /// Get the cached digest credential hash `H(A1)` for a given URL.
    ///
    /// Only the server-wide `host:/` protection space is consulted.
    pub fn digest_credentials(&self, url: &Url) -> Option<String> {
        let key = format!("{}:/", host_key(url));

        self.state.read().digest_credentials.get(&key).cloned()
    }

    /// Cache a digest credential hash for the protection spaces a
    /// challenge advertised.
    ///
    /// An empty domain list is treated as the single domain `/`.
    pub fn set_digest_credentials(&self, url: &Url, domain: &[String], hash: &str) {
        let root = ["/".to_string()];

        let domain = if domain.is_empty() { &root[..] } else { domain };

        let spaces = resolve_domain(url, domain);

        let mut state = self.state.write();

        for space in &spaces {
            let key = format!("{}:{}", host_key(space), space.path());

            state.digest_credentials.insert(key, hash.to_string());
        }
    }

    /// Get the cached MD5-sess session hash for a given server.
    pub fn digest_session(&self, server: &str) -> Option<String> {
        self.state.read().digest_sessions.get(server).cloned()
    }

    /// Cache an MD5-sess session hash for a given server.
    pub fn set_digest_session(&self, server: &str, hash: &str) {
        self.state
            .write()
            .digest_sessions
            .insert(server.to_string(), hash.to_string());
    }

    /// Create a new body spool using the configured spill directory and
    /// in-memory limit.
    pub fn new_spool(&self) -> BodySpool {
        BodySpool::new(self.spool_dir.clone(), self.spool_limit)
    }

    /// Tee a given read-once body into `n` independent replayable bodies.
    pub async fn duplicate(&self, body: Body, n: usize) -> Result<Vec<Body>, Error> {
        htkit_io::duplicate(body, n, || self.new_spool()).await
    }
}

/// Resolve the domain URIs of a challenge against a given request URL.
///
/// Unparseable domain URIs are dropped.
fn resolve_domain(url: &Url, domain: &[String]) -> Vec<Url> {
    let mut spaces = Vec::new();

    for uri in domain {
        if let Ok(resolved) = url.join(uri) {
            spaces.push(resolved);
        }
    }

    spaces
}
