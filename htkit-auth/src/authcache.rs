//! Authorization cache.

use std::{cmp::Ordering, collections::HashMap};

use url::Url;

use crate::host_key;

/// Cache of negotiated `Authorization` header values, keyed by host and
/// path prefix.
///
/// For every host the cached paths are kept sorted deepest first with the
/// root path last, so a lookup returns the most specific match. The cache
/// is not synchronized; callers serialize access.
pub struct AuthCache {
    hosts: HashMap<String, Vec<AuthPath>>,
}

/// A cached authorization for a single path prefix.
struct AuthPath {
    path: String,
    auth: String,
}

impl AuthCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            hosts: HashMap::new(),
        }
    }

    /// Get the cached authorization for a given URL.
    ///
    /// Returns the value of the first (deepest) cached path that is a
    /// prefix of the URL path.
    pub fn get(&self, url: &Url) -> Option<&str> {
        let paths = self.hosts.get(&host_key(url))?;

        paths
            .iter()
            .find(|v| v.matches(url.path()))
            .map(|v| v.auth.as_str())
    }

    /// Cache an authorization for the host and path of a given URL.
    ///
    /// An existing entry for the exact path is replaced; otherwise the
    /// entry is inserted and the path list re-sorted.
    pub fn set(&mut self, url: &Url, auth: &str) {
        let paths = self.hosts.entry(host_key(url)).or_default();

        if let Some(existing) = paths.iter_mut().find(|v| v.path == url.path()) {
            existing.auth = auth.to_string();
            return;
        }

        paths.push(AuthPath {
            path: url.path().to_string(),
            auth: auth.to_string(),
        });

        paths.sort_by(|a, b| cmp_paths(&a.path, &b.path));
    }
}

impl Default for AuthCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthPath {
    /// Check if the cached path is a prefix of a given request path.
    ///
    /// The prefix has to end at a path segment boundary.
    fn matches(&self, path: &str) -> bool {
        if self.path == path {
            return true;
        }

        if let Some(rest) = path.strip_prefix(self.path.as_str()) {
            return self.path.ends_with('/') || rest.starts_with('/');
        }

        false
    }
}

/// Path ordering: deeper paths first, the root path last, ties broken
/// lexicographically.
fn cmp_paths(a: &str, b: &str) -> Ordering {
    match (a == "/", b == "/") {
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => (),
    }

    slashes(b).cmp(&slashes(a)).then_with(|| a.cmp(b))
}

/// Count the path separators in a given path.
fn slashes(path: &str) -> usize {
    path.bytes().filter(|&b| b == b'/').count()
}
