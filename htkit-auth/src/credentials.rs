//! Login credentials.

use std::{cmp::Ordering, io};

use serde::Deserialize;
use url::Url;

use htkit::Error;

/// A single login credential.
///
/// The credential applies to every URL whose host matches `domain` and
/// whose path matches `path`. An empty domain or path matches anything.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Credential {
    #[serde(rename = "Domain")]
    domain: String,
    #[serde(rename = "Path")]
    path: String,
    #[serde(rename = "Username")]
    username: String,
    #[serde(rename = "Password")]
    password: String,
}

impl Credential {
    /// Create a new credential.
    ///
    /// The domain is case-insensitive and gets lowercased.
    pub fn new<D, P, U, W>(domain: D, path: P, username: U, password: W) -> Self
    where
        D: Into<String>,
        P: Into<String>,
        U: Into<String>,
        W: Into<String>,
    {
        Self {
            domain: domain.into().to_ascii_lowercase(),
            path: path.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Get the username.
    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Get the password.
    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Check if the credential applies to a given URL.
    pub fn matches(&self, url: &Url) -> bool {
        self.domain_match(url.host_str().unwrap_or_default()) && self.path_match(url.path())
    }

    /// Check if the credential domain matches a given host.
    ///
    /// An exact match (case-insensitive) always succeeds. A domain with at
    /// least one dot also matches any host within it, and a dot-prefixed
    /// domain matches any host with that suffix but not the bare domain
    /// itself.
    fn domain_match(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();

        if self.domain.is_empty() || self.domain == host {
            return true;
        }

        if host.ends_with(&self.domain) && dots(&self.domain) >= 1 {
            if host.as_bytes()[host.len() - self.domain.len() - 1] == b'.' {
                return true;
            }
        }

        self.domain.starts_with('.') && host.ends_with(&self.domain)
    }

    /// Check if the credential path is a prefix of a given request path
    /// ending at a segment boundary.
    fn path_match(&self, path: &str) -> bool {
        if self.path.is_empty() || self.path == path {
            return true;
        }

        if let Some(rest) = path.strip_prefix(self.path.as_str()) {
            return self.path.ends_with('/') || rest.starts_with('/');
        }

        false
    }

    /// Precedence used for ordering the credential store: more specific
    /// credentials sort first.
    fn cmp_precedence(&self, other: &Self) -> Ordering {
        // non-empty domains sort before empty ones
        match (self.domain.is_empty(), other.domain.is_empty()) {
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            _ => (),
        }

        // fully qualified domains sort before dot-prefixed ones
        match (self.domain.starts_with('.'), other.domain.starts_with('.')) {
            (false, true) => return Ordering::Less,
            (true, false) => return Ordering::Greater,
            _ => (),
        }

        // more domain components first, then by domain name, then more path
        // components first, then by path
        dots(&other.domain)
            .cmp(&dots(&self.domain))
            .then_with(|| self.domain.cmp(&other.domain))
            .then_with(|| slashes(&other.path).cmp(&slashes(&self.path)))
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Count the dots in a given domain.
fn dots(domain: &str) -> usize {
    domain.bytes().filter(|&b| b == b'.').count()
}

/// Count the path separators in a given path.
fn slashes(path: &str) -> usize {
    path.bytes().filter(|&b| b == b'/').count()
}

/// An ordered collection of credentials.
///
/// The collection is sorted once on construction and never mutated. Lookups
/// return the first (most specific) matching credential.
pub struct CredentialStore {
    credentials: Vec<Credential>,
}

impl CredentialStore {
    /// Create a new store from a given list of credentials.
    pub fn from_credentials<I>(credentials: I) -> Self
    where
        I: IntoIterator<Item = Credential>,
    {
        let mut credentials = Vec::from_iter(credentials);

        credentials.sort_by(Credential::cmp_precedence);

        Self { credentials }
    }

    /// Load credentials from a given JSON document.
    ///
    /// The document is an array of objects with `Domain`, `Path`,
    /// `Username` and `Password` members. Unknown members are ignored and
    /// domains are lowercased.
    pub fn from_json<R>(reader: R) -> Result<Self, Error>
    where
        R: io::Read,
    {
        let mut credentials: Vec<Credential> = serde_json::from_reader(reader)
            .map_err(|err| Error::from_msg_and_cause("invalid credentials document", err))?;

        for credential in &mut credentials {
            credential.domain.make_ascii_lowercase();
        }

        Ok(Self::from_credentials(credentials))
    }

    /// Find login credentials for a given URL.
    ///
    /// The realm is advisory only; matching is by URL. Returns
    /// [`Error::NoCredentials`] if nothing matches.
    pub fn login(&self, url: &Url, _realm: &str) -> Result<(String, String), Error> {
        for credential in &self.credentials {
            if credential.matches(url) {
                return Ok((
                    credential.username.clone(),
                    credential.password.clone(),
                ));
            }
        }

        Err(Error::NoCredentials)
    }

    /// Get the number of credentials.
    #[inline]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Check if the store is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}
