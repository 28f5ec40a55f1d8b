//! Authentication challenges.

use std::fmt::{self, Display, Formatter};

use htkit::{Error, Request, Response};
use tracing::trace;

use crate::{
    Session, basic, digest,
    lexer::{self, ItemKind},
};

/// A single `WWW-Authenticate` challenge.
///
/// Fields that were not present in the challenge are left at their default
/// values. The scheme is kept exactly as the server sent it.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Challenge {
    pub scheme: String,
    pub realm: String,
    pub domain: Vec<String>,
    pub nonce: String,
    pub opaque: String,
    pub stale: bool,
    pub algorithm: String,
    pub qop: Vec<String>,
}

impl Challenge {
    /// Parse all challenges from a given `WWW-Authenticate` header value.
    ///
    /// A single header value may carry several challenges. Challenges with
    /// an unrecognized scheme are skipped.
    pub fn parse_header(header: &str) -> Result<Vec<Self>, Error> {
        let mut parsed: Vec<Challenge> = Vec::new();

        for item in lexer::lex(header) {
            match item.kind {
                ItemKind::Basic | ItemKind::Digest => {
                    parsed.push(Challenge {
                        scheme: item.value.into_owned(),
                        ..Challenge::default()
                    });
                }
                ItemKind::Realm => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.realm = unquote(&item.value).to_string();
                    }
                }
                ItemKind::Domain => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.domain = unquote(&item.value)
                            .split_whitespace()
                            .map(String::from)
                            .collect();
                    }
                }
                ItemKind::Nonce => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.nonce = unquote(&item.value).to_string();
                    }
                }
                ItemKind::Opaque => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.opaque = unquote(&item.value).to_string();
                    }
                }
                ItemKind::Stale => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.stale = item.value.eq_ignore_ascii_case("true");
                    }
                }
                ItemKind::Algorithm => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.algorithm = item.value.into_owned();
                    }
                }
                ItemKind::Qop => {
                    if let Some(challenge) = parsed.last_mut() {
                        challenge.qop = unquote(&item.value).split(',').map(String::from).collect();
                    }
                }
                ItemKind::AuthParam => {
                    trace!(value = %item.value, "skipping unrecognized auth-param");
                }
                ItemKind::Eof => break,
                ItemKind::Error => {
                    return Err(Error::parse(item.pos, item.value.into_owned()));
                }
            }
        }

        Ok(parsed)
    }

    /// Produce an `Authorization` header value answering this challenge.
    ///
    /// The request body may be replaced with a replayable copy when the
    /// challenge requires hashing it (`qop=auth-int`).
    pub async fn authorization(
        &self,
        session: &Session,
        request: &mut Request,
    ) -> Result<String, Error> {
        match self.scheme.as_str() {
            "Basic" => basic::authorization(self, session, request),
            "Digest" => digest::authorization(self, session, request).await,
            _ => Err(Error::UnrecognizedScheme(self.scheme.clone())),
        }
    }
}

impl Display for Challenge {
    /// Serialize the challenge back into its canonical header form.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} realm=\"{}\"", self.scheme, self.realm)?;

        if !self.domain.is_empty() {
            write!(f, ", domain=\"{}\"", self.domain.join(" "))?;
        }

        if !self.nonce.is_empty() {
            write!(f, ", nonce=\"{}\"", self.nonce)?;
        }

        if !self.opaque.is_empty() {
            write!(f, ", opaque=\"{}\"", self.opaque)?;
        }

        if self.stale {
            write!(f, ", stale=true")?;
        }

        if !self.algorithm.is_empty() {
            write!(f, ", algorithm={}", self.algorithm)?;
        }

        if !self.qop.is_empty() {
            write!(f, ", qop=\"{}\"", self.qop.join(","))?;
        }

        Ok(())
    }
}

/// Collect the challenges from all `WWW-Authenticate` header fields of a
/// given response.
pub fn authentication(response: &Response) -> Result<Vec<Challenge>, Error> {
    let mut challenges = Vec::new();

    for value in response.header().get_all("WWW-Authenticate") {
        challenges.extend(Challenge::parse_header(value)?);
    }

    Ok(challenges)
}

/// Strip the surrounding quotes from a quoted-string lexer item.
fn unquote(value: &str) -> &str {
    &value[1..value.len() - 1]
}

#[cfg(test)]
mod tests {
    use htkit::{Error, Response};

    use super::{Challenge, authentication};

    fn basic_challenge() -> Challenge {
        Challenge {
            scheme: "Basic".to_string(),
            realm: "WallyWorld".to_string(),
            ..Challenge::default()
        }
    }

    fn digest_challenge() -> Challenge {
        Challenge {
            scheme: "Digest".to_string(),
            realm: "testrealm@host.com".to_string(),
            qop: vec!["auth".to_string(), "auth-int".to_string()],
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            opaque: "5ccc069c403ebaf9f0171e9517f40e41".to_string(),
            ..Challenge::default()
        }
    }

    #[test]
    fn test_parse_basic_challenge() {
        let parsed = Challenge::parse_header("\tBasic\n\t\trealm=\"WallyWorld\"").unwrap();

        assert_eq!(parsed, [basic_challenge()]);
    }

    #[test]
    fn test_parse_digest_challenge() {
        let header = "\tDigest \n\
                      \t\trealm=\"testrealm@host.com\",\n\
                      \t\tqop=\"auth,auth-int\",\n\
                      \t\tnonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\",\n\
                      \t\topaque=\"5ccc069c403ebaf9f0171e9517f40e41\"";

        let parsed = Challenge::parse_header(header).unwrap();

        assert_eq!(parsed, [digest_challenge()]);
    }

    #[test]
    fn test_parse_multiple_challenges() {
        let header = "Basic realm=\"WallyWorld\", \
                      Digest realm=\"testrealm@host.com\", \
                      qop=\"auth,auth-int\", \
                      nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", \
                      opaque=\"5ccc069c403ebaf9f0171e9517f40e41\"";

        let parsed = Challenge::parse_header(header).unwrap();

        assert_eq!(parsed, [basic_challenge(), digest_challenge()]);
    }

    #[test]
    fn test_parse_domain_stale_algorithm() {
        let header = "Digest realm=\"r\", domain=\"/a\t/b /c\", stale=True, \
                      algorithm=MD5-sess, nonce=\"n\"";

        let parsed = Challenge::parse_header(header).unwrap();

        assert_eq!(parsed.len(), 1);

        let challenge = &parsed[0];

        assert_eq!(challenge.domain, ["/a", "/b", "/c"]);
        assert!(challenge.stale);
        assert_eq!(challenge.algorithm, "MD5-sess");
    }

    #[test]
    fn test_parse_error_position() {
        match Challenge::parse_header("Basic realm=WallyWorld") {
            Err(Error::Parse { pos, .. }) => assert_eq!(pos, 12),
            res => panic!("unexpected result: {res:?}"),
        }
    }

    #[test]
    fn test_canonical_round_trip() {
        let headers = [
            "Basic realm=\"WallyWorld\"",
            "Digest realm=\"testrealm@host.com\", qop=\"auth,auth-int\", \
             nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", \
             opaque=\"5ccc069c403ebaf9f0171e9517f40e41\"",
            "Digest realm=\"r\", domain=\"/a /b\", nonce=\"n\", stale=true, \
             algorithm=MD5",
        ];

        for header in headers {
            let parsed = Challenge::parse_header(header).unwrap();

            let canonical = parsed
                .iter()
                .map(Challenge::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            let reparsed = Challenge::parse_header(&canonical).unwrap();

            assert_eq!(parsed, reparsed, "round trip failed for {header:?}");
        }
    }

    #[test]
    fn test_authentication_concatenates_headers() {
        let mut response = Response::new(401, "Unauthorized");

        response
            .header_mut()
            .add(("WWW-Authenticate", "Basic realm=\"WallyWorld\""));
        response
            .header_mut()
            .add(("WWW-Authenticate", "Digest realm=\"r\", nonce=\"n\""));

        let challenges = authentication(&response).unwrap();

        assert_eq!(challenges.len(), 2);
        assert_eq!(challenges[0].scheme, "Basic");
        assert_eq!(challenges[1].scheme, "Digest");
    }

    #[test]
    fn test_authentication_without_challenges() {
        let response = Response::new(401, "Unauthorized");

        assert!(authentication(&response).unwrap().is_empty());
    }
}
