//! HTTP Digest authentication.
//!
//! The response computation follows RFC 2617 §3.2.2 with the MD5 and
//! MD5-sess algorithms and the `auth` and `auth-int` protection qualities.

use futures::StreamExt;
use md5::{Digest, Md5};

use htkit::{Error, Request};

use crate::{Challenge, Session, host_key};

/// Produce a Digest `Authorization` header value for a given challenge.
///
/// When the challenge selects `auth-int`, the request body is consumed
/// through a spool while being hashed and replaced with the spool reader so
/// the request can still be sent.
pub(crate) async fn authorization(
    challenge: &Challenge,
    session: &Session,
    request: &mut Request,
) -> Result<String, Error> {
    let cnonce = session.cnonce();

    authorization_with_cnonce(challenge, session, request, &cnonce).await
}

/// The digest computation with an explicit client nonce.
pub(crate) async fn authorization_with_cnonce(
    challenge: &Challenge,
    session: &Session,
    request: &mut Request,
    cnonce: &str,
) -> Result<String, Error> {
    let (username, password) = session.login(request.url(), &challenge.realm)?;

    // quality of protection: auth-int wins over auth, other values are
    // ignored
    let mut qop = "";

    for value in &challenge.qop {
        match value.as_str() {
            "auth" => {
                if qop != "auth-int" {
                    qop = "auth";
                }
            }
            "auth-int" => qop = "auth-int",
            _ => (),
        }
    }

    // nonce counter value
    let nc = if qop.is_empty() {
        String::new()
    } else {
        session.counter(&challenge.nonce)
    };

    // RFC 2617 3.2.2.2 A1
    let mut ha1 = match challenge.algorithm.as_str() {
        "" | "MD5" | "MD5-sess" => match session.digest_credentials(request.url()) {
            Some(hash) => hash,
            None => {
                let hash = md5_hex(format!("{username}:{}:{password}", challenge.realm));

                session.set_digest_credentials(request.url(), &challenge.domain, &hash);

                hash
            }
        },
        other => return Err(Error::UnhandledAlgorithm(other.to_string())),
    };

    if challenge.algorithm == "MD5-sess" {
        let server = host_key(request.url());

        ha1 = match session.digest_session(&server) {
            Some(hash) => hash,
            None => {
                let hash = md5_hex(format!("{ha1}:{}:{cnonce}", challenge.nonce));

                session.set_digest_session(&server, &hash);

                hash
            }
        };
    }

    // RFC 2617 3.2.2.3 A2
    let request_uri = request.request_uri();

    let ha2 = if qop == "auth-int" {
        // A2 = Method ":" digest-uri-value ":" H(entity-body)
        let mut body_hash = Md5::new();

        if let Some(mut body) = request.take_body() {
            let mut spool = session.new_spool();

            while let Some(chunk) = body.next().await.transpose().map_err(Error::IO)? {
                body_hash.update(&chunk);

                spool.write(&chunk).await.map_err(Error::IO)?;
            }

            spool.close().await.map_err(Error::IO)?;

            request.set_body(spool.into_reader().await?);
        }

        let body_hash = format!("{:x}", body_hash.finalize());

        md5_hex(format!(
            "{}:{request_uri}:{body_hash}",
            request.method()
        ))
    } else {
        // A2 = Method ":" digest-uri-value
        md5_hex(format!("{}:{request_uri}", request.method()))
    };

    // RFC 2617 3.2.2.1 request-digest, KD(secret, data) = H(secret ":" data)
    let response = if qop.is_empty() {
        md5_hex(format!("{ha1}:{}:{ha2}", challenge.nonce))
    } else {
        md5_hex(format!(
            "{ha1}:{}:{nc}:{cnonce}:{qop}:{ha2}",
            challenge.nonce
        ))
    };

    // RFC 2617 3.2.2: qop, nc and algorithm values are unquoted
    let mut auth = format!(
        "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{request_uri}\"",
        challenge.realm, challenge.nonce
    );

    if !qop.is_empty() {
        auth.push_str(&format!(", qop={qop}, nc={nc}, cnonce=\"{cnonce}\""));
    }

    if !challenge.algorithm.is_empty() {
        auth.push_str(&format!(", algorithm={}", challenge.algorithm));
    }

    auth.push_str(&format!(", response=\"{response}\""));

    if !challenge.opaque.is_empty() {
        auth.push_str(&format!(", opaque=\"{}\"", challenge.opaque));
    }

    Ok(auth)
}

/// MD5 of a given input as lowercase hex.
fn md5_hex<T>(input: T) -> String
where
    T: AsRef<[u8]>,
{
    format!("{:x}", Md5::digest(input))
}

#[cfg(test)]
mod tests {
    use url::Url;

    use htkit::{Body, Request};

    use crate::{Challenge, Credential, CredentialStore, Session};

    use super::{authorization_with_cnonce, md5_hex};

    fn mufasa_session() -> Session {
        let credentials = CredentialStore::from_credentials([Credential::new(
            "host.com",
            "/",
            "Mufasa",
            "Circle Of Life",
        )]);

        Session::builder().build(credentials)
    }

    fn mufasa_challenge() -> Challenge {
        Challenge {
            scheme: "Digest".to_string(),
            realm: "testrealm@host.com".to_string(),
            qop: vec!["auth".to_string()],
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_string(),
            opaque: "5ccc069c403ebaf9f0171e9517f40e41".to_string(),
            ..Challenge::default()
        }
    }

    #[tokio::test]
    async fn test_rfc2617_example() {
        let expected = "Digest username=\"Mufasa\", realm=\"testrealm@host.com\", \
                        nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", \
                        uri=\"/dir/index.html\", qop=auth, nc=00000001, \
                        cnonce=\"0a4f113b\", \
                        response=\"6629fae49393a05397450978507c4ef1\", \
                        opaque=\"5ccc069c403ebaf9f0171e9517f40e41\"";

        let session = mufasa_session();
        let challenge = mufasa_challenge();

        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        let mut request = Request::new("GET", url);

        let auth = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        assert_eq!(auth, expected);
    }

    #[tokio::test]
    async fn test_nonce_counter_increments_per_request() {
        let session = mufasa_session();
        let challenge = mufasa_challenge();

        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        let mut request = Request::new("GET", url);

        let first = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        let second = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        assert!(first.contains(", nc=00000001,"));
        assert!(second.contains(", nc=00000002,"));
    }

    #[tokio::test]
    async fn test_unhandled_algorithm() {
        let session = mufasa_session();

        let mut challenge = mufasa_challenge();

        challenge.algorithm = "SHA-256".to_string();

        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        let mut request = Request::new("GET", url);

        let res = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b").await;

        assert!(matches!(res, Err(htkit::Error::UnhandledAlgorithm(alg)) if alg == "SHA-256"));
    }

    #[tokio::test]
    async fn test_auth_int_hashes_and_replays_the_body() {
        let session = mufasa_session();

        let mut challenge = mufasa_challenge();

        challenge.qop = vec!["auth".to_string(), "auth-int".to_string()];

        let url = Url::parse("http://host.com/dir/update").unwrap();

        let mut request = Request::new("POST", url);

        request.set_body(Body::from("entity body"));

        let auth = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        // auth-int wins over auth
        assert!(auth.contains(", qop=auth-int,"));

        let ha1 = md5_hex("Mufasa:testrealm@host.com:Circle Of Life");
        let ha2 = md5_hex(format!(
            "POST:/dir/update:{}",
            md5_hex("entity body")
        ));
        let response = md5_hex(format!(
            "{ha1}:dcd98b7102dd2f0e8b11d0f600bfb0c093:00000001:0a4f113b:auth-int:{ha2}"
        ));

        assert!(auth.contains(&format!("response=\"{response}\"")));

        // the body must still be sendable after hashing
        let body = request.take_body().unwrap();

        assert_eq!(body.read().await.unwrap(), "entity body");
    }

    #[tokio::test]
    async fn test_auth_int_without_body_hashes_empty_entity() {
        let session = mufasa_session();

        let mut challenge = mufasa_challenge();

        challenge.qop = vec!["auth-int".to_string()];

        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        let mut request = Request::new("GET", url);

        let auth = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        let ha1 = md5_hex("Mufasa:testrealm@host.com:Circle Of Life");
        let ha2 = md5_hex(format!("GET:/dir/index.html:{}", md5_hex("")));
        let response = md5_hex(format!(
            "{ha1}:dcd98b7102dd2f0e8b11d0f600bfb0c093:00000001:0a4f113b:auth-int:{ha2}"
        ));

        assert!(auth.contains(&format!("response=\"{response}\"")));
    }

    #[tokio::test]
    async fn test_md5_sess_uses_the_session_cache() {
        let session = mufasa_session();

        let mut challenge = mufasa_challenge();

        challenge.algorithm = "MD5-sess".to_string();

        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        let mut request = Request::new("GET", url);

        let auth = authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        assert!(auth.contains(", algorithm=MD5-sess,"));

        let ha1 = md5_hex("Mufasa:testrealm@host.com:Circle Of Life");
        let sess = md5_hex(format!(
            "{ha1}:dcd98b7102dd2f0e8b11d0f600bfb0c093:0a4f113b"
        ));

        assert_eq!(session.digest_session("host.com"), Some(sess.clone()));

        let ha2 = md5_hex("GET:/dir/index.html");
        let response = md5_hex(format!(
            "{sess}:dcd98b7102dd2f0e8b11d0f600bfb0c093:00000001:0a4f113b:auth:{ha2}"
        ));

        assert!(auth.contains(&format!("response=\"{response}\"")));
    }

    #[tokio::test]
    async fn test_digest_credentials_are_cached_per_protection_space() {
        let session = mufasa_session();
        let challenge = mufasa_challenge();

        let url = Url::parse("http://host.com/dir/index.html").unwrap();

        let mut request = Request::new("GET", url.clone());

        authorization_with_cnonce(&challenge, &session, &mut request, "0a4f113b")
            .await
            .unwrap();

        // the H(A1) hash is cached under host.com:/ since the challenge
        // advertises no domain
        assert_eq!(
            session.digest_credentials(&url),
            Some(md5_hex("Mufasa:testrealm@host.com:Circle Of Life"))
        );
    }
}
