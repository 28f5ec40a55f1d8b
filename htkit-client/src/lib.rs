//! # Authenticating HTTP request driver.
//!
//! The [`Client`] wraps a [`Transport`] with a per-request timeout cap and
//! drives `WWW-Authenticate` negotiation on top of it: it attaches cached
//! `Authorization` headers, retries challenged requests with freshly built
//! authorizations and seeds the session caches on success.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use htkit::{Body, Error, Request, Response};
use htkit_auth::{Session, challenge};

/// The raw request transport consumed by the client.
///
/// A transport sends a single request and produces the response. It may
/// consume the request body; the driver takes care of body replay across
/// retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a given request.
    async fn send(&self, request: &mut Request) -> Result<Response, Error>;
}

/// Client builder.
pub struct ClientBuilder {
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    /// Create a new builder.
    const fn new() -> Self {
        Self {
            request_timeout: Some(Duration::from_secs(60)),
        }
    }

    /// Set the request timeout (default is 60 seconds).
    #[inline]
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Build the client around a given transport.
    pub fn build<T>(self, transport: T) -> Client
    where
        T: Transport + 'static,
    {
        Client {
            transport: Arc::new(transport),
            request_timeout: self.request_timeout,
        }
    }
}

/// HTTP client with authentication handling.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    request_timeout: Option<Duration>,
}

impl Client {
    /// Get a client builder.
    #[inline]
    pub const fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Send a given request.
    ///
    /// The call returns no later than the configured request timeout has
    /// elapsed; on expiry the in-flight request is canceled and a timeout
    /// error carrying the URL and the wait duration is returned.
    pub async fn send(&self, request: &mut Request) -> Result<Response, Error> {
        let url = request.url().clone();

        let send = self.transport.send(request);

        if let Some(timeout) = self.request_timeout {
            match tokio::time::timeout(timeout, send).await {
                Ok(res) => res,
                Err(_) => Err(Error::timeout(url.as_str(), timeout)),
            }
        } else {
            send.await
        }
    }

    /// Send a given request, answering `WWW-Authenticate` challenges with
    /// a given session.
    ///
    /// A cached authorization is attached up front when the session has one
    /// for the request URL. On a 401 response the challenges are tried in
    /// order; a challenge without matching credentials is skipped as long
    /// as more challenges remain, any other failure aborts. The first
    /// authorization accepted by the server is cached for the protection
    /// spaces the challenge advertised.
    pub async fn send_authenticated(
        &self,
        request: &mut Request,
        session: &Session,
    ) -> Result<Response, Error> {
        let cached = session.authorization(request.url());

        if let Some(auth) = &cached {
            request.header_mut().add(("Authorization", auth.as_str()));
        }

        // keep a copy of the request body around if we may have to retry
        // the request
        let mut held: Option<Body> = None;

        if cached.is_none() {
            if let Some(body) = request.take_body() {
                let mut clones = session.duplicate(body, 2).await?;

                held = clones.pop();

                if let Some(send) = clones.pop() {
                    request.set_body(send);
                }
            }
        }

        let mut response = self.send(request).await?;

        if response.status_code() != 401 {
            return Ok(response);
        }

        let challenges = challenge::authentication(&response)?;

        let n = challenges.len();

        if n == 0 {
            return Err(Error::from_msg(format!(
                "unable to parse {} WWW-Authenticate header",
                request.url()
            )));
        }

        for (i, challenge) in challenges.iter().enumerate() {
            let last_try = i + 1 == n;

            let auth = match challenge.authorization(session, request).await {
                Ok(auth) => auth,
                Err(err) if err.is_no_credentials() && !last_try => {
                    debug!(scheme = %challenge.scheme, "no credentials for challenge, trying next");
                    continue;
                }
                Err(err) => return Err(err),
            };

            request.header_mut().add(("Authorization", auth.as_str()));

            // while more challenges remain the body has to stay replayable
            if let Some(body) = held.take() {
                if last_try {
                    request.set_body(body);
                } else {
                    let mut clones = session.duplicate(body, 2).await?;

                    held = clones.pop();

                    if let Some(send) = clones.pop() {
                        request.set_body(send);
                    }
                }
            }

            debug!(scheme = %challenge.scheme, url = %request.url(), "retrying challenged request");

            response = self.send(request).await?;

            if response.status_code() != 401 {
                session.set_authorization(request.url(), &challenge.domain, &auth);

                return Ok(response);
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, time::Duration};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use url::Url;

    use htkit::{Body, Error, Request, Response};
    use htkit_auth::{Credential, CredentialStore, Session};

    use super::{Client, Transport};

    /// What the transport saw for a single request attempt.
    struct Attempt {
        authorization: Vec<String>,
        body: Option<Vec<u8>>,
    }

    /// A transport that replays a scripted list of responses and records
    /// the requests it received.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Response>>,
        attempts: Mutex<Vec<Attempt>>,
    }

    impl ScriptedTransport {
        fn new<I>(responses: I) -> Self
        where
            I: IntoIterator<Item = Response>,
        {
            Self {
                responses: Mutex::new(VecDeque::from_iter(responses)),
                attempts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, request: &mut Request) -> Result<Response, Error> {
            let authorization = request
                .header()
                .get_all("Authorization")
                .map(str::to_string)
                .collect();

            let body = match request.take_body() {
                Some(body) => Some(body.read().await?.to_vec()),
                None => None,
            };

            self.attempts.lock().push(Attempt {
                authorization,
                body,
            });

            self.responses
                .lock()
                .pop_front()
                .ok_or_else(|| Error::from_static_msg("no scripted response left"))
        }
    }

    fn unauthorized(challenge: &str) -> Response {
        let mut response = Response::new(401, "Unauthorized");

        response.header_mut().add(("WWW-Authenticate", challenge));

        response
    }

    fn aladdin_session() -> Session {
        let credentials = CredentialStore::from_credentials([Credential::new(
            "example.com",
            "/",
            "Aladdin",
            "open sesame",
        )]);

        Session::builder().build(credentials)
    }

    const ALADDIN_AUTH: &str = "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==";

    fn client(transport: &std::sync::Arc<ScriptedTransport>) -> Client {
        Client {
            transport: transport.clone(),
            request_timeout: Some(Duration::from_secs(1)),
        }
    }

    #[tokio::test]
    async fn test_retry_seeds_the_authorization_cache() {
        let session = aladdin_session();

        let transport = std::sync::Arc::new(ScriptedTransport::new([
            unauthorized("Basic realm=\"WallyWorld\""),
            Response::new(200, "OK"),
            Response::new(200, "OK"),
        ]));

        let client = client(&transport);

        let url = Url::parse("http://example.com/dir/data").unwrap();

        // first request: no cached auth, challenged, retried
        let mut request = Request::new("GET", url.clone());

        let response = client
            .send_authenticated(&mut request, &session)
            .await
            .unwrap();

        assert_eq!(response.status_code(), 200);

        // second request to the same server goes out pre-authorized
        let mut request = Request::new("GET", url);

        let response = client
            .send_authenticated(&mut request, &session)
            .await
            .unwrap();

        assert_eq!(response.status_code(), 200);

        let attempts = transport.attempts.lock();

        assert_eq!(attempts.len(), 3);

        assert!(attempts[0].authorization.is_empty());
        assert_eq!(attempts[1].authorization, [ALADDIN_AUTH]);
        assert_eq!(attempts[2].authorization, [ALADDIN_AUTH]);
    }

    #[tokio::test]
    async fn test_request_body_is_replayed_on_retry() {
        let session = aladdin_session();

        let transport = std::sync::Arc::new(ScriptedTransport::new([
            unauthorized("Basic realm=\"WallyWorld\""),
            Response::new(200, "OK"),
        ]));

        let client = client(&transport);

        let url = Url::parse("http://example.com/upload").unwrap();

        let mut request = Request::new("POST", url);

        request.set_body(Body::from("payload"));

        let response = client
            .send_authenticated(&mut request, &session)
            .await
            .unwrap();

        assert_eq!(response.status_code(), 200);

        let attempts = transport.attempts.lock();

        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].body.as_deref(), Some(&b"payload"[..]));
        assert_eq!(attempts[1].body.as_deref(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn test_no_credentials_is_surfaced_after_the_last_challenge() {
        let session = aladdin_session();

        let transport = std::sync::Arc::new(ScriptedTransport::new([unauthorized(
            "Basic realm=\"a\", Digest realm=\"b\", nonce=\"n\"",
        )]));

        let client = client(&transport);

        // no credential matches this host
        let url = Url::parse("http://other.org/").unwrap();

        let mut request = Request::new("GET", url);

        let err = client
            .send_authenticated(&mut request, &session)
            .await
            .unwrap_err();

        assert!(err.is_no_credentials());

        // both challenges were tried without another request going out
        assert_eq!(transport.attempts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_scheme_aborts_the_iteration() {
        let session = aladdin_session();

        // "BASIC" parses but is not a scheme the builders recognize; the
        // valid challenge after it must not be tried
        let transport = std::sync::Arc::new(ScriptedTransport::new([unauthorized(
            "BASIC realm=\"a\", Basic realm=\"b\"",
        )]));

        let client = client(&transport);

        let url = Url::parse("http://example.com/").unwrap();

        let mut request = Request::new("GET", url);

        let err = client
            .send_authenticated(&mut request, &session)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnrecognizedScheme(scheme) if scheme == "BASIC"));
    }

    #[tokio::test]
    async fn test_missing_challenges_is_an_error() {
        let session = aladdin_session();

        let transport = std::sync::Arc::new(ScriptedTransport::new([Response::new(
            401,
            "Unauthorized",
        )]));

        let client = client(&transport);

        let url = Url::parse("http://example.com/").unwrap();

        let mut request = Request::new("GET", url);

        assert!(
            client
                .send_authenticated(&mut request, &session)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_persistent_unauthorized_response_is_returned() {
        let session = aladdin_session();

        let transport = std::sync::Arc::new(ScriptedTransport::new([
            unauthorized("Basic realm=\"WallyWorld\""),
            unauthorized("Basic realm=\"WallyWorld\""),
        ]));

        let client = client(&transport);

        let url = Url::parse("http://example.com/").unwrap();

        let mut request = Request::new("GET", url.clone());

        let response = client
            .send_authenticated(&mut request, &session)
            .await
            .unwrap();

        // the retry was still rejected; the last response is handed back
        // and nothing is cached
        assert_eq!(response.status_code(), 401);
        assert_eq!(session.authorization(&url), None);
    }

    struct StalledTransport;

    #[async_trait]
    impl Transport for StalledTransport {
        async fn send(&self, _: &mut Request) -> Result<Response, Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;

            Ok(Response::new(200, "OK"))
        }
    }

    #[tokio::test]
    async fn test_timeout_carries_the_url_and_wait() {
        let client = Client::builder()
            .request_timeout(Some(Duration::from_millis(20)))
            .build(StalledTransport);

        let url = Url::parse("http://example.com/slow").unwrap();

        let mut request = Request::new("GET", url);

        match client.send(&mut request).await {
            Err(Error::Timeout { url, wait }) => {
                assert_eq!(url, "http://example.com/slow");
                assert_eq!(wait, Duration::from_millis(20));
            }
            Err(err) => panic!("unexpected error: {err}"),
            Ok(_) => panic!("expected a timeout"),
        }
    }
}
