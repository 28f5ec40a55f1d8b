//! HTTP Basic authentication.

use base64::{display::Base64Display, prelude::BASE64_STANDARD};

use htkit::{Error, Request};

use crate::{Challenge, Session};

/// Produce a Basic `Authorization` header value for a given challenge.
pub(crate) fn authorization(
    challenge: &Challenge,
    session: &Session,
    request: &Request,
) -> Result<String, Error> {
    let (username, password) = session.login(request.url(), &challenge.realm)?;

    let credentials = format!("{username}:{password}");

    let b64c = Base64Display::new(credentials.as_bytes(), &BASE64_STANDARD);

    Ok(format!("Basic {b64c}"))
}
