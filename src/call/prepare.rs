use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use http::uri::Scheme;
use http::{header, HeaderValue, Request, Uri};

use crate::ext::{MethodExt, SchemeExt};
use crate::util::AuthorityExt;
use crate::{Body, Error};

/// Fill in the headers the transport needs to send `request`.
///
/// Headers set by the user are left alone, apart from the body framing
/// which always follows the body.
pub(crate) fn prepare(mut request: Request<Body>) -> Result<Request<Body>, Error> {
    let uri = request.uri();

    if uri.scheme().is_none() || uri.host().is_none() {
        return Err(Error::BadRequest(format!("missing scheme or host: {}", uri)));
    }

    let method = request.method();
    let body = request.body();

    if !body.is_empty() && !method.permits_request_body() {
        return Err(Error::BadRequest(format!("{} must not have a body", method)));
    }
    if body.is_empty() && method.requires_request_body() {
        return Err(Error::BadRequest(format!("{} must have a body", method)));
    }

    let content_type = body.content_type().cloned();
    let content_length = body.content_length();
    let chunked = body.is_chunked();

    let host = if request.headers().contains_key(header::HOST) {
        None
    } else {
        Some(host_header(request.uri())?)
    };

    let basic_auth = if request.headers().contains_key(header::AUTHORIZATION) {
        None
    } else {
        basic_auth(request.uri())?
    };

    let headers = request.headers_mut();

    if let Some(value) = content_type {
        trace!("Set content-type from body: {:?}", value);
        headers.insert(header::CONTENT_TYPE, value);
    }

    if let Some(len) = content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        headers.remove(header::TRANSFER_ENCODING);
    } else if chunked {
        headers.insert(
            header::TRANSFER_ENCODING,
            HeaderValue::from_static("chunked"),
        );
        headers.remove(header::CONTENT_LENGTH);
    }

    if let Some(value) = host {
        trace!("Set host header: {:?}", value);
        headers.insert(header::HOST, value);
    }

    if let Some(value) = basic_auth {
        trace!("Set basic authorization from uri userinfo");
        headers.insert(header::AUTHORIZATION, value);
    }

    Ok(request)
}

fn host_header(uri: &Uri) -> Result<HeaderValue, Error> {
    fn from_str(src: &str) -> Result<HeaderValue, Error> {
        HeaderValue::from_str(src).map_err(|e| Error::BadHeader(e.to_string()))
    }

    let host = uri.host().unwrap_or_default();

    if let Some(port) = uri.port_u16() {
        let scheme = uri.scheme().unwrap_or(&Scheme::HTTP);
        if scheme.default_port() != Some(port) {
            return from_str(&format!("{}:{}", host, port));
        }
    }

    from_str(host)
}

fn basic_auth(uri: &Uri) -> Result<Option<HeaderValue>, Error> {
    let Some(auth) = uri.authority() else {
        return Ok(None);
    };

    if auth.userinfo().is_none() {
        return Ok(None);
    }

    let user = auth.username().unwrap_or_default();
    let pass = auth.password().unwrap_or_default();
    let creds = BASE64_STANDARD.encode(format!("{}:{}", user, pass));

    let mut value = HeaderValue::from_str(&format!("Basic {}", creds))
        .map_err(|e| Error::BadHeader(e.to_string()))?;
    value.set_sensitive(true);

    Ok(Some(value))
}
