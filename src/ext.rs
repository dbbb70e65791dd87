use http::uri::Scheme;
use http::{Method, StatusCode};

pub(crate) trait MethodExt {
    fn permits_request_body(&self) -> bool;
    fn requires_request_body(&self) -> bool;
}

impl MethodExt for Method {
    fn permits_request_body(&self) -> bool {
        !matches!(*self, Method::GET | Method::HEAD)
    }

    fn requires_request_body(&self) -> bool {
        matches!(*self, Method::POST | Method::PUT | Method::PATCH)
            || self.as_str() == "PROPPATCH"
            || self.as_str() == "REPORT"
    }
}

pub(crate) trait StatusExt {
    /// Redirects that must keep the method of the original request.
    fn is_redirect_retaining_status(&self) -> bool;

    /// Statuses we can build a redirect follow-up for.
    fn is_followable_redirect(&self) -> bool;
}

impl StatusExt for StatusCode {
    fn is_redirect_retaining_status(&self) -> bool {
        *self == StatusCode::TEMPORARY_REDIRECT || *self == StatusCode::PERMANENT_REDIRECT
    }

    fn is_followable_redirect(&self) -> bool {
        // 304 is a redirect code, but it has no location header and
        // thus we don't consider it a redirection.
        self.is_redirection() && *self != StatusCode::NOT_MODIFIED
    }
}

pub(crate) trait SchemeExt {
    fn default_port(&self) -> Option<u16>;
}

impl SchemeExt for Scheme {
    fn default_port(&self) -> Option<u16> {
        if *self == Scheme::HTTPS {
            Some(443)
        } else if *self == Scheme::HTTP {
            Some(80)
        } else {
            None
        }
    }
}
