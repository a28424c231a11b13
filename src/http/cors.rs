//! Cross-origin policy
//!
//! Browser clients are allowed from exactly one configured origin. Requests
//! without an `Origin` header are not cross-origin and pass untouched;
//! requests from any other origin are refused.

use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};

use crate::config::CorsConfig;

/// Result of checking a request's `Origin`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginCheck {
    /// No `Origin` header
    NotCors,
    Allowed,
    Denied,
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_origin: String,
    allow_methods: String,
    allow_headers: String,
    max_age_secs: u64,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            allow_origin: config.allow_origin.trim_end_matches('/').to_string(),
            allow_methods: config.allow_methods.join(", "),
            allow_headers: config.allow_headers.join(", "),
            max_age_secs: config.max_age_secs,
        }
    }

    pub fn check(&self, origin: Option<&str>) -> OriginCheck {
        match origin {
            None => OriginCheck::NotCors,
            Some(o) if o.trim_end_matches('/').eq_ignore_ascii_case(&self.allow_origin) => {
                OriginCheck::Allowed
            }
            Some(_) => OriginCheck::Denied,
        }
    }

    /// Value for the `Allow` header on preflight and 405 responses
    pub fn allowed_methods(&self) -> &str {
        &self.allow_methods
    }

    /// Add CORS headers for an allowed origin; `preflight` adds the
    /// method/header/max-age set answered to `OPTIONS`
    ///
    /// `Vary: Origin` is set on every response.
    pub fn apply(&self, headers: &mut HeaderMap, origin: Option<&str>, preflight: bool) {
        headers.append(VARY, HeaderValue::from_static("Origin"));
        if self.check(origin) != OriginCheck::Allowed {
            return;
        }
        let Some(origin) = origin.and_then(|o| HeaderValue::from_str(o).ok()) else {
            return;
        };
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);

        if preflight {
            if let Ok(v) = HeaderValue::from_str(&self.allow_methods) {
                headers.insert(ACCESS_CONTROL_ALLOW_METHODS, v);
            }
            if let Ok(v) = HeaderValue::from_str(&self.allow_headers) {
                headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, v);
            }
            headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age_secs));
        }
    }
}
