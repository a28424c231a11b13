// API module entry
// Book REST endpoints and the request router

mod error;
mod handlers;
mod response;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{CONTENT_LENGTH, ORIGIN};
use hyper::{Method, Request, Response};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::AppState;
use crate::http::{self, OriginCheck};
use crate::logger;

pub use error::{ApiError, ApiResult};
pub use handlers::BookHandler;

/// Resolved book route
#[derive(Debug, PartialEq, Eq)]
enum Route<'a> {
    /// `/books`
    Books,
    /// `/book/:id`, id not yet parsed
    Book(&'a str),
}

impl<'a> Route<'a> {
    fn resolve(path: &'a str) -> Option<Self> {
        if path == "/books" || path == "/books/" {
            return Some(Self::Books);
        }
        let id = path.strip_prefix("/book/")?;
        let id = id.strip_suffix('/').unwrap_or(id);
        if id.is_empty() || id.contains('/') {
            return None;
        }
        Some(Self::Book(id))
    }

    const fn allow(&self) -> &'static str {
        match self {
            Self::Books => "GET, POST, OPTIONS",
            Self::Book(_) => "GET, PUT, DELETE, OPTIONS",
        }
    }
}

/// Main entry point for HTTP request handling
///
/// Applies the cross-origin policy, answers preflights and health probes,
/// then dispatches book routes to the handler.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let origin = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let preflight = method == Method::OPTIONS;

    let mut response = if state.cors.check(origin.as_deref()) == OriginCheck::Denied {
        logger::log_warning(&format!(
            "Rejected {method} {path} from origin {}",
            origin.as_deref().unwrap_or_default()
        ));
        ApiError::Forbidden.into_response()
    } else if preflight {
        http::build_options_response(state.cors.allowed_methods())
    } else {
        dispatch(req, &state)
            .await
            .unwrap_or_else(ApiError::into_response)
    };

    state
        .cors
        .apply(response.headers_mut(), origin.as_deref(), preflight);
    http::set_server_header(&mut response, &state.config.http.server_name);
    logger::log_api_request(method.as_str(), &path, response.status().as_u16());
    Ok(response)
}

async fn dispatch<B>(req: Request<B>, state: &AppState) -> ApiResult<Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    // Health check endpoints (highest priority)
    let health = &state.config.health;
    if health.enabled && (method == Method::GET || method == Method::HEAD) {
        if path == health.liveness_path {
            return Ok(http::build_health_response(true));
        }
        if path == health.readiness_path {
            return Ok(http::build_health_response(state.books.ready().await));
        }
    }

    let Some(route) = Route::resolve(&path) else {
        return Err(ApiError::NotFound("Not found".to_string()));
    };

    check_body_size(&req, state.config.http.max_body_size)?;

    let books = &state.books;
    match (&method, route) {
        (&Method::GET, Route::Books) => books.list().await,
        (&Method::POST, Route::Books) => books.create(req.into_body()).await,
        (&Method::GET, Route::Book(id)) => books.get(id).await,
        (&Method::PUT, Route::Book(id)) => books.update(id, req.into_body()).await,
        (&Method::DELETE, Route::Book(id)) => books.delete(id).await,
        (_, route) => {
            logger::log_warning(&format!("Method not allowed: {method} {path}"));
            Err(ApiError::MethodNotAllowed {
                allow: route.allow().to_string(),
            })
        }
    }
}

/// Reject early when the declared Content-Length exceeds the limit
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> ApiResult<()> {
    let Some(content_length) = req.headers().get(CONTENT_LENGTH) else {
        return Ok(());
    };
    match content_length.to_str().ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Err(ApiError::PayloadTooLarge)
        }
        Some(_) => Ok(()),
        None => Err(ApiError::BadRequest(
            "Invalid Content-Length header".to_string(),
        )),
    }
}
