//! HTTP middleware (CORS, 404 handler)

use axum::Json;
use axum::extract::Request;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::IntoResponse;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Allowed origins configuration
#[derive(Debug, Clone)]
pub struct AllowedOrigins {
    origins: Vec<String>,
}

impl AllowedOrigins {
    /// Normalize configured origins; trailing slashes and blanks are dropped
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list: Vec<String> = Vec::new();
        for origin in origins {
            let origin = origin.as_ref().trim().trim_end_matches('/');
            if !origin.is_empty() && !list.iter().any(|o| o == origin) {
                list.push(origin.to_string());
            }
        }
        Self { origins: list }
    }

    /// Check if an origin is allowed
    pub fn is_allowed(&self, origin: &str) -> bool {
        self.origins.iter().any(|o| o == origin)
    }

    /// Get origins as HeaderValues for CORS
    fn as_header_values(&self) -> Vec<HeaderValue> {
        self.origins.iter().filter_map(|o| o.parse().ok()).collect()
    }
}

/// Create CORS layer
///
/// Credentials are allowed so browsers send the session cookie cross-origin.
pub fn cors(allowed: &AllowedOrigins) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed.as_header_values()))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true)
}

/// JSON 404 for unmatched routes
///
/// Logs method and path only; headers may carry session credentials.
pub async fn handle_404(req: Request) -> impl IntoResponse {
    tracing::debug!(method = %req.method(), path = %req.uri().path(), "No route matched");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "not_found",
            "code": "ROUTE_NOT_FOUND",
            "message": "Not found",
        })),
    )
}
