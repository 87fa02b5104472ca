use axum::{
    body::Body,
    extract::State,
    http::{
        header::{self, HeaderValue},
        Method, Request, Response, StatusCode,
    },
    middleware::Next,
};
use tracing::debug;

/// Origin policy for the browser client
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    reflect_any: bool,
}

impl CorsPolicy {
    /// A `*` entry reflects any origin, but never in production
    pub fn new(allowed_origins: Vec<String>, is_production: bool) -> Self {
        let has_wildcard = allowed_origins.iter().any(|o| o == "*");
        Self {
            allowed_origins: allowed_origins.into_iter().filter(|o| o != "*").collect(),
            reflect_any: has_wildcard && !is_production,
        }
    }

    pub fn allowed_origin(&self, origin: Option<&str>) -> Option<HeaderValue> {
        let origin = origin?;
        let allowed = if self.reflect_any {
            debug!("CORS: Reflecting origin for non-production: {}", origin);
            true
        } else {
            let listed = self.allowed_origins.iter().any(|o| o == origin);
            debug!("CORS: Origin {} allowed: {}", origin, listed);
            listed
        };

        if allowed {
            HeaderValue::from_str(origin).ok()
        } else {
            None
        }
    }
}

/// CORS with credentials; preflights are answered here
pub async fn dynamic_cors_middleware(
    State(policy): State<CorsPolicy>,
    req: Request<Body>,
    next: Next,
) -> Response<Body> {
    let allowed_origin = policy.allowed_origin(
        req.headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok()),
    );

    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());

        if let Some(allowed) = allowed_origin {
            let headers = response.headers_mut();
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
            );
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, authorization, accept, origin"),
            );
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("3600"));
        }

        *response.status_mut() = StatusCode::OK;
        return response;
    }

    let mut response = next.run(req).await;

    if let Some(allowed) = allowed_origin {
        response
            .headers_mut()
            .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allowed);
        response.headers_mut().insert(
            header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("true"),
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_reflects_outside_production() {
        let policy = CorsPolicy::new(vec!["*".to_string()], false);
        assert_eq!(
            policy.allowed_origin(Some("http://localhost:5173")),
            Some(HeaderValue::from_static("http://localhost:5173"))
        );
    }

    #[test]
    fn test_production_uses_whitelist_only() {
        let policy = CorsPolicy::new(
            vec!["*".to_string(), "https://loged.in".to_string()],
            true,
        );
        assert!(policy.allowed_origin(Some("https://evil.example")).is_none());
        assert!(policy.allowed_origin(Some("https://loged.in")).is_some());
        assert!(policy.allowed_origin(None).is_none());
    }
}
