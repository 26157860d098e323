//! CORS middleware built on `tower_http::cors`.
//!
//! Every [`CorsRule`] becomes one tower-http [`cors::CorsLayer`] and each
//! request is handed to the layer of the first rule whose path pattern
//! matches. Paths without a rule go through a layer that allows no origin.
//! Sits outside [`crate::AuthLayer`]: preflights are answered here and never
//! reach authentication, and every cross-origin response leaves through
//! here to pick up its CORS headers.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::request::Parts;
use axum::http::{HeaderValue, Request, Response};
use geoinfo_auth_core::{AllowedHeaders, CorsPolicy, CorsRule};
use tower::{Layer, Service};
use tower_http::cors::{self, AllowCredentials, AllowHeaders, AllowOrigin};

/// Tower layer applying a [`CorsPolicy`].
#[derive(Clone)]
pub struct CorsLayer {
    policy: Arc<CorsPolicy>,
    /// One layer per rule, then the catch-all for unmatched paths
    layers: Arc<[cors::CorsLayer]>,
}

impl CorsLayer {
    #[must_use]
    pub fn new(policy: Arc<CorsPolicy>) -> Self {
        let layers = policy
            .rules()
            .iter()
            .map(|rule| rule_layer(Arc::new(rule.clone())))
            .chain(std::iter::once(unmatched_layer()))
            .collect();
        Self { policy, layers }
    }
}

impl<S> Layer<S> for CorsLayer {
    type Service = CorsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorsMiddleware {
            inner,
            policy: Arc::clone(&self.policy),
            layers: Arc::clone(&self.layers),
        }
    }
}

/// The CORS service produced by [`CorsLayer`].
#[derive(Clone)]
pub struct CorsMiddleware<S> {
    inner: S,
    policy: Arc<CorsPolicy>,
    layers: Arc<[cors::CorsLayer]>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CorsMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone,
    ResBody: Default,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = cors::ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let index = self
            .policy
            .rule_index(req.uri().path())
            .unwrap_or(self.layers.len() - 1);

        // The service that was driven to readiness handles this request
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        self.layers[index].layer(inner).call(req)
    }
}

fn rule_layer(rule: Arc<CorsRule>) -> cors::CorsLayer {
    let allow_headers = match &rule.allowed_headers {
        AllowedHeaders::Any => AllowHeaders::mirror_request(),
        AllowedHeaders::List(names) => AllowHeaders::list(names.clone()),
    };

    let layer = cors::CorsLayer::new()
        .allow_origin(AllowOrigin::predicate({
            let rule = Arc::clone(&rule);
            move |origin: &HeaderValue, parts: &Parts| {
                let allowed = origin.to_str().is_ok_and(|o| rule.allows_origin(o));
                if !allowed {
                    reject(parts, "Origin not allowed");
                }
                allowed
            }
        }))
        .allow_methods(rule.allowed_methods.clone())
        .allow_headers(allow_headers)
        .expose_headers(rule.exposed_headers.clone())
        .max_age(rule.max_age);

    if !rule.allow_credentials {
        return layer;
    }

    // Only granted alongside an echoed origin
    layer.allow_credentials(AllowCredentials::predicate(
        move |origin: &HeaderValue, _: &Parts| {
            origin.to_str().is_ok_and(|o| rule.allows_origin(o))
        },
    ))
}

fn unmatched_layer() -> cors::CorsLayer {
    cors::CorsLayer::new().allow_origin(AllowOrigin::predicate(
        |_: &HeaderValue, parts: &Parts| {
            reject(parts, "No CORS rule for path");
            false
        },
    ))
}

fn reject(parts: &Parts, reason: &'static str) {
    metrics::counter!("gateway_cors_rejections_total").increment(1);
    tracing::debug!(
        method = %parts.method,
        path = parts.uri.path(),
        reason,
        "Cross-origin request not allowed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use geoinfo_auth_core::CorsRuleSpec;
    use tower::ServiceExt;

    fn app() -> Router {
        app_with(CorsPolicy::incident_platform())
    }

    fn app_with(policy: CorsPolicy) -> Router {
        Router::new()
            .route(
                "/api/incidents",
                get(|| async { ([(header::VARY, "Accept-Encoding")], "[]") }),
            )
            .route("/uploads/photo.jpg", get(|| async { "jpeg" }))
            .layer(CorsLayer::new(Arc::new(policy)))
    }

    fn request(method: Method, origin: Option<&str>, preflight: bool) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/api/incidents");
        if let Some(origin) = origin {
            builder = builder.header(header::ORIGIN, origin);
        }
        if preflight {
            builder = builder
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization, content-type");
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_preflight_is_answered_directly() {
        let response = app()
            .oneshot(request(Method::OPTIONS, Some("https://foo.ngrok-free.app"), true))
            .await
            .unwrap();

        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://foo.ngrok-free.app"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "3600");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "authorization, content-type"
        );
        assert!(headers[header::ACCESS_CONTROL_ALLOW_METHODS]
            .to_str()
            .unwrap()
            .contains("POST"));
    }

    #[tokio::test]
    async fn test_rejected_preflight_has_no_cors_headers() {
        let response = app()
            .oneshot(request(Method::OPTIONS, Some("https://evil.example.com"), true))
            .await
            .unwrap();

        let headers = response.headers();
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn test_actual_request_is_decorated() {
        let response = app()
            .oneshot(request(Method::GET, Some("http://localhost:5173"), false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
        let vary: Vec<String> = headers
            .get_all(header::VARY)
            .iter()
            .map(|v| v.to_str().unwrap().to_ascii_lowercase())
            .collect();
        assert!(vary.iter().any(|v| v == "accept-encoding"));
        assert!(vary.iter().any(|v| v.contains("origin")));
        assert!(headers
            .get(header::ACCESS_CONTROL_EXPOSE_HEADERS)
            .is_some_and(|v| v.to_str().unwrap().contains("authorization")));
    }

    #[tokio::test]
    async fn test_unmatched_origin_still_reaches_handler() {
        let response = app()
            .oneshot(request(Method::GET, Some("https://evil.example.com"), false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).is_none());
    }

    #[tokio::test]
    async fn test_oversized_origin_is_not_echoed() {
        let hostile = format!("http://10.{}_", ".1".repeat(2_000));
        let response = app()
            .oneshot(request(Method::GET, Some(&hostile), false))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_same_origin_request_untouched() {
        let response = app().oneshot(request(Method::GET, None, false)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_rule_chosen_by_path() {
        let api_only = CorsRuleSpec {
            path: "/api/**".into(),
            allowed_origin_patterns: vec!["https://*.netlify.app".into()],
            allowed_methods: vec!["GET".into()],
            allowed_headers: vec!["*".into()],
            exposed_headers: vec![],
            allow_credentials: false,
            max_age: 600,
        };
        let policy = CorsPolicy::from_specs(vec![api_only]).unwrap();

        let get_from = |uri: &str| {
            Request::builder()
                .uri(uri)
                .header(header::ORIGIN, "https://site.netlify.app")
                .body(Body::empty())
                .unwrap()
        };

        let response = app_with(policy.clone())
            .oneshot(get_from("/api/incidents"))
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://site.netlify.app"
        );
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_none());

        let response = app_with(policy)
            .oneshot(get_from("/uploads/photo.jpg"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
