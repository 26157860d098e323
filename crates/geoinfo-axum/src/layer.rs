//! Tower middleware layer for bearer authentication and authorization.
//!
//! The [`AuthLayer`] runs once per request: it resolves the security context
//! from the `Authorization` header, then walks the ordered authorization
//! rules. Allowed requests continue with the context in their extensions;
//! denied requests are answered here with a JSON error.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::response::IntoResponse;
use geoinfo_auth_core::{
    AuthError, AuthorizationPolicy, Decision, Denial, SecurityContext, TokenService,
};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::context::AuthContextExt;
use crate::error::AuthRejection;

/// Tower layer that authenticates and authorizes requests.
#[derive(Clone)]
pub struct AuthLayer {
    tokens: Arc<TokenService>,
    policy: Arc<AuthorizationPolicy>,
}

impl AuthLayer {
    #[must_use]
    pub fn new(tokens: Arc<TokenService>, policy: Arc<AuthorizationPolicy>) -> Self {
        Self { tokens, policy }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            tokens: Arc::clone(&self.tokens),
            policy: Arc::clone(&self.policy),
        }
    }
}

/// The authentication service produced by [`AuthLayer`].
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    tokens: Arc<TokenService>,
    policy: Arc<AuthorizationPolicy>,
}

impl<S> AuthMiddleware<S> {
    fn security_context(&self, req: &Request<Body>) -> SecurityContext {
        match req.headers().get(header::AUTHORIZATION) {
            None => SecurityContext::Anonymous,
            Some(value) => match value.to_str() {
                Ok(value) => self.tokens.authenticate(Some(value)),
                Err(_) => SecurityContext::Rejected(AuthError::TokenMalformed),
            },
        }
    }
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = AuthFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let ctx = self.security_context(&req);
        let decision = self.policy.evaluate(req.uri().path(), req.method(), &ctx);
        metrics::counter!("gateway_auth_decisions_total", "outcome" => outcome_label(&decision))
            .increment(1);

        match decision {
            Decision::Allow => {
                req.extensions_mut().insert(AuthContextExt(ctx));

                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                AuthFuture {
                    state: FutureState::Calling {
                        future: inner.call(req),
                    },
                }
            }
            Decision::Deny(denial) => {
                let error = denial.into_error();
                tracing::debug!(
                    method = %req.method(),
                    path = req.uri().path(),
                    code = error.error_code(),
                    "Request denied"
                );
                AuthFuture {
                    state: FutureState::Rejected {
                        response: Some(AuthRejection(error).into_response()),
                    },
                }
            }
        }
    }
}

fn outcome_label(decision: &Decision) -> &'static str {
    match decision {
        Decision::Allow => "allow",
        Decision::Deny(Denial::Unauthenticated { .. }) => "unauthenticated",
        Decision::Deny(Denial::Forbidden { .. }) => "forbidden",
        Decision::Deny(Denial::NoMatchingRule) => "no_matching_rule",
    }
}

pin_project! {
    /// Future for the [`AuthMiddleware`] service.
    pub struct AuthFuture<F> {
        #[pin]
        state: FutureState<F>,
    }
}

pin_project! {
    #[project = FutureStateProj]
    enum FutureState<F> {
        Rejected {
            response: Option<Response<Body>>,
        },
        Calling {
            #[pin]
            future: F,
        },
    }
}

impl<F, E> Future for AuthFuture<F>
where
    F: Future<Output = Result<Response<Body>, E>>,
{
    type Output = Result<Response<Body>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            FutureStateProj::Rejected { response } => match response.take() {
                Some(response) => Poll::Ready(Ok(response)),
                None => panic!("polled after completion"),
            },
            FutureStateProj::Calling { future } => future.poll(cx),
        }
    }
}
