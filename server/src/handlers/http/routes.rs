use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode};
use serde_json::json;
use tracing::{error, warn};

use crate::AppState;
use crate::auth::VerifiedSession;
use crate::handlers::http::auth::{self, guard};
use crate::handlers::http::utils::deliver::full;
use crate::handlers::http::utils::json_response;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>;

// ---------------------------------------------------------------------------
// Handler type aliases
// ---------------------------------------------------------------------------
//
// Two security tiers:
//
//   RouteHandler    — no auth.  Receives (req, state).
//                     Use for: /login, /refresh, /health.
//
//   SessionHandler  — container + identity token verified, XSRF header
//                     checked against the identity token.
//                     Receives (req, state, session).

type RouteHandler<B> = Box<dyn Fn(Request<B>, AppState) -> HandlerFuture + Send + Sync>;

type SessionHandler<B> =
    Box<dyn Fn(Request<B>, AppState, VerifiedSession) -> HandlerFuture + Send + Sync>;

enum RouteKind<B> {
    /// No authentication check.
    Open(RouteHandler<B>),

    /// Full session check (tokens + XSRF) before the handler runs.
    Session(SessionHandler<B>),
}

struct Route<B> {
    method: Method,
    path: String,
    kind: RouteKind<B>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Method + path dispatch. Generic over the request body so the same table
/// serves hyper's `Incoming` and in-memory bodies in tests.
pub struct Router<B = hyper::body::Incoming> {
    routes: Vec<Route<B>>,
}

impl<B> std::fmt::Debug for Router<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl<B> Default for Router<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Router<B> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    fn open<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<B>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Open(Box::new(move |req, state| Box::pin(handler(req, state)))),
        });
        self
    }

    fn session<F, Fut>(mut self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(Request<B>, AppState, VerifiedSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            kind: RouteKind::Session(Box::new(move |req, state, session| {
                Box::pin(handler(req, state, session))
            })),
        });
        self
    }

    // ── Open (no auth) ────────────────────────────────────────────────────────

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<B>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.open(Method::GET, path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<B>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.open(Method::POST, path, handler)
    }

    // ── Session auth (tokens + XSRF) ─────────────────────────────────────────
    //
    // The router authenticates before the handler is called. Handlers
    // receive the `VerifiedSession` and must NOT repeat the check.

    pub fn get_session<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<B>, AppState, VerifiedSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.session(Method::GET, path, handler)
    }

    pub fn post_session<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<B>, AppState, VerifiedSession) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.session(Method::POST, path, handler)
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub async fn route(
        &self,
        req: Request<B>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        for route in &self.routes {
            if route.method != method || route.path != path {
                continue;
            }

            return match &route.kind {
                RouteKind::Open(h) => h(req, state).await,

                RouteKind::Session(h) => match guard::authenticate_request(&req, &state) {
                    Ok(session) => h(req, state, session).await,
                    Err(e) => {
                        warn!("Session rejected {} {}: {:?}", method, path, e);
                        json_response::deliver_auth_error(&e)
                    }
                },
            };
        }

        json_response::deliver_error_json("NOT_FOUND", "Endpoint not found", StatusCode::NOT_FOUND)
            .context("Failed to deliver 404 response")
    }

    /// Service entry point: any handler error becomes a bare 500 so that no
    /// internal detail reaches the client.
    pub async fn handle(
        &self,
        req: Request<B>,
        state: AppState,
    ) -> std::result::Result<Response<BoxBody<Bytes, Infallible>>, Infallible> {
        match self.route(req, state).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!("Request failed: {:#}", e);
                Ok(internal_error())
            }
        }
    }
}

fn internal_error() -> Response<BoxBody<Bytes, Infallible>> {
    json_response::deliver_error_json(
        "INTERNAL_ERROR",
        "An internal error occurred",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .unwrap_or_else(|_| {
        let mut response = Response::new(full("Internal Server Error"));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}

// ---------------------------------------------------------------------------
// API router
//
//   .get / .post                  → Open     — handler gets (req, state)
//   .get_session / .post_session  → Session  — handler gets (req, state, session)
// ---------------------------------------------------------------------------

pub fn build_api_router<B: Send + 'static>() -> Router<B> {
    Router::new()
        .get("/api/health", |_req, _state| async move {
            json_response::deliver_serialized_json(&json!({}), StatusCode::OK)
        })
        // Login and refresh are open at the routing level: login needs no
        // session, and refresh verifies the tokens itself without XSRF.
        .post("/api/auth/login", |req, state| async move {
            auth::handle_login(req, state).await.context("Login failed")
        })
        .post("/api/auth/refresh", |req, state| async move {
            auth::handle_refresh(req, state)
                .await
                .context("Refresh failed")
        })
        .get_session("/api/auth/test", |req, state, session| async move {
            auth::handle_auth_test(req, state, session)
                .await
                .context("Auth test failed")
        })
        .post_session("/api/auth/test", |req, state, session| async move {
            auth::handle_auth_test(req, state, session)
                .await
                .context("Auth test failed")
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
