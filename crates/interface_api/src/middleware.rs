//! API middleware

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{info, warn};

use domain_party::{Actor, DirectoryPort};

use crate::auth::{validate_token, AuthError};
use crate::error::ApiError;
use crate::AppState;

/// Query parameter carrying the token where headers cannot be set (websockets)
const TOKEN_PARAM: &str = "access_token";

fn bearer_token(request: &Request<Body>) -> Option<String> {
    let from_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());

    from_header.or_else(|| {
        request.uri().query().and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == TOKEN_PARAM)
                .map(|(_, value)| value.to_string())
        })
    })
}

/// Authentication middleware
///
/// Validates the bearer token, loads the account and stores its [`Actor`] in
/// the request extensions.
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request<Body>, next: Next) -> Response {
    // Body is not Sync, so nothing borrowed from the request may live across an await
    let token = bearer_token(&request);
    let path = request.uri().path().to_string();

    match resolve_actor(&state, token, &path).await {
        Ok(actor) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(error) => error.into_response(),
    }
}

async fn resolve_actor(state: &AppState, token: Option<String>, path: &str) -> Result<Actor, ApiError> {
    let token = token.ok_or_else(|| {
        warn!(path, "missing bearer token");
        AuthError::MissingToken
    })?;
    let claims = validate_token(&token, &state.config.jwt_secret)?;
    let user_id = claims.user_id()?;

    let user = state.directory.get_user(user_id).await.map_err(|error| {
        warn!(user = %user_id, %error, "token subject not loadable");
        ApiError::Unauthorized
    })?;
    Ok(user.actor())
}

/// Audit logging middleware
///
/// Logs every authenticated call with the acting user.
pub async fn audit_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let user = request
        .extensions()
        .get::<Actor>()
        .map(|a| a.user_id.to_string())
        .unwrap_or_else(|| "anonymous".to_string());

    let start = Utc::now();

    let response = next.run(request).await;

    let duration = Utc::now() - start;
    let status = response.status();

    info!(
        method = %method,
        path = %path,
        user = %user,
        status = %status.as_u16(),
        duration_ms = duration.num_milliseconds(),
        "API request"
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_header_token_wins() {
        let req = request("/ws?access_token=query", Some("Bearer header"));
        assert_eq!(bearer_token(&req).as_deref(), Some("header"));
    }

    #[test]
    fn test_query_token_fallback() {
        let req = request("/ws?x=1&access_token=abc", None);
        assert_eq!(bearer_token(&req).as_deref(), Some("abc"));
    }

    // Compiles only while the middleware future stays Send
    #[allow(dead_code)]
    fn auth_future_is_send(state: AppState, request: Request<Body>, next: Next) {
        fn is_send<T: Send>(_: &T) {}
        is_send(&auth_middleware(State(state), request, next));
    }

    #[test]
    fn test_other_schemes_are_ignored() {
        let req = request("/history", Some("Basic dXNlcjpwdw=="));
        assert!(bearer_token(&req).is_none());
    }
}
