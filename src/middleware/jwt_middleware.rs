/// Bearer-token guard for the protected route scope.
///
/// Verifies the access token and places its `Claims` in the request
/// extensions, where handlers pick them up via `web::ReqData<Claims>`.
/// Rejections short-circuit with a 401 before the handler runs; the
/// registry is never consulted here, access tokens are signature-only.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::verify_token;
use crate::configuration::JwtSettings;

pub struct JwtMiddleware {
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(jwt_config: JwtSettings) -> Self {
        Self { jwt_config }
    }
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn rejection(code: &str, message: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "error": message,
        "code": code
    }));
    actix_web::error::InternalError::from_response("Unauthorized", response).into()
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = match bearer_token(&req) {
            Some(token) => token,
            None => {
                tracing::warn!("Request without a bearer token reached a protected route");
                let err = rejection(
                    "UNAUTHORIZED",
                    "Missing or invalid authorization header",
                );
                return Box::pin(async move { Err(err) });
            }
        };

        match verify_token(&token, &self.jwt_config) {
            Ok(claims) => {
                tracing::debug!(
                    user_id = %claims.sub,
                    session_id = %claims.sid,
                    "Access token accepted"
                );
                req.extensions_mut().insert(claims);

                let service = self.service.clone();
                Box::pin(async move { service.call(req).await })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Access token rejected");
                let err = rejection("TOKEN_INVALID", "Invalid or expired token");
                Box::pin(async move { Err(err) })
            }
        }
    }
}
