//! Request logging for the read API.

use std::future::{Ready, ready};
use std::time::Instant;

use actix_web::Error;
use actix_web::http::StatusCode;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, error, info, warn};

/// Logs each completed request at a level chosen by its status class.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let limit = req
            .query_string()
            .split('&')
            .find_map(|pair| pair.strip_prefix("limit="))
            .map(str::to_string);

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            log_completion(
                &method,
                &path,
                limit.as_deref(),
                res.status(),
                start.elapsed().as_millis(),
            );
            Ok(res)
        })
    }
}

/// Health and readiness checks are polled frequently; keep them quiet.
fn is_health_check(path: &str) -> bool {
    path.ends_with("/health") || path.ends_with("/ready")
}

fn log_completion(method: &str, path: &str, limit: Option<&str>, status: StatusCode, duration_ms: u128) {
    let limit = limit.unwrap_or("-");
    let status_code = status.as_u16();

    if status.is_server_error() {
        error!(target: "api", method, path, limit, status = status_code, duration_ms = %duration_ms, "request failed");
    } else if status.is_client_error() {
        warn!(target: "api", method, path, limit, status = status_code, duration_ms = %duration_ms, "request rejected");
    } else if is_health_check(path) {
        debug!(target: "api", method, path, status = status_code, duration_ms = %duration_ms, "health check answered");
    } else {
        info!(target: "api", method, path, limit, status = status_code, duration_ms = %duration_ms, "request served");
    }
}
