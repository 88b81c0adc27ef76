use axum::{
    extract::{ConnectInfo, MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use uuid::Uuid;

/// Logs every request on the way in and its outcome on the way out.
pub async fn request_logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().clone();
    let matched_path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_owned())
        .unwrap_or_else(|| "unknown".to_owned());
    let remote_addr = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(
        request_id = %request_id,
        method = %method,
        path = %matched_path,
        uri = %uri,
        remote_addr = %remote_addr,
        "incoming request"
    );

    let response = next.run(req).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();

    match status_class(status) {
        StatusClass::ServerError => tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "request completed (server error)"
        ),
        StatusClass::ClientError => tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "request completed (client error)"
        ),
        StatusClass::Ok => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %matched_path,
            status = status.as_u16(),
            duration_ms = %duration_ms,
            "request completed"
        ),
    }

    response
}

#[derive(Debug, PartialEq)]
enum StatusClass {
    Ok,
    ClientError,
    ServerError,
}

fn status_class(status: StatusCode) -> StatusClass {
    if status.is_server_error() {
        StatusClass::ServerError
    } else if status.is_client_error() {
        StatusClass::ClientError
    } else {
        StatusClass::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(StatusCode::OK), StatusClass::Ok);
        assert_eq!(status_class(StatusCode::FOUND), StatusClass::Ok);
        assert_eq!(status_class(StatusCode::NOT_FOUND), StatusClass::ClientError);
        assert_eq!(status_class(StatusCode::BAD_GATEWAY), StatusClass::ServerError);
    }
}
