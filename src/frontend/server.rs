use std::net::SocketAddr;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response as HttpResponse},
    routing::{get, put},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::error::Result;
use crate::frontend::protocol::{Request, Response, SubmitBody};
use crate::frontend::responder::Frontend;
use crate::scheduler::{HostId, JobId};

impl IntoResponse for Response {
    fn into_response(self) -> HttpResponse {
        let code = match &self {
            Response::Submitted(_) => StatusCode::CREATED,
            Response::BadRequest => StatusCode::BAD_REQUEST,
            Response::NotImplemented => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::OK,
        };
        (code, self.payload()).into_response()
    }
}

/// Routes for the `serve` resource.
///
/// The router expects `ConnectInfo<SocketAddr>`; the caller's IP is its host id.
pub fn router(frontend: Frontend) -> Router {
    Router::new()
        .route(
            "/serve/status",
            get(status_handler).fallback(not_implemented_handler),
        )
        .route(
            "/serve",
            put(submit_handler).fallback(not_implemented_handler),
        )
        .route(
            "/serve/:job_id",
            get(fetch_handler).fallback(not_implemented_handler),
        )
        .fallback(not_implemented_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(frontend)
}

/// Serve the frontend on an already bound listener until `shutdown` fires.
pub async fn serve(
    listener: TcpListener,
    frontend: Frontend,
    shutdown: CancellationToken,
) -> Result<()> {
    tracing::info!(addr = ?listener.local_addr().ok(), "Starting frontend server");
    let app = router(frontend).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

async fn status_handler(
    State(frontend): State<Frontend>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
) -> Response {
    frontend
        .handle(&HostId::from(remote.ip()), Request::Status)
        .await
}

async fn submit_handler(
    State(frontend): State<Frontend>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    body: std::result::Result<Json<SubmitBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(remote = %remote, error = %e, "Malformed submit body");
            return Response::BadRequest;
        }
    };
    let request = Request::Submit {
        input: body.input,
        program: body.program,
    };
    frontend.handle(&HostId::from(remote.ip()), request).await
}

async fn fetch_handler(
    State(frontend): State<Frontend>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    Path(job_id): Path<String>,
) -> Response {
    let Ok(job_id) = job_id.parse::<JobId>() else {
        return Response::BadRequest;
    };
    frontend
        .handle(&HostId::from(remote.ip()), Request::Fetch { job_id })
        .await
}

async fn not_implemented_handler() -> Response {
    Response::NotImplemented
}
