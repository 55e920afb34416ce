use crate::{generator::RandomPostSource, store::Store};
use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use json::Json;
use qudpro_feed::{FeedEngine, FeedError, SourceError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::error;

mod json;
mod routes;

pub type Feed = FeedEngine<Store, RandomPostSource>;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub feed: Arc<Feed>,
    /// Cancelled when the server shuts down, ending open event streams.
    pub shutdown: CancellationToken,
}

pub fn routes() -> ServerRouter {
    routes::routes().fallback(fallback)
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("The edit did not change any field.")]
    EmptyPatch,
    #[error(transparent)]
    Feed(#[from] FeedError),
    #[error(transparent)]
    Source(#[from] SourceError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::Feed(FeedError::NotFound(_))
            | ServerError::Source(SourceError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServerError::PathRejection(_)
            | ServerError::JsonRejection(_)
            | ServerError::EmptyPatch => StatusCode::BAD_REQUEST,
            ServerError::Feed(FeedError::NotPersisted(_)) => StatusCode::CONFLICT,
            ServerError::Feed(
                FeedError::DeleteRejected { .. }
                | FeedError::UpdateRejected { .. }
                | FeedError::CommentRejected { .. },
            )
            | ServerError::Source(SourceError::Unavailable(_) | SourceError::Rejected { .. }) => {
                StatusCode::BAD_GATEWAY
            }
            ServerError::JsonResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}
