use crate::server::{Feed, ServerError, ServerRouter, json::Json};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use qudpro_feed::engine::FeedView;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new().typed_get(get_feed)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/feed", rejection(ServerError))]
struct FeedPath();

async fn get_feed(FeedPath(): FeedPath, State(feed): State<Arc<Feed>>) -> Json<FeedView> {
    Json(feed.view())
}
