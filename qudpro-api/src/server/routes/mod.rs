use crate::server::ServerRouter;
use axum::Router;

mod events;
mod feed;
mod posts;

pub fn routes() -> ServerRouter {
    Router::new()
        .merge(feed::routes())
        .merge(posts::routes())
        .merge(events::routes())
}
