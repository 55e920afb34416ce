use crate::server::{Feed, Result, ServerError, ServerRouter, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use qudpro_common::model::{
    Id,
    comment::{Comment, CommentText},
    post::{Post, PostDraft, PostMarker, PostPatch},
};
use qudpro_feed::PersistedSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(create_post)
        .typed_post(toggle_like)
        .typed_post(add_comment)
        .typed_patch(edit_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPath();

/// Creates the post in the persisted store and rebuilds the feed around it.
async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(feed): State<Arc<Feed>>,
    Json(draft): Json<PostDraft>,
) -> Result<Json<Post>> {
    let post = feed.persisted().create(draft).await?;
    info!(id = %post.id, "Created post, reloading feed");
    feed.load().await;

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/like", rejection(ServerError))]
struct LikePath {
    id: Id<PostMarker>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
struct LikeResponse {
    id: Id<PostMarker>,
    liked: bool,
}

async fn toggle_like(
    LikePath { id }: LikePath,
    State(feed): State<Arc<Feed>>,
) -> Json<LikeResponse> {
    let liked = feed.toggle_like(id).is_liked();

    Json(LikeResponse { id, liked })
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}/comments", rejection(ServerError))]
struct CommentsPath {
    id: Id<PostMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct AddCommentRequest {
    author: String,
    text: CommentText,
}

async fn add_comment(
    CommentsPath { id }: CommentsPath,
    State(feed): State<Arc<Feed>>,
    Json(request): Json<AddCommentRequest>,
) -> Result<Json<Comment>> {
    let comment = feed.add_comment(id, request.text, request.author).await?;

    Ok(Json(comment))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn edit_post(
    PostPath { id }: PostPath,
    State(feed): State<Arc<Feed>>,
    Json(patch): Json<PostPatch>,
) -> Result<Json<Post>> {
    if patch.is_empty() {
        return Err(ServerError::EmptyPatch);
    }
    let post = feed.edit_post(id, patch).await?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(feed): State<Arc<Feed>>,
) -> Result<StatusCode> {
    feed.request_delete(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::{
        server::testing::{
            app, empty_request, json_request, loaded_feed, persisted_post, read_json, send,
        },
        store::Store,
    };
    use axum::http::StatusCode;
    use qudpro_feed::PersistedSource;
    use qudpro_common::model::{
        Id,
        post::{Post, PostMarker, PostOrigin},
    };
    use serde_json::{Value, json};

    fn synthetic_id(posts: &[Post]) -> Id<PostMarker> {
        posts
            .iter()
            .find(|post| post.origin == PostOrigin::Synthetic)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn like_toggles_by_parity() {
        let feed = loaded_feed([persisted_post(1)]).await;

        let first = send(app(feed.clone()), empty_request("POST", "/posts/1/like")).await;
        let first: Value = read_json(first).await;
        let second = send(app(feed.clone()), empty_request("POST", "/posts/1/like")).await;
        let second: Value = read_json(second).await;

        assert_eq!(first, json!({ "id": 1, "liked": true }));
        assert_eq!(second, json!({ "id": 1, "liked": false }));
        assert!(!feed.is_liked(1_u64.into()));
    }

    #[tokio::test]
    async fn like_accepts_posts_outside_the_feed() {
        let feed = loaded_feed([]).await;

        let response = send(app(feed.clone()), empty_request("POST", "/posts/77/like")).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(feed.is_liked(77_u64.into()));
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let feed = loaded_feed([]).await;

        let response = send(app(feed), empty_request("POST", "/posts/first/like")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn comment_is_prepended() {
        let feed = loaded_feed([persisted_post(1)]).await;
        let body = json!({ "author": "Sara Ahmed", "text": "Beautiful light" });

        let request = json_request("POST", "/posts/1/comments", &body);

        let response = send(app(feed.clone()), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let comment: Value = read_json(response).await;
        assert_eq!(comment["text"], "Beautiful light");

        let post = feed
            .snapshot()
            .into_iter()
            .find(|post| u64::from(post.id) == 1)
            .unwrap();
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments[0].author, "Sara Ahmed");
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found() {
        let feed = loaded_feed([]).await;
        let body = json!({ "author": "Sara Ahmed", "text": "Hello" });

        let response = send(app(feed), json_request("POST", "/posts/5/comments", &body)).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comment_survives_the_reload_after_a_create() {
        let feed = loaded_feed([persisted_post(1)]).await;
        let comment = json!({ "author": "Sara Ahmed", "text": "Beautiful light" });
        let post = json!({
            "author": { "name": "Ahmed Hassan", "role": "Photographer", "avatar_url": "" },
            "content": { "title": "Giza", "description": "", "media_url": "", "category": "" },
        });

        let commented = send(
            app(feed.clone()),
            json_request("POST", "/posts/1/comments", &comment),
        )
        .await;
        let created = send(app(feed.clone()), json_request("POST", "/posts/create", &post)).await;

        assert_eq!(commented.status(), StatusCode::OK);
        assert_eq!(created.status(), StatusCode::OK);
        let post = feed
            .snapshot()
            .into_iter()
            .find(|post| u64::from(post.id) == 1)
            .unwrap();
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments[0].text.get(), "Beautiful light");
    }

    #[tokio::test]
    async fn comment_on_post_gone_from_the_store_is_bad_gateway() {
        let feed = loaded_feed([persisted_post(1)]).await;
        feed.persisted().delete(1_u64.into()).await.unwrap();
        let body = json!({ "author": "Sara Ahmed", "text": "Hello" });

        let request = json_request("POST", "/posts/1/comments", &body);

        let response = send(app(feed.clone()), request).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(feed.snapshot().iter().all(|post| post.comments.is_empty()));
    }

    #[tokio::test]
    async fn blank_comment_is_bad_request() {
        let feed = loaded_feed([persisted_post(1)]).await;
        let body = json!({ "author": "Sara Ahmed", "text": "   " });

        let request = json_request("POST", "/posts/1/comments", &body);

        let response = send(app(feed.clone()), request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(feed.snapshot().iter().all(|post| post.comments.is_empty()));
    }

    #[tokio::test]
    async fn create_reloads_the_feed() {
        let feed = loaded_feed([]).await;
        let body = json!({
            "author": {
                "name": "Ahmed Hassan",
                "role": "Architectural Photographer",
                "avatar_url": "https://example.com/portrait.jpg",
            },
            "content": {
                "title": "Nile at dusk",
                "description": "Evening over Zamalek",
                "media_url": "https://example.com/nile.jpg",
                "category": "Professional",
            },
        });

        let request = json_request("POST", "/posts/create", &body);

        let response = send(app(feed.clone()), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let created: Post = read_json(response).await;
        assert_eq!(created.like_count, 0);
        assert_eq!(created.origin, PostOrigin::Persisted);

        // Created now, so it is the newest post in the rebuilt feed.
        let snapshot = feed.snapshot();
        assert_eq!(snapshot[0].id, created.id);
        assert_eq!(snapshot[0].content.title, "Nile at dusk");
    }

    #[tokio::test]
    async fn edit_replaces_content_in_place() {
        let feed = loaded_feed([persisted_post(1), persisted_post(2)]).await;
        let body = json!({ "title": "Renamed" });

        let request = json_request("PATCH", "/posts/1", &body);

        let response = send(app(feed.clone()), request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let edited: Post = read_json(response).await;
        assert_eq!(edited.content.title, "Renamed");
        assert_eq!(edited.content.category, "Design");

        let snapshot = feed.snapshot();
        assert_eq!(u64::from(snapshot[1].id), 1);
        assert_eq!(snapshot[1].content.title, "Renamed");
    }

    #[tokio::test]
    async fn empty_edit_is_bad_request() {
        let feed = loaded_feed([persisted_post(1)]).await;

        let response = send(app(feed), json_request("PATCH", "/posts/1", &json!({}))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn synthetic_posts_cannot_be_edited_or_deleted() {
        let feed = loaded_feed([]).await;
        let id = synthetic_id(&feed.snapshot());
        let body = json!({ "title": "Renamed" });

        let uri = format!("/posts/{id}");

        let edit = send(app(feed.clone()), json_request("PATCH", &uri, &body)).await;
        let delete = send(app(feed.clone()), empty_request("DELETE", &uri)).await;

        assert_eq!(edit.status(), StatusCode::CONFLICT);
        assert_eq!(delete.status(), StatusCode::CONFLICT);
        assert!(feed.snapshot().iter().any(|post| post.id == id));
    }

    #[tokio::test]
    async fn delete_removes_from_store_and_feed() {
        let feed = loaded_feed([persisted_post(1)]).await;

        let response = send(app(feed.clone()), empty_request("DELETE", "/posts/1")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(feed.snapshot().iter().all(|post| u64::from(post.id) != 1));
        let Store::Memory(store) = feed.persisted() else {
            panic!("expected the memory store");
        };
        assert!(!store.contains(1_u64.into()));
    }

    #[tokio::test]
    async fn delete_of_missing_post_is_not_found() {
        let feed = loaded_feed([]).await;

        let response = send(app(feed), empty_request("DELETE", "/posts/1")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejected_delete_keeps_the_post() {
        let feed = loaded_feed([persisted_post(1)]).await;
        let Store::Memory(store) = feed.persisted() else {
            panic!("expected the memory store");
        };
        store.set_read_only(1_u64.into());

        let response = send(app(feed.clone()), empty_request("DELETE", "/posts/1")).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(feed.snapshot().iter().any(|post| u64::from(post.id) == 1));
    }
}
