use crate::server::{
    Result, ServerError, ServerRouter, auth::AuthenticatedMember, form::PostForm, json::Json,
};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use serde::Deserialize;
use snsserver_common::model::{
    Id,
    post::{PostMarker, PostResponse},
};
use snsserver_db::client::DbClient;
use snsserver_service::posts::PostService;
use std::sync::Arc;

type Posts = State<Arc<PostService<DbClient>>>;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_posts)
        .typed_post(create_post)
        .typed_get(get_post)
        .typed_put(update_post)
        .typed_delete(delete_post)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_posts(
    PostsPath(): PostsPath,
    State(posts): Posts,
) -> Result<Json<Vec<PostResponse>>> {
    Ok(Json(posts.get_all_posts().await?))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(posts): Posts,
    member: AuthenticatedMember,
    form: PostForm,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let post = posts
        .create_post(member.username(), form.content, form.file)
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(PostPath { id }: PostPath, State(posts): Posts) -> Result<Json<PostResponse>> {
    Ok(Json(posts.get_post(id).await?))
}

async fn update_post(
    PostPath { id }: PostPath,
    State(posts): Posts,
    member: AuthenticatedMember,
    form: PostForm,
) -> Result<Json<PostResponse>> {
    let post = posts
        .update_post(member.username(), id, form.content, form.file)
        .await?;

    Ok(Json(post))
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(posts): Posts,
    member: AuthenticatedMember,
) -> Result<StatusCode> {
    posts.delete_post(member.username(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
