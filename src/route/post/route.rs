use axum::http::StatusCode;
use macros::route;

use crate::{
	extract::{Json, Path, UnitOfWork},
	openapi::tag,
};

use super::{model, Error, RouteError, PLACEHOLDER_OWNER_ID};

/// Get all posts
/// Returns every post, oldest first.
#[route(tag = tag::POST)]
pub async fn get_posts(mut uow: UnitOfWork) -> Result<Json<Vec<model::Post>>, RouteError> {
	let posts = sqlx::query_as(
		r#"
			SELECT id, title, content, owner_id, created_at, published
			FROM posts
			ORDER BY id
		"#,
	)
	.fetch_all(&mut *uow)
	.await?;

	Ok(Json(posts))
}

/// Get single post
/// Returns a single post by its unique id.
#[route(tag = tag::POST)]
pub async fn get_post(
	mut uow: UnitOfWork,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = sqlx::query_as(
		r#"
			SELECT id, title, content, owner_id, created_at, published
			FROM posts
			WHERE id = $1
		"#,
	)
	.bind(path.id)
	.fetch_optional(&mut *uow)
	.await?;

	Ok(Json(post.ok_or(Error::UnknownPost(path.id))?))
}

/// Create post
/// Creates a new post. The owner, id, publication state and creation time are assigned by the server.
#[route(tag = tag::POST, response(status = 201, description = "Post created.", shape = "Json<model::Post>"))]
pub async fn create_post(
	mut uow: UnitOfWork,
	Json(input): Json<model::CreatePost>,
) -> Result<(StatusCode, Json<model::Post>), RouteError> {
	// TODO: take the owner from the authenticated user once requests carry one.
	let post: model::Post = sqlx::query_as(
		r#"
			INSERT INTO posts (title, content, owner_id)
			VALUES ($1, $2, $3)
			RETURNING id, title, content, owner_id, created_at, published
		"#,
	)
	.bind(&input.title)
	.bind(&input.content)
	.bind(PLACEHOLDER_OWNER_ID)
	.fetch_one(&mut *uow)
	.await?;

	uow.commit().await?;

	Ok((StatusCode::CREATED, Json(post)))
}
