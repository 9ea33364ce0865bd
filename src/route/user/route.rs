use macros::route;

use crate::{
	extract::{Json, Path, UnitOfWork},
	openapi::tag,
};

use super::{model, Error, RouteError};

/// Get user
/// Returns the public profile of a user by their unique id.
#[route(tag = tag::USER)]
pub async fn get_user(
	mut uow: UnitOfWork,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::User>, RouteError> {
	let user = sqlx::query_as(
		r#"
			SELECT id, username
			FROM users
			WHERE id = $1
		"#,
	)
	.bind(path.id)
	.fetch_optional(&mut *uow)
	.await?;

	Ok(Json(user.ok_or(Error::UnknownUser(path.id))?))
}
