pub use crate::route::model::IdInput;

use schemars::JsonSchema;
use serde::Serialize;

/// The public profile of a user.
///
/// Email and password never leave the database.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct User {
	/// The unique identifier of the user.
	pub id: i32,
	/// The username that is displayed to the public.
	pub username: String,
}
