pub use crate::route::model::IdInput;

use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single post, owned by a user.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
pub struct Post {
	/// The unique identifier of the post.
	#[serde(skip_deserializing)]
	pub id: i32,
	/// The title of the post.
	pub title: String,
	/// The body of the post.
	pub content: String,
	/// The user that owns the post.
	#[serde(skip_deserializing)]
	pub owner_id: i32,
	/// The creation time of the post, assigned by the database.
	#[serde(skip_deserializing)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// Whether the post is visible.
	#[serde(skip_deserializing)]
	pub published: bool,
}
