use schemars::JsonSchema;
use serde::Deserialize;
use validator::Validate;

/// A path containing a single resource id.
#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	/// The unique identifier of the resource.
	#[validate(range(min = 1))]
	pub id: i32,
}
