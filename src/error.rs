use std::{borrow::Cow, fmt};

use aide::OperationOutput;
use axum::{
	extract::rejection,
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;

use crate::config;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A fatal error that stops the process before or while serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
	#[error("configuration error: {0}")]
	Config(#[from] config::Error),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("tracing error: {0}")]
	Trace(#[from] opentelemetry::trace::TraceError),
	#[error("tracing subscriber error: {0}")]
	Subscriber(#[from] tracing_subscriber::util::TryInitError),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// A single error sent to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A machine-readable description of the error.
	pub content: Cow<'static, str>,
	/// The input field that caused the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'static, str>>,
	/// Extra context, such as the id of a missing resource.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<Cow<'static, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	#[must_use]
	pub fn field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	#[must_use]
	pub fn detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	pub success: bool,
	pub errors: Vec<Message>,
}

/// Describes how an error is presented to the client.
///
/// The [`fmt::Display`] output is only logged, so it can contain sensitive
/// information. Whatever [`ErrorShape::errors`] returns is sent to the client.
pub trait ErrorShape: fmt::Display {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message>;
}

fn shape_response(error: &impl ErrorShape) -> Response {
	let status = error.status();

	if status.is_server_error() {
		tracing::error!(%error, "request failed");
	} else {
		tracing::debug!(%error, "request rejected");
	}

	(
		status,
		Json(ErrorResponse {
			success: false,
			errors: error.errors(),
		}),
	)
		.into_response()
}

/// Errors that any route can produce.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("invalid json body")]
	Json(JsonSchemaRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl From<JsonSchemaRejection> for AppError {
	fn from(rejection: JsonSchemaRejection) -> Self {
		Self::Json(rejection)
	}
}

/// Builds a message for a body error found at `location`, a JSON pointer or
/// a dotted path. The document root is not reported as a field.
fn body_message(content: &'static str, location: &str, reason: String) -> Message {
	let message = Message::new(content).detail("reason", reason);

	match location.trim_start_matches(|c: char| c == '/' || c == '.') {
		"" => message,
		field => message.field(field.to_owned()),
	}
}

fn body_errors(rejection: &JsonSchemaRejection) -> Vec<Message> {
	match rejection {
		JsonSchemaRejection::Json(rejection) => {
			vec![Message::new("invalid_json").detail("reason", rejection.body_text())]
		}
		JsonSchemaRejection::Serde(error) => vec![body_message(
			"invalid_body",
			&error.path().to_string(),
			error.inner().to_string(),
		)],
		JsonSchemaRejection::Schema(errors) => errors
			.iter()
			.map(|error| {
				body_message(
					"schema_violation",
					&error.instance_location().to_string(),
					error.error_description().to_string(),
				)
			})
			.collect(),
	}
}

impl ErrorShape for AppError {
	fn status(&self) -> StatusCode {
		match self {
			// A missing content type is 415, not 400.
			Self::Json(JsonSchemaRejection::Json(rejection)) => rejection.status(),
			Self::Validation(..) | Self::Json(..) | Self::Path(..) => StatusCode::BAD_REQUEST,
			Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<Message> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					let field = field.to_string();

					errors.iter().map(move |error| {
						let message = Message::new(error.code.clone()).field(field.clone());

						error
							.params
							.iter()
							.filter(|(key, _)| *key != "value")
							.fold(message, |message, (key, value)| {
								message.detail(key.to_string(), value.clone())
							})
					})
				})
				.collect(),
			Self::Json(rejection) => body_errors(rejection),
			Self::Path(rejection) => vec![Message::new(rejection.body_text())],
			// Storage failures are never described to the client.
			Self::Database(..) => Vec::new(),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response {
		shape_response(&self)
	}
}

/// The error type returned by route handlers: either an [`AppError`] shared
/// by every route, or an error specific to the route's resource.
#[derive(Debug)]
pub enum RouteError<T> {
	App(AppError),
	Route(T),
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<sqlx::Error> for RouteError<T> {
	fn from(error: sqlx::Error) -> Self {
		Self::App(AppError::Database(error))
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response {
		match self {
			Self::App(error) => error.into_response(),
			Self::Route(error) => shape_response(&error),
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = ErrorResponse;
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::*;

	#[derive(Validate)]
	struct Input {
		#[validate(length(min = 1))]
		title: String,
	}

	#[test]
	fn test_validation_errors_name_the_field() {
		let errors = Input {
			title: String::new(),
		}
		.validate()
		.unwrap_err();

		let error = AppError::Validation(errors);

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let messages = error.errors();

		assert_eq!(messages.len(), 1);
		assert_eq!(messages[0].content, "length");
		assert_eq!(messages[0].field.as_deref(), Some("title"));
		assert_eq!(
			messages[0].details.as_ref().and_then(|d| d.get("min")),
			Some(&serde_json::json!(1))
		);
	}

	#[test]
	fn test_database_errors_are_hidden() {
		let error = AppError::Database(sqlx::Error::RowNotFound);

		assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert!(error.errors().is_empty());
	}

	#[test]
	fn test_body_messages_name_the_field() {
		let message = body_message("schema_violation", "/title", "5 is not of type \"string\"".into());

		assert_eq!(message.field.as_deref(), Some("title"));

		let message = body_message("schema_violation", "", "\"content\" is a required property".into());

		assert!(message.field.is_none());
		assert_eq!(
			message.details.as_ref().and_then(|d| d.get("reason")),
			Some(&serde_json::json!("\"content\" is a required property"))
		);
	}

	#[test]
	fn test_message_details() {
		let message = Message::new("unknown_post").detail("post", 7);
		let json = serde_json::to_value(&message).unwrap();

		assert_eq!(
			json,
			serde_json::json!({ "content": "unknown_post", "details": { "post": 7 } })
		);
	}
}
