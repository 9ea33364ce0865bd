pub mod docs;
pub mod model;
pub mod post;
pub mod user;

use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{Extension, Router};
use tower::Layer;
use tower_http::{
	compression::CompressionLayer,
	normalize_path::NormalizePathLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{openapi, AppState};

/// Builds the served application: [`router`] with trailing slashes trimmed.
///
/// Normalization has to run before routing, so the normalized router is
/// mounted as the fallback of an otherwise empty one.
pub fn app(state: AppState) -> Router {
	Router::new().fallback_service(NormalizePathLayer::trim_trailing_slash().layer(router(state)))
}

/// Builds the application router, including the generated `OpenAPI` document.
fn router(state: AppState) -> Router {
	let mut api = OpenApi::default();

	let router = ApiRouter::new()
		.nest("/posts", post::routes())
		.nest("/users", user::routes())
		.nest("/docs", docs::routes())
		.finish_api_with(&mut api, openapi::docs);

	router
		.layer(Extension(Arc::new(api)))
		.layer(CompressionLayer::new())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(TraceLayer::new_for_http())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.with_state(state)
}
