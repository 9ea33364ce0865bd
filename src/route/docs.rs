use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{response::IntoResponse, routing::get, Extension};

use crate::{extract::Json, AppState};

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().route("/api.json", get(serve_docs))
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoResponse {
	Json(api.as_ref()).into_response()
}
