use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::request,
};

use crate::{database::UnitOfWork, error::AppError, Database};

/// Opens a unit of work on the shared pool for the duration of the request.
///
/// The handler decides whether to commit. Once the handler returns, an
/// uncommitted unit of work is rolled back and its connection released.
///
/// ```rust
/// async fn route(mut uow: UnitOfWork) -> Result<(), RouteError> {
///   sqlx::query("...").execute(&mut *uow).await?;
///   uow.commit().await?;
///   Ok(())
/// }
/// ```
#[axum::async_trait]
impl<S> FromRequestParts<S> for UnitOfWork
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = AppError;

	async fn from_request_parts(
		_parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let database = Database::from_ref(state);

		Ok(UnitOfWork::begin(&database).await?)
	}
}

/// The unit of work adds nothing to the `OpenAPI` operation.
impl OperationInput for UnitOfWork {}
