pub use axum_test::TestServer;
pub use serde_json::{json, Value};

pub use crate::Database;

use crate::{route, startup, State};

/// Runs startup against the test database and serves the application in memory.
pub async fn app(database: Database) -> TestServer {
	startup::run(&database, &startup::Startup::default())
		.await
		.expect("startup should succeed against the test database");

	TestServer::new(route::app(State { database })).expect("failed to build test server")
}
