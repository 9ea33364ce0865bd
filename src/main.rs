#![warn(clippy::pedantic)]

mod config;
mod database;
mod error;
mod extract;
mod openapi;
mod route;
mod schema;
mod startup;
#[cfg(test)]
mod test;
mod trace;

pub use error::StartupError;

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// Handlers never reach for a global pool: the one built in `main` is handed
/// to them through this state, either directly or through a [`extract::UnitOfWork`].
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
	let config = config::Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(&config)?;

	if let Err(error) = run(config).await {
		tracing::error!(%error, "server failed");
		return Err(error);
	}

	Ok(())
}

async fn run(config: config::Config) -> Result<(), StartupError> {
	let database = database::connect(&config.database)?;

	let options = startup::Startup {
		seed: config.seed_default_user,
		..startup::Startup::default()
	};

	let ready = startup::run(&database, &options).await?;

	tracing::info!(attempts = ready.attempts, seed = ?ready.seed, "startup complete");

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!("listening on {}:{}", config.host, config.port);

	axum::serve(listener, route::app(State { database }))
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("server shut down");

	Ok(())
}

/// Resolves once Ctrl+C or SIGTERM is received.
async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(error) = tokio::signal::ctrl_c().await {
			tracing::error!(%error, "failed to listen for ctrl+c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			}
			Err(error) => {
				tracing::error!(%error, "failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		() = ctrl_c => {},
		() = terminate => {},
	}

	tracing::info!("shutdown signal received");
}
