//! Brings the database to a usable state before the server accepts requests.
//!
//! The procedure waits for the database to accept connections, creates any
//! missing tables, then makes sure the `users` table is not empty so that
//! posts owned by the placeholder user satisfy their foreign key.

use std::time::Duration;

/// An error raised by a [`Storage`] backend.
pub trait StorageError: std::error::Error + Send + Sync + 'static {
	/// Whether the database could not be reached, as opposed to refusing the request.
	fn is_transient(&self) -> bool;

	/// Whether a write was rejected by a uniqueness or integrity constraint.
	fn is_integrity_violation(&self) -> bool;
}

/// The operations startup needs from the database.
#[axum::async_trait]
pub trait Storage: Send + Sync {
	type Error: StorageError;
	type Session: SeedSession<Error = Self::Error>;

	/// Opens a connection and releases it immediately.
	async fn ping(&self) -> Result<(), Self::Error>;

	/// Creates every table that does not exist yet, leaving existing ones untouched.
	async fn create_schema(&self) -> Result<(), Self::Error>;

	/// Opens a new unit of work.
	async fn session(&self) -> Result<Self::Session, Self::Error>;
}

/// A unit of work used to seed the default user.
///
/// Dropping it without calling [`SeedSession::commit`] must discard its writes.
#[axum::async_trait]
pub trait SeedSession: Send + Sized {
	type Error;

	async fn has_user(&mut self) -> Result<bool, Self::Error>;

	async fn insert_user(&mut self, user: &NewUser) -> Result<(), Self::Error>;

	async fn commit(self) -> Result<(), Self::Error>;

	async fn rollback(self) -> Result<(), Self::Error>;
}

/// A user row to insert.
#[derive(Debug, Clone, Copy)]
pub struct NewUser {
	/// Inserted explicitly, the id sequence is moved past it afterwards.
	pub id: i32,
	pub email: &'static str,
	pub username: &'static str,
	/// Stored as given, this is not hashed.
	pub hashed_password: &'static str,
}

/// The user that owns every post until authentication exists.
pub const DEFAULT_USER: NewUser = NewUser {
	id: 1,
	email: "admin@example.com",
	username: "admin",
	hashed_password: "changeme",
};

/// Tunables for the startup procedure.
#[derive(Debug, Clone)]
pub struct Startup {
	/// Connection attempts before giving up, including the first one.
	pub max_attempts: u32,
	/// Fixed delay between two connection attempts.
	pub backoff: Duration,
	/// Whether to insert [`DEFAULT_USER`] when `users` is empty.
	pub seed: bool,
}

impl Default for Startup {
	fn default() -> Self {
		Self {
			max_attempts: 10,
			backoff: Duration::from_secs(2),
			seed: true,
		}
	}
}

/// The outcome of the seed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seed {
	/// The default user was inserted.
	Inserted,
	/// A user already existed, nothing was written.
	Present,
	/// Another process inserted the default user first.
	Raced,
	/// Seeding is disabled.
	Skipped,
}

/// The outcome of a successful startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
	/// The connection attempt that succeeded, starting at 1.
	pub attempts: u32,
	pub seed: Seed,
}

/// Runs the full startup procedure.
///
/// Any error returned here is fatal: the server must not start.
#[tracing::instrument(skip_all)]
pub async fn run<S: Storage>(storage: &S, options: &Startup) -> Result<Ready, S::Error> {
	let attempts = wait_for_storage(storage, options).await?;

	storage.create_schema().await?;
	tracing::info!("database schema ready");

	let seed = if options.seed {
		seed_default_user(storage, &DEFAULT_USER).await?
	} else {
		Seed::Skipped
	};

	tracing::info!(?seed, "database seeded");

	Ok(Ready { attempts, seed })
}

/// Pings the storage until it answers, sleeping a fixed `backoff` between attempts.
///
/// Only transient errors are retried. The last one is returned once
/// `max_attempts` is reached.
pub async fn wait_for_storage<S: Storage>(storage: &S, options: &Startup) -> Result<u32, S::Error> {
	let max_attempts = options.max_attempts.max(1);
	let mut attempt = 1;

	loop {
		match storage.ping().await {
			Ok(()) => {
				tracing::info!(attempt, "connected to database");
				return Ok(attempt);
			}
			Err(error) if error.is_transient() && attempt < max_attempts => {
				tracing::warn!(
					attempt,
					max_attempts,
					%error,
					"database unavailable, retrying in {:?}",
					options.backoff
				);

				tokio::time::sleep(options.backoff).await;
				attempt += 1;
			}
			Err(error) => {
				tracing::error!(attempt, %error, "could not connect to database");
				return Err(error);
			}
		}
	}
}

/// Inserts `user` if the users table is empty.
///
/// An integrity violation on insert means another process seeded first. The
/// transaction is rolled back and the result is [`Seed::Raced`], not an error.
pub async fn seed_default_user<S: Storage>(storage: &S, user: &NewUser) -> Result<Seed, S::Error> {
	let mut session = storage.session().await?;

	if session.has_user().await? {
		return Ok(Seed::Present);
	}

	match session.insert_user(user).await {
		Ok(()) => {
			session.commit().await?;
			Ok(Seed::Inserted)
		}
		Err(error) if error.is_integrity_violation() => {
			tracing::debug!(%error, "default user inserted concurrently");
			session.rollback().await?;
			Ok(Seed::Raced)
		}
		Err(error) => Err(error),
	}
}
