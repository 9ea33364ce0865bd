use std::{
	ops::{Deref, DerefMut},
	str::FromStr,
};

use sqlx::{
	error::ErrorKind,
	postgres::{PgConnectOptions, PgPoolOptions},
	Connection, PgConnection, Postgres, Transaction,
};

use crate::{
	config::DatabaseConfig,
	schema,
	startup::{NewUser, SeedSession, Storage, StorageError},
	Database,
};

/// Builds the shared connection pool.
///
/// No connection is opened here, so a database that is still starting up is
/// not an error yet. Pooled connections are pinged before they are handed out.
pub fn connect(config: &DatabaseConfig) -> Result<Database, sqlx::Error> {
	let options = PgConnectOptions::from_str(&config.url)?;

	Ok(PgPoolOptions::new()
		.max_connections(config.max_connections)
		.acquire_timeout(config.acquire_timeout)
		.test_before_acquire(true)
		.connect_lazy_with(options))
}

/// A single transaction against the database, scoped to one request.
///
/// Nothing is committed unless [`UnitOfWork::commit`] is called. Dropping it
/// rolls back and returns the connection to the pool.
pub struct UnitOfWork {
	tx: Transaction<'static, Postgres>,
}

impl UnitOfWork {
	pub async fn begin(database: &Database) -> Result<Self, sqlx::Error> {
		Ok(Self {
			tx: database.begin().await?,
		})
	}

	pub async fn commit(self) -> Result<(), sqlx::Error> {
		self.tx.commit().await
	}
}

impl Deref for UnitOfWork {
	type Target = PgConnection;

	fn deref(&self) -> &Self::Target {
		&self.tx
	}
}

impl DerefMut for UnitOfWork {
	fn deref_mut(&mut self) -> &mut Self::Target {
		&mut self.tx
	}
}

impl StorageError for sqlx::Error {
	fn is_transient(&self) -> bool {
		match self {
			Self::Io(..) | Self::PoolTimedOut => true,
			// 08: connection exception, 57P03: cannot connect now, 53300: too many connections
			Self::Database(error) => error
				.code()
				.is_some_and(|code| code.starts_with("08") || code == "57P03" || code == "53300"),
			_ => false,
		}
	}

	fn is_integrity_violation(&self) -> bool {
		let Self::Database(error) = self else {
			return false;
		};

		matches!(
			error.kind(),
			ErrorKind::UniqueViolation
				| ErrorKind::ForeignKeyViolation
				| ErrorKind::NotNullViolation
				| ErrorKind::CheckViolation
		)
	}
}

#[axum::async_trait]
impl Storage for Database {
	type Error = sqlx::Error;
	type Session = UnitOfWork;

	async fn ping(&self) -> Result<(), Self::Error> {
		// The pool retries refused connections until `acquire_timeout`, so
		// readiness is checked on a connection of its own.
		PgConnection::connect_with(&self.connect_options())
			.await?
			.close()
			.await
	}

	async fn create_schema(&self) -> Result<(), Self::Error> {
		schema::create_all(self).await
	}

	async fn session(&self) -> Result<Self::Session, Self::Error> {
		UnitOfWork::begin(self).await
	}
}

#[axum::async_trait]
impl SeedSession for UnitOfWork {
	type Error = sqlx::Error;

	async fn has_user(&mut self) -> Result<bool, Self::Error> {
		sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users)")
			.fetch_one(&mut **self)
			.await
	}

	async fn insert_user(&mut self, user: &NewUser) -> Result<(), Self::Error> {
		// An explicit id never draws from the sequence, so a losing insert
		// cannot push the winner's row past `user.id`.
		sqlx::query(
			"INSERT INTO users (id, email, username, hashed_password) VALUES ($1, $2, $3, $4)",
		)
		.bind(user.id)
		.bind(user.email)
		.bind(user.username)
		.bind(user.hashed_password)
		.execute(&mut **self)
		.await?;

		sqlx::query("SELECT setval(pg_get_serial_sequence('users', 'id'), (SELECT MAX(id) FROM users))")
			.execute(&mut **self)
			.await
			.map(drop)
	}

	async fn commit(self) -> Result<(), Self::Error> {
		self.tx.commit().await
	}

	async fn rollback(self) -> Result<(), Self::Error> {
		self.tx.rollback().await
	}
}

#[cfg(test)]
mod test {
	use std::{io, time::Duration};

	use super::*;
	use crate::startup::{self, seed_default_user, Seed, Startup, DEFAULT_USER};

	async fn count(pool: &Database, table: &str) -> i64 {
		sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
			.fetch_one(pool)
			.await
			.unwrap()
	}

	#[test]
	fn test_transient_errors() {
		assert!(sqlx::Error::PoolTimedOut.is_transient());
		assert!(sqlx::Error::Io(io::Error::from(io::ErrorKind::ConnectionRefused)).is_transient());

		assert!(!sqlx::Error::RowNotFound.is_transient());
		assert!(!sqlx::Error::PoolClosed.is_transient());
		assert!(!sqlx::Error::Configuration("bad url".into()).is_transient());
	}

	#[test]
	fn test_connect_rejects_malformed_url() {
		let config = DatabaseConfig {
			url: "not a url".into(),
			max_connections: 1,
			acquire_timeout: Duration::from_secs(1),
		};

		let error = connect(&config).unwrap_err();

		assert!(!error.is_transient());
	}

	#[tokio::test]
	async fn test_ping_reports_refused_connection() {
		let config = DatabaseConfig {
			url: "postgres://postgres@127.0.0.1:1/blog".into(),
			max_connections: 1,
			acquire_timeout: Duration::from_secs(5),
		};

		let database = connect(&config).unwrap();

		let started = std::time::Instant::now();
		let error = database.ping().await.unwrap_err();

		assert!(matches!(error, sqlx::Error::Io(..)), "{error:?}");
		assert!(error.is_transient());
		assert!(started.elapsed() < config.acquire_timeout);
	}

	#[tokio::test]
	async fn test_startup_gives_up_with_connection_error() {
		let config = DatabaseConfig {
			url: "postgres://postgres@127.0.0.1:1/blog".into(),
			max_connections: 1,
			acquire_timeout: Duration::from_secs(5),
		};

		let database = connect(&config).unwrap();
		let options = Startup {
			max_attempts: 2,
			backoff: Duration::from_millis(10),
			..Startup::default()
		};

		let started = std::time::Instant::now();
		let error = startup::run(&database, &options).await.unwrap_err();

		assert!(matches!(error, sqlx::Error::Io(..)), "{error:?}");
		assert!(started.elapsed() < config.acquire_timeout);
	}

	#[sqlx::test(migrations = false)]
	async fn test_startup_is_idempotent(pool: Database) {
		let first = startup::run(&pool, &Startup::default()).await.unwrap();
		let second = startup::run(&pool, &Startup::default()).await.unwrap();

		assert_eq!(first.attempts, 1);
		assert_eq!(first.seed, Seed::Inserted);
		assert_eq!(second.seed, Seed::Present);
		assert_eq!(count(&pool, "users").await, 1);

		let id: i32 = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
			.bind(DEFAULT_USER.email)
			.fetch_one(&pool)
			.await
			.unwrap();

		assert_eq!(id, 1);
	}

	#[sqlx::test(migrations = false)]
	async fn test_seed_can_be_disabled(pool: Database) {
		let options = Startup {
			seed: false,
			..Startup::default()
		};

		let ready = startup::run(&pool, &options).await.unwrap();

		assert_eq!(ready.seed, Seed::Skipped);
		assert_eq!(count(&pool, "users").await, 0);
	}

	#[sqlx::test(migrations = false)]
	async fn test_schema_creation_is_additive(pool: Database) {
		startup::run(&pool, &Startup::default()).await.unwrap();

		sqlx::query("INSERT INTO posts (title, content, owner_id) VALUES ('kept', 'still here', 1)")
			.execute(&pool)
			.await
			.unwrap();

		schema::create_all(&pool).await.unwrap();
		startup::run(&pool, &Startup::default()).await.unwrap();

		assert_eq!(count(&pool, "users").await, 1);
		assert_eq!(count(&pool, "posts").await, 1);

		let title: String = sqlx::query_scalar("SELECT title FROM posts")
			.fetch_one(&pool)
			.await
			.unwrap();

		assert_eq!(title, "kept");
	}

	/// Storage that never sees the existing seed row, like a second instance
	/// that checked the table just before the first one committed.
	struct Racing(Database);

	struct RacingSession(UnitOfWork);

	#[axum::async_trait]
	impl Storage for Racing {
		type Error = sqlx::Error;
		type Session = RacingSession;

		async fn ping(&self) -> Result<(), Self::Error> {
			self.0.ping().await
		}

		async fn create_schema(&self) -> Result<(), Self::Error> {
			self.0.create_schema().await
		}

		async fn session(&self) -> Result<Self::Session, Self::Error> {
			Ok(RacingSession(self.0.session().await?))
		}
	}

	#[axum::async_trait]
	impl SeedSession for RacingSession {
		type Error = sqlx::Error;

		async fn has_user(&mut self) -> Result<bool, Self::Error> {
			Ok(false)
		}

		async fn insert_user(&mut self, user: &NewUser) -> Result<(), Self::Error> {
			self.0.insert_user(user).await
		}

		async fn commit(self) -> Result<(), Self::Error> {
			SeedSession::commit(self.0).await
		}

		async fn rollback(self) -> Result<(), Self::Error> {
			SeedSession::rollback(self.0).await
		}
	}

	#[sqlx::test(migrations = false)]
	async fn test_seed_race_is_absorbed(pool: Database) {
		startup::run(&pool, &Startup::default()).await.unwrap();

		let seed = seed_default_user(&Racing(pool.clone()), &DEFAULT_USER)
			.await
			.unwrap();

		assert_eq!(seed, Seed::Raced);
		assert_eq!(count(&pool, "users").await, 1);

		let next: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('users', 'id'))")
			.fetch_one(&pool)
			.await
			.unwrap();

		assert_eq!(next, i64::from(DEFAULT_USER.id) + 1);

		// The rolled back session must not leave the pool unusable.
		assert!(pool.ping().await.is_ok());
	}

	#[sqlx::test(migrations = false)]
	async fn test_concurrent_startups(pool: Database) {
		let (first_startup, second_startup) = (Startup::default(), Startup::default());
		let (first, second) = tokio::join!(
			startup::run(&pool, &first_startup),
			startup::run(&pool, &second_startup),
		);

		let mut seeds = [first.unwrap().seed, second.unwrap().seed];
		seeds.sort_by_key(|seed| *seed != Seed::Inserted);

		assert_eq!(seeds[0], Seed::Inserted);
		assert!(matches!(seeds[1], Seed::Present | Seed::Raced));

		let ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM users")
			.fetch_all(&pool)
			.await
			.unwrap();

		assert_eq!(ids, [DEFAULT_USER.id]);
	}
}
