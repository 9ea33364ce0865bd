use crate::Database;

/// A table owned by this service.
pub struct Table {
	pub name: &'static str,
	/// A `CREATE TABLE IF NOT EXISTS` statement, so it can run against an existing schema.
	pub definition: &'static str,
}

/// Every table, in the order they must be created in.
///
/// `posts.owner_id` references `users.id`, so `users` comes first.
pub const TABLES: &[Table] = &[
	Table {
		name: "users",
		definition: r#"
			CREATE TABLE IF NOT EXISTS users (
				id SERIAL PRIMARY KEY,
				email VARCHAR NOT NULL UNIQUE,
				username VARCHAR NOT NULL UNIQUE,
				hashed_password VARCHAR NOT NULL
			)
		"#,
	},
	Table {
		name: "posts",
		definition: r#"
			CREATE TABLE IF NOT EXISTS posts (
				id SERIAL PRIMARY KEY,
				title VARCHAR NOT NULL,
				content VARCHAR NOT NULL,
				owner_id INTEGER NOT NULL REFERENCES users (id),
				created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
				published BOOLEAN NOT NULL DEFAULT TRUE
			)
		"#,
	},
];

/// Key of the transaction-level advisory lock held while creating tables.
const SCHEMA_LOCK: i64 = 0x626c_6f67;

/// Creates the tables that do not exist yet.
///
/// Existing tables are never dropped or altered, whatever their shape.
/// Concurrent callers are serialized, as `CREATE TABLE IF NOT EXISTS` is not
/// safe to race in Postgres.
pub async fn create_all(database: &Database) -> Result<(), sqlx::Error> {
	let mut tx = database.begin().await?;

	sqlx::query("SELECT pg_advisory_xact_lock($1)")
		.bind(SCHEMA_LOCK)
		.execute(&mut *tx)
		.await?;

	for table in TABLES {
		sqlx::query(table.definition).execute(&mut *tx).await?;
		tracing::debug!(table = table.name, "table ensured");
	}

	tx.commit().await
}
