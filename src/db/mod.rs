use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgConnection, PgPool};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::models::{
    Client, ClientChanges, ClientFilter, ClientPhone, NewClient, Phone, PhoneUpdate,
};

const CREATE_CLIENT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS client(
        id SERIAL PRIMARY KEY,
        firstname VARCHAR(60) NOT NULL,
        lastname VARCHAR(60) NOT NULL,
        email VARCHAR(40) NOT NULL
    )
"#;

const CREATE_PHONE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS phone(
        id SERIAL PRIMARY KEY,
        client_id INTEGER NOT NULL REFERENCES client(id),
        number VARCHAR(30) UNIQUE NOT NULL
    )
"#;

/// Client directory backed by PostgreSQL
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the loaded configuration
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let options = config.connect_options()?;
        let db = Self::connect_with(options, config.db_max_connections).await?;

        Ok(db)
    }

    pub async fn connect_with(options: PgConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close every connection; later operations fail with a connection error
    pub async fn close(&self) {
        self.pool.close().await;
    }

    // Schema operations

    /// Drop both tables. Fails if either is missing.
    pub async fn drop_tables(&self) -> Result<()> {
        sqlx::query("DROP TABLE client, phone")
            .execute(self.get_pool())
            .await?;

        info!("dropped client and phone tables");
        Ok(())
    }

    pub async fn create_tables(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(CREATE_CLIENT_TABLE).execute(&mut *tx).await?;
        sqlx::query(CREATE_PHONE_TABLE).execute(&mut *tx).await?;

        tx.commit().await?;

        info!("client and phone tables are present");
        Ok(())
    }

    /// Drop whatever exists of the schema and create it again
    pub async fn reset_tables(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS phone, client")
            .execute(self.get_pool())
            .await?;

        self.create_tables().await
    }

    // Client operations

    /// Insert a client with its phones and return the generated id.
    ///
    /// Client and phones commit together; a rejected phone leaves no client behind.
    pub async fn add_client(&self, client: &NewClient) -> Result<i32> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO client (firstname, lastname, email) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .fetch_one(&mut *tx)
        .await?;

        insert_phones(&mut tx, id, &client.phones).await?;

        tx.commit().await?;

        info!(client_id = id, phones = client.phones.len(), "added client");
        Ok(id)
    }

    /// Apply a sparse update and, if asked, replace the client's phones.
    ///
    /// Both steps run in one transaction. Nothing is executed when `changes`
    /// is empty. An unknown id updates no row; replacing its phones fails on
    /// the foreign key.
    pub async fn change_client(&self, id: i32, changes: &ClientChanges) -> Result<()> {
        if changes.is_empty() {
            debug!(client_id = id, "no client changes requested");
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        if changes.has_field_changes() {
            let updated = sqlx::query(
                r#"
                UPDATE client
                SET firstname = COALESCE($1, firstname),
                    lastname = COALESCE($2, lastname),
                    email = COALESCE($3, email)
                WHERE id = $4
                "#,
            )
            .bind(changes.first_name.as_deref())
            .bind(changes.last_name.as_deref())
            .bind(changes.email.as_deref())
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            debug!(client_id = id, updated, "updated client fields");
        }

        if let PhoneUpdate::Replace(numbers) = &changes.phones {
            let removed = remove_phones(&mut tx, id).await?;
            insert_phones(&mut tx, id, numbers).await?;
            debug!(client_id = id, removed, added = numbers.len(), "replaced phones");
        }

        tx.commit().await?;

        info!(client_id = id, "changed client");
        Ok(())
    }

    /// Delete the client row only; returns rows removed. Fails while phones
    /// still reference it.
    pub async fn delete_client(&self, id: i32) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM client WHERE id = $1")
            .bind(id)
            .execute(self.get_pool())
            .await?
            .rows_affected();

        info!(client_id = id, deleted, "deleted client");
        Ok(deleted)
    }

    /// Delete the client together with all of its phones; returns phones removed
    pub async fn delete_client_cascade(&self, id: i32) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let removed = remove_phones(&mut tx, id).await?;

        sqlx::query("DELETE FROM client WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(client_id = id, phones = removed, "deleted client and phones");
        Ok(removed)
    }

    pub async fn get_client(&self, id: i32) -> Result<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, firstname, lastname, email FROM client WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.get_pool())
        .await?;

        Ok(client)
    }

    // Phone operations

    pub async fn add_phone(&self, client_id: i32, number: &str) -> Result<i32> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO phone (client_id, number) VALUES ($1, $2) RETURNING id",
        )
        .bind(client_id)
        .bind(number)
        .fetch_one(self.get_pool())
        .await?;

        debug!(client_id, phone_id = id, "added phone");
        Ok(id)
    }

    /// Insert all numbers in one statement; the whole batch lands or none of it does
    pub async fn add_phones(&self, client_id: i32, numbers: &[String]) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        insert_phones(&mut conn, client_id, numbers).await
    }

    /// Remove every phone of a client
    pub async fn delete_phones(&self, client_id: i32) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        remove_phones(&mut conn, client_id).await
    }

    pub async fn delete_phone(&self, client_id: i32, number: &str) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM phone WHERE client_id = $1 AND number = $2")
            .bind(client_id)
            .bind(number)
            .execute(self.get_pool())
            .await?
            .rows_affected();

        debug!(client_id, deleted, "deleted phone");
        Ok(deleted)
    }

    pub async fn phones_for_client(&self, client_id: i32) -> Result<Vec<Phone>> {
        let phones = sqlx::query_as::<_, Phone>(
            "SELECT id, client_id, number FROM phone WHERE client_id = $1 ORDER BY id ASC",
        )
        .bind(client_id)
        .fetch_all(self.get_pool())
        .await?;

        Ok(phones)
    }

    // Lookup

    /// Clients joined with their phones, one row per phone.
    ///
    /// Clients without phones never match.
    pub async fn find_client(&self, filter: &ClientFilter) -> Result<Vec<ClientPhone>> {
        let rows = sqlx::query_as::<_, ClientPhone>(
            r#"
            SELECT
                c.id AS client_id,
                c.firstname,
                c.lastname,
                c.email,
                p.id AS phone_id,
                p.number
            FROM client c
            JOIN phone p ON c.id = p.client_id
            WHERE c.firstname = COALESCE($1, c.firstname)
              AND c.lastname = COALESCE($2, c.lastname)
              AND c.email = COALESCE($3, c.email)
              AND p.number = COALESCE($4, p.number)
            ORDER BY c.id ASC, p.id ASC
            "#,
        )
        .bind(filter.first_name.as_deref())
        .bind(filter.last_name.as_deref())
        .bind(filter.email.as_deref())
        .bind(filter.phone.as_deref())
        .fetch_all(self.get_pool())
        .await?;

        debug!(matches = rows.len(), "find_client");
        Ok(rows)
    }
}

async fn insert_phones(conn: &mut PgConnection, client_id: i32, numbers: &[String]) -> Result<u64> {
    if numbers.is_empty() {
        return Ok(0);
    }

    let inserted = sqlx::query(
        "INSERT INTO phone (client_id, number) SELECT $1, UNNEST($2::varchar[])",
    )
    .bind(client_id)
    .bind(numbers)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    debug!(client_id, inserted, "inserted phones");
    Ok(inserted)
}

async fn remove_phones(conn: &mut PgConnection, client_id: i32) -> Result<u64> {
    let removed = sqlx::query("DELETE FROM phone WHERE client_id = $1")
        .bind(client_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    debug!(client_id, removed, "removed phones");
    Ok(removed)
}

/// Initialize the database connection pool
pub async fn init(config: &Config) -> anyhow::Result<Database> {
    let db = Database::new(config).await?;

    Ok(db)
}
