use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

pub async fn initialize_database(db_path: Option<&str>) -> anyhow::Result<()> {
    let db_file = db_path.unwrap_or("target/db/app.db");
    if let Some(parent) = std::path::Path::new(db_file).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if std::path::Path::new(db_file).is_absolute() {
        std::path::PathBuf::from(db_file)
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    bootstrap_schema(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

async fn table_exists(conn: &DatabaseConnection, name: &str) -> anyhow::Result<bool> {
    let check = format!(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='{}';",
        name
    );
    let rows = conn
        .query_all(Statement::from_string(DatabaseBackend::Sqlite, check))
        .await?;
    Ok(!rows.is_empty())
}

/// Ensure required tables exist (minimal schema bootstrap)
async fn bootstrap_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    if !table_exists(conn, "a001_marketplace_connection").await? {
        tracing::info!("Creating a001_marketplace_connection table");
        let create_connection_table_sql = r#"
            CREATE TABLE a001_marketplace_connection (
                id TEXT PRIMARY KEY NOT NULL,
                code TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL,
                comment TEXT,
                tenant_id TEXT NOT NULL,
                marketplace_kind TEXT NOT NULL,
                state TEXT NOT NULL DEFAULT 'disconnected',
                credential_ref TEXT,
                last_sync_at TEXT,
                last_sync_error TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT,
                updated_at TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_connection_table_sql.to_string(),
        ))
        .await?;
    }

    if !table_exists(conn, "a002_normalized_product").await? {
        tracing::info!("Creating a002_normalized_product table");
        let create_product_table_sql = r#"
            CREATE TABLE a002_normalized_product (
                id TEXT PRIMARY KEY NOT NULL,
                code TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL,
                comment TEXT,
                tenant_id TEXT NOT NULL,
                marketplace_kind TEXT NOT NULL,
                marketplace_native_id TEXT NOT NULL,
                sku TEXT NOT NULL DEFAULT '',
                price REAL NOT NULL DEFAULT 0,
                stock INTEGER NOT NULL DEFAULT 0,
                category TEXT,
                is_stale INTEGER NOT NULL DEFAULT 0,
                synced_at TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT,
                updated_at TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_product_table_sql.to_string(),
        ))
        .await?;
    }

    if !table_exists(conn, "a003_normalized_order").await? {
        tracing::info!("Creating a003_normalized_order table");
        let create_order_table_sql = r#"
            CREATE TABLE a003_normalized_order (
                id TEXT PRIMARY KEY NOT NULL,
                code TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL,
                comment TEXT,
                tenant_id TEXT NOT NULL,
                marketplace_kind TEXT NOT NULL,
                marketplace_native_order_id TEXT NOT NULL,
                order_number TEXT NOT NULL DEFAULT '',
                customer_name TEXT NOT NULL DEFAULT '',
                customer_email TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'new',
                total_amount REAL NOT NULL DEFAULT 0,
                item_count INTEGER NOT NULL DEFAULT 0,
                order_date TEXT,
                tracking_number TEXT,
                fulfillment_type TEXT,
                is_deleted INTEGER NOT NULL DEFAULT 0,
                created_at TEXT,
                updated_at TEXT,
                version INTEGER NOT NULL DEFAULT 0
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_order_table_sql.to_string(),
        ))
        .await?;
    } else {
        // Ensure tracking_number column exists; add if missing
        let pragma = format!("PRAGMA table_info('{}');", "a003_normalized_order");
        let cols = conn
            .query_all(Statement::from_string(DatabaseBackend::Sqlite, pragma))
            .await?;
        let mut has_tracking = false;
        for row in cols {
            let name: String = row.try_get("", "name").unwrap_or_default();
            if name == "tracking_number" {
                has_tracking = true;
            }
        }
        if !has_tracking {
            tracing::info!("Adding tracking_number column to a003_normalized_order");
            conn.execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                "ALTER TABLE a003_normalized_order ADD COLUMN tracking_number TEXT;".to_string(),
            ))
            .await?;
        }
    }

    if !table_exists(conn, "a004_sync_run").await? {
        tracing::info!("Creating a004_sync_run table");
        let create_sync_run_table_sql = r#"
            CREATE TABLE a004_sync_run (
                id TEXT PRIMARY KEY NOT NULL,
                tenant_id TEXT NOT NULL,
                marketplace_kind TEXT NOT NULL,
                started_at TEXT,
                finished_at TEXT,
                products_touched INTEGER NOT NULL DEFAULT 0,
                orders_touched INTEGER NOT NULL DEFAULT 0,
                error TEXT
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_sync_run_table_sql.to_string(),
        ))
        .await?;
    }

    if !table_exists(conn, "credential_vault").await? {
        tracing::info!("Creating credential_vault table");
        let create_vault_table_sql = r#"
            CREATE TABLE credential_vault (
                id TEXT PRIMARY KEY NOT NULL,
                tenant_id TEXT NOT NULL,
                marketplace_kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT,
                updated_at TEXT
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_vault_table_sql.to_string(),
        ))
        .await?;
    }

    if !table_exists(conn, "webhook_event").await? {
        tracing::info!("Creating webhook_event table");
        // id is AUTOINCREMENT: arrival order is the processing order
        let create_webhook_table_sql = r#"
            CREATE TABLE webhook_event (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tenant_id TEXT NOT NULL,
                marketplace_kind TEXT NOT NULL,
                event_id TEXT NOT NULL,
                event_type TEXT NOT NULL DEFAULT '',
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'queued',
                received_at TEXT,
                processed_at TEXT,
                error TEXT
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_webhook_table_sql.to_string(),
        ))
        .await?;
    }

    if !table_exists(conn, "system_log").await? {
        tracing::info!("Creating system_log table");
        let create_log_table_sql = r#"
            CREATE TABLE system_log (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                source TEXT NOT NULL,
                category TEXT NOT NULL,
                message TEXT NOT NULL
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_log_table_sql.to_string(),
        ))
        .await?;
    }

    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}
