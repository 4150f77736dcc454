use crate::{config::Settings, db, error, info, success};

/// Creates the `playbacks` and `artists` tables if they do not exist yet.
pub async fn setup_db(settings: &Settings) {
    let database = &settings.database;
    info!(
        "Creating tables in {} on {}:{}...",
        database.name, database.host, database.port
    );

    let pool = db::connect(database);
    match db::create_schema(&pool).await {
        Ok(()) => success!("Database tables are ready."),
        Err(e) => error!("Failed to create database tables: {}", e),
    }
    pool.close().await;
}
