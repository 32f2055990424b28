//! Apply database migrations.

use taskhub_core::config::AppConfig;
use taskhub_core::error::AppError;
use taskhub_database::DatabasePool;

/// Execute the migrate command
pub async fn execute(config: AppConfig) -> Result<(), AppError> {
    let db = DatabasePool::connect(&config.database).await?;
    taskhub_database::migration::run_migrations(db.pool()).await?;
    db.close().await;
    println!("All migrations applied successfully.");
    Ok(())
}
