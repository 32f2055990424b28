//! Redis connection management.

use redis::Client;
use redis::aio::ConnectionManager;
use tracing::info;

use taskhub_core::traits::queue::QueueError;

/// Redis client wrapper with a reconnecting connection manager.
#[derive(Debug, Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Connect to `url`.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        info!(url = %mask_redis_url(url), "Connecting to Redis");

        let client = Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;

        info!("Successfully connected to Redis");
        Ok(Self { conn })
    }

    /// A handle to the shared connection.
    pub fn conn_mut(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Classify a Redis error, keeping refused connections distinct so the
/// worker can track outages.
pub fn map_redis_error(e: redis::RedisError) -> QueueError {
    if e.is_connection_refusal() {
        QueueError::ConnectionRefused(e.to_string())
    } else {
        QueueError::Backend(e.to_string())
    }
}

fn mask_redis_url(url: &str) -> String {
    let Some(at_pos) = url.rfind('@') else {
        return url.to_string();
    };
    let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
    match url[..at_pos].rfind(':') {
        Some(colon_pos) if colon_pos >= scheme_end => {
            format!("{}:****{}", &url[..colon_pos], &url[at_pos..])
        }
        _ => url.to_string(),
    }
}
