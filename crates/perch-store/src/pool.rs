//! Store connection setup

use redis::aio::ConnectionManager;
use tracing::instrument;

use crate::error::StoreResult;
use crate::redis_store::RedisSessionStore;

/// Accept both a bare `host:port` address and a full `redis://` URL
pub fn normalize_dsn(dsn: &str) -> String {
    let dsn = dsn.trim();
    if dsn.contains("://") {
        dsn.to_string()
    } else {
        format!("redis://{dsn}")
    }
}

/// Connect to redis and verify the connection with a PING
#[instrument(skip_all)]
pub async fn connect(dsn: &str) -> StoreResult<RedisSessionStore> {
    let client = redis::Client::open(normalize_dsn(dsn))?;
    let mut manager = ConnectionManager::new(client).await?;

    let pong: String = redis::cmd("PING").query_async(&mut manager).await?;
    tracing::debug!(reply = %pong, "Session store connected");

    Ok(RedisSessionStore::new(manager))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_bare_address() {
        assert_eq!(normalize_dsn("localhost:6379"), "redis://localhost:6379");
    }

    #[test]
    fn test_normalize_keeps_url() {
        assert_eq!(normalize_dsn(" rediss://cache:6380/2 "), "rediss://cache:6380/2");
    }
}
