//! Shared Redis connection setup for the cache and the event stream.

use crate::{Error, Result};
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Opens a managed connection and confirms it with `PING`, bounded by `timeout`.
pub async fn connect(url: &str, timeout: Duration) -> Result<ConnectionManager> {
    let client = redis::Client::open(url).map_err(|e| Error::operation("redis_open", e))?;

    let probe = async {
        let mut conn = client.get_connection_manager().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok::<_, redis::RedisError>(conn)
    };

    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(Error::operation("redis_ping", e)),
        Err(_) => Err(Error::operation(
            "redis_ping",
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}

/// Runs a Redis call bounded by `timeout`.
pub async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    call: impl Future<Output = redis::RedisResult<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::operation(operation, e)),
        Err(_) => Err(Error::operation(
            operation,
            format!("timed out after {}ms", timeout.as_millis()),
        )),
    }
}
