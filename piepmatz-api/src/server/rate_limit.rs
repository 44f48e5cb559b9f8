use piepmatz_common::model::user::UserId;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};
use thiserror::Error;

pub const RATE_LIMIT_KEY_PREFIX: &str = "piepmatz:ratelimit";

/// Post creation allows this many requests per caller and window.
pub const CREATE_POST_LIMIT: u64 = 3;
pub const CREATE_POST_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("System clock is before the unix epoch: {0}")]
    Clock(#[from] SystemTimeError),
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
}

/// Fixed-window rate limiter backed by redis. Every check is one
/// INCR+EXPIRE round trip; atomicity of the count is redis's INCR.
#[derive(Clone)]
pub struct RateLimiter {
    connection: ConnectionManager,
    prefix: String,
}

impl RateLimiter {
    pub fn new(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
        }
    }

    /// Counts this request against the caller's current window and reports
    /// whether it is still within the limit. A redis failure is an error,
    /// not a pass.
    pub async fn check(&self, caller: &UserId) -> Result<bool, RateLimitError> {
        let now_unix = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let key = window_key(&self.prefix, caller, now_unix);

        let mut connection = self.connection.clone();
        let count: u64 = connection.incr(&key, 1_u64).await?;
        // The key only needs to outlive its window; the extra window is slack
        // for clients still counting against the old key.
        let _: bool = connection
            .expire(&key, (2 * CREATE_POST_WINDOW_SECONDS).cast_signed())
            .await?;

        Ok(count <= CREATE_POST_LIMIT)
    }
}

fn window_key(prefix: &str, caller: &UserId, now_unix: u64) -> String {
    let window_start = now_unix - now_unix % CREATE_POST_WINDOW_SECONDS;
    format!("{prefix}:{caller}:{window_start}")
}

#[cfg(test)]
mod tests {
    use crate::server::rate_limit::{
        CREATE_POST_LIMIT, CREATE_POST_WINDOW_SECONDS, RateLimiter, window_key,
    };
    use piepmatz_common::model::user::UserId;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn caller(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    #[test]
    fn requests_in_one_window_share_a_key() {
        let caller = caller("user_1");
        let base = 1_700_000_040;

        let first = window_key("prefix", &caller, base);
        let second = window_key("prefix", &caller, base + CREATE_POST_WINDOW_SECONDS - 1);

        assert_eq!(first, second);
    }

    #[test]
    fn a_new_window_gets_a_new_key() {
        let caller = caller("user_1");
        let base = 1_700_000_040;

        let first = window_key("prefix", &caller, base);
        let second = window_key("prefix", &caller, base + CREATE_POST_WINDOW_SECONDS);

        assert_ne!(first, second);
    }

    #[test]
    fn callers_do_not_share_keys() {
        let now = 1_700_000_000;

        assert_ne!(
            window_key("prefix", &caller("user_1"), now),
            window_key("prefix", &caller("user_2"), now)
        );
    }

    #[test]
    fn key_starts_at_the_window_boundary() {
        let caller = caller("user_1");

        assert_eq!(
            window_key("prefix", &caller, 1_700_000_075),
            "prefix:user_1:1700000040"
        );
    }

    /// Runs only against a live redis named by `PIEPMATZ_TEST_REDIS_URL`.
    #[tokio::test]
    async fn fourth_request_in_a_window_is_denied() {
        let Ok(url) = std::env::var("PIEPMATZ_TEST_REDIS_URL") else {
            eprintln!("PIEPMATZ_TEST_REDIS_URL is not set, skipping");
            return;
        };

        let client = redis::Client::open(url).unwrap();
        let connection = client.get_connection_manager().await.unwrap();
        let limiter = RateLimiter::new(connection, "piepmatz:test:ratelimit");

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let caller = UserId::new(format!("test_{nanos}")).unwrap();
        let other_caller = UserId::new(format!("test_{nanos}_b")).unwrap();

        for _ in 0..CREATE_POST_LIMIT {
            assert!(limiter.check(&caller).await.unwrap());
        }
        assert!(!limiter.check(&caller).await.unwrap());

        // Another caller in the same window starts with a fresh count.
        assert!(limiter.check(&other_caller).await.unwrap());
    }
}
