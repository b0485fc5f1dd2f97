use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const DEFAULT_SHARD_COUNT: usize = 16;
const DEFAULT_WINDOW_SECS: u64 = 60;
const DEFAULT_MAX_BUCKETS: usize = 10_000;

#[derive(Clone)]
struct RateLimitBucket {
    count: u32,
    reset_at: Instant,
}

impl RateLimitBucket {
    fn new(window: Duration) -> Self {
        Self {
            count: 0,
            reset_at: Instant::now() + window,
        }
    }

    fn check_and_increment(&mut self, limit: u32, window: Duration) -> (bool, u32) {
        let now = Instant::now();

        // Reset if window expired
        if now >= self.reset_at {
            self.count = 0;
            self.reset_at = now + window;
        }

        if self.count < limit {
            self.count += 1;
            (true, limit.saturating_sub(self.count))
        } else {
            (false, 0)
        }
    }

    fn reset_in(&self) -> Duration {
        self.reset_at.saturating_duration_since(Instant::now())
    }

    fn expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// Sharded fixed-window rate limiter
///
/// Keys are hashed onto shards so concurrent requests from different clients
/// rarely contend on the same mutex.
#[derive(Clone)]
pub struct HttpRateLimiter {
    shards: Vec<Arc<Mutex<HashMap<String, RateLimitBucket>>>>,
    limit_per_window: u32,
    window: Duration,
    max_buckets: usize, // per shard
    trusted_proxy_count: usize,
}

impl HttpRateLimiter {
    /// `limit_per_minute` requests per client per 60 s window, 16 shards.
    pub fn new(limit_per_minute: u32) -> Self {
        Self::with_shards(limit_per_minute, DEFAULT_SHARD_COUNT)
    }

    pub fn with_shards(limit_per_minute: u32, shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let shards = (0..shard_count)
            .map(|_| Arc::new(Mutex::new(HashMap::new())))
            .collect();
        Self {
            shards,
            limit_per_window: limit_per_minute,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            max_buckets: DEFAULT_MAX_BUCKETS,
            trusted_proxy_count: 1,
        }
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets.max(1);
        self
    }

    /// Number of proxies whose `X-Forwarded-For` entries are trusted.
    pub fn with_trusted_proxy_count(mut self, count: usize) -> Self {
        self.trusted_proxy_count = count;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit_per_window
    }

    pub fn trusted_proxy_count(&self) -> usize {
        self.trusted_proxy_count
    }

    fn shard_index(&self, key: &str) -> usize {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    /// Count one request for `key`.
    ///
    /// `Ok(remaining)` when allowed, `Err(reset_in)` when the window is used up.
    pub async fn check(&self, key: &str) -> Result<u32, Duration> {
        let shard_index = self.shard_index(key);
        let mut buckets = self.shards[shard_index].lock().await;

        if buckets.len() >= self.max_buckets && !buckets.contains_key(key) {
            let now = Instant::now();
            buckets.retain(|_, bucket| !bucket.expired(now));

            if buckets.len() >= self.max_buckets {
                let oldest_key = buckets
                    .iter()
                    .min_by_key(|(_, bucket)| bucket.reset_at)
                    .map(|(k, _)| k.clone());

                if let Some(key_to_remove) = oldest_key {
                    buckets.remove(&key_to_remove);
                    tracing::debug!(
                        removed_key = %key_to_remove,
                        shard_index,
                        remaining_buckets = buckets.len(),
                        "Evicted oldest rate limit bucket due to capacity limit"
                    );
                }
            }
        }

        let window = self.window;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| RateLimitBucket::new(window));

        let (allowed, remaining) = bucket.check_and_increment(self.limit_per_window, window);
        if allowed {
            Ok(remaining)
        } else {
            Err(bucket.reset_in())
        }
    }

    /// Drop every bucket whose window has ended.
    pub async fn cleanup_expired_buckets(&self) -> usize {
        let now = Instant::now();
        let mut total_cleaned = 0;

        for shard in &self.shards {
            let mut buckets = shard.lock().await;
            let before = buckets.len();
            buckets.retain(|_, bucket| !bucket.expired(now));
            total_cleaned += before - buckets.len();
        }

        if total_cleaned > 0 {
            tracing::debug!(
                buckets_cleaned = total_cleaned,
                "Cleaned up expired rate limit buckets"
            );
        }
        total_cleaned
    }

    pub async fn bucket_count(&self) -> usize {
        let mut total = 0;
        for shard in &self.shards {
            total += shard.lock().await.len();
        }
        total
    }
}

/// Sweep expired buckets every `interval` until the runtime shuts down.
pub fn spawn_cleanup_task(limiter: Arc<HttpRateLimiter>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            limiter.cleanup_expired_buckets().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_sixty_allowed_then_limited() {
        let limiter = HttpRateLimiter::new(60);

        for i in 0..60 {
            assert_eq!(limiter.check("ip:1.2.3.4").await, Ok(59 - i));
        }
        let reset_in = limiter.check("ip:1.2.3.4").await.unwrap_err();
        assert!(reset_in <= Duration::from_secs(60));
        assert!(reset_in > Duration::from_secs(59));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = HttpRateLimiter::new(1);
        assert!(limiter.check("ip:1.1.1.1").await.is_ok());
        assert!(limiter.check("ip:1.1.1.1").await.is_err());
        assert!(limiter.check("ip:2.2.2.2").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets() {
        let limiter = HttpRateLimiter::new(2);
        limiter.check("k").await.unwrap();
        limiter.check("k").await.unwrap();
        assert!(limiter.check("k").await.is_err());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.check("k").await, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_removes_expired_buckets() {
        let limiter = HttpRateLimiter::new(10);
        limiter.check("a").await.unwrap();
        limiter.check("b").await.unwrap();
        assert_eq!(limiter.cleanup_expired_buckets().await, 0);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(limiter.cleanup_expired_buckets().await, 2);
        assert_eq!(limiter.bucket_count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps() {
        let limiter = Arc::new(HttpRateLimiter::new(10));
        limiter.check("a").await.unwrap();

        let handle = spawn_cleanup_task(limiter.clone(), Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(limiter.bucket_count().await, 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let limiter = HttpRateLimiter::with_shards(10, 1).with_max_buckets(2);
        limiter.check("a").await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        limiter.check("b").await.unwrap();
        limiter.check("c").await.unwrap();
        assert_eq!(limiter.bucket_count().await, 2);
    }
}
