use std::time::Duration;

pub const DEFAULT_WORKER_COUNT: usize = 8;
pub const DEFAULT_QUEUE_SIZE: usize = 10_000;
pub const DEFAULT_BATCH_SIZE: usize = 500;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_SIDE_EFFECT_WORKERS: usize = 8;
pub const DEFAULT_SIDE_EFFECT_QUEUE_SIZE: usize = 4_096;

/// Sizing of the ingestion and side-effect pools. Zero means "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub worker_count: usize,
    pub queue_size: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub side_effect_workers: usize,
    pub side_effect_queue_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_size: DEFAULT_QUEUE_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS),
            side_effect_workers: DEFAULT_SIDE_EFFECT_WORKERS,
            side_effect_queue_size: DEFAULT_SIDE_EFFECT_QUEUE_SIZE,
        }
    }
}

impl PipelineConfig {
    pub fn normalized(self) -> Self {
        fn or_default(value: usize, default: usize) -> usize {
            if value == 0 {
                default
            } else {
                value
            }
        }

        Self {
            worker_count: or_default(self.worker_count, DEFAULT_WORKER_COUNT),
            queue_size: or_default(self.queue_size, DEFAULT_QUEUE_SIZE),
            batch_size: or_default(self.batch_size, DEFAULT_BATCH_SIZE),
            flush_interval: if self.flush_interval.is_zero() {
                Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS)
            } else {
                self.flush_interval
            },
            side_effect_workers: or_default(self.side_effect_workers, DEFAULT_SIDE_EFFECT_WORKERS),
            side_effect_queue_size: or_default(
                self.side_effect_queue_size,
                DEFAULT_SIDE_EFFECT_QUEUE_SIZE,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub api_token: Option<String>,
    pub server_token_sha256: Vec<String>,
    pub max_body_bytes: u64,
    pub request_timeout_seconds: u64,
    pub identity_cache_ttl: Duration,
    pub match_state_ttl: Duration,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub clickhouse_url: String,
    pub clickhouse_database: String,
    pub clickhouse_user: Option<String>,
    pub clickhouse_password: Option<String>,
    pub postgres_url: String,
    pub postgres_max_connections: u32,
    pub redis_url: String,
}
