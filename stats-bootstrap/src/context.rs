use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clickhouse::Client;
use redis::aio::ConnectionManager;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use stats_application::{
    ingest_channel, AchievementTracker, AppState, EventEffects, IdentityResolver, IngestionPool,
    MatchStateMachine, PipelineMetrics, SideEffectPool,
};
use stats_domain::{AchievementRepository, DbConfig, EventSink, IdentityRepository};
use stats_infrastructure::{
    AppConfig, ClickhouseEventSink, DefaultHealthService, PgAchievementRepository,
    PgIdentityRepository, RedisIdentityCache, RedisMatchStateStore,
};

const PG_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct AppContext {
    pub state: AppState,
    pub pool: IngestionPool,
    pub postgres: PgPool,
}

impl AppContext {
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from(path).await?,
            None => AppConfig::load().await?,
        };
        let runtime_config = config.to_runtime_config();
        let db_config = config.to_db_config();

        let sink = Arc::new(ClickhouseEventSink::new(
            clickhouse_client(&db_config),
            db_config.clickhouse_database.clone(),
        ));
        sink.ensure_schema().await.context("clickhouse schema")?;

        let postgres = PgPoolOptions::new()
            .max_connections(db_config.postgres_max_connections)
            .acquire_timeout(PG_ACQUIRE_TIMEOUT)
            .connect(&db_config.postgres_url)
            .await
            .context("connect postgres")?;
        let identity_repo = Arc::new(PgIdentityRepository::new(postgres.clone()));
        identity_repo.ensure_schema().await.context("identity schema")?;
        let achievement_repo = Arc::new(PgAchievementRepository::new(postgres.clone()));
        achievement_repo
            .ensure_schema()
            .await
            .context("achievement schema")?;

        let redis_client = redis::Client::open(db_config.redis_url.as_str())?;
        let redis = ConnectionManager::new(redis_client)
            .await
            .context("connect redis")?;
        let match_store = RedisMatchStateStore::new(redis.clone(), runtime_config.match_state_ttl);
        match_store.ping().await.context("redis ping")?;

        let identity = Arc::new(
            IdentityResolver::new(identity_repo.clone(), runtime_config.identity_cache_ttl)
                .with_shared_cache(Arc::new(RedisIdentityCache::new(redis))),
        );

        let pipeline = runtime_config.pipeline.normalized();
        let metrics = Arc::new(PipelineMetrics::default());
        let (queue, receiver) = ingest_channel(pipeline.queue_size, metrics.clone());

        let counters = Arc::new(match_store.clone());
        let effects = EventEffects::new(MatchStateMachine::new(
            counters.clone(),
            queue.clone(),
            metrics.clone(),
        ))
        .with_achievements(AchievementTracker::new(
            counters,
            achievement_repo,
            metrics.clone(),
        ))
        .with_identity(identity.clone());
        let side_effects = SideEffectPool::new(
            pipeline.side_effect_workers,
            pipeline.side_effect_queue_size,
            Arc::new(effects),
            metrics.clone(),
        );

        let pool = IngestionPool::new(pipeline, receiver, sink.clone(), metrics.clone())
            .with_identity(identity.clone())
            .with_side_effects(side_effects);

        let health = Arc::new(DefaultHealthService::new(sink, match_store, identity_repo));
        info!(
            clickhouse = %db_config.clickhouse_url,
            database = %db_config.clickhouse_database,
            "stores connected"
        );

        let state = AppState {
            config: runtime_config,
            queue,
            identity,
            health,
            metrics,
        };

        Ok(Self {
            state,
            pool,
            postgres,
        })
    }
}

fn clickhouse_client(db_config: &DbConfig) -> Client {
    let mut client = Client::default()
        .with_url(&db_config.clickhouse_url)
        .with_database(&db_config.clickhouse_database);
    if let Some(user) = &db_config.clickhouse_user {
        client = client.with_user(user);
    }
    if let Some(password) = &db_config.clickhouse_password {
        client = client.with_password(password);
    }
    client
}
