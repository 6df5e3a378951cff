use std::sync::Arc;

use crate::{
    config::Config,
    database::{RedisStore, init_redis},
    store::Store,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let redis_connection = init_redis(&config.redis_url).await;
        let store = Arc::new(RedisStore::new(redis_connection));

        Arc::new(Self { config, store })
    }

    /// State over an arbitrary backend, used by the test suite.
    pub fn with_store(store: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            config: Config {
                port: 0,
                redis_url: String::new(),
            },
            store,
        })
    }
}
