use serde::{Deserialize, Serialize};

/// Connection settings for the binding store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_pool_size: usize,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            host: "localhost".to_string(),
            port: 5432,
            database: "thermoband".to_string(),
            username: "thermoband".to_string(),
            password: "thermoband".to_string(),
            max_pool_size: 5,
        }
    }
}
