use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::analytics::StrategyKind;
use crate::analytics::isolation_forest::ForestParams;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Rate limiting
    pub rate_analytics_per_min: u32,

    // Anomaly detection
    pub anomaly_strategy: StrategyKind,
    pub forest: ForestParams,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key}={raw:?} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let defaults = ForestParams::default();
        let forest = ForestParams {
            n_trees: parsed_or("FOREST_TREES", defaults.n_trees)?,
            contamination: parsed_or("FOREST_CONTAMINATION", defaults.contamination)?,
            seed: parsed_or("FOREST_SEED", defaults.seed)?,
            ..defaults
        };
        if forest.n_trees == 0 || !(0.0..=0.5).contains(&forest.contamination) {
            anyhow::bail!("FOREST_TREES must be positive and FOREST_CONTAMINATION within [0, 0.5]");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            rate_analytics_per_min: parsed_or("RATE_ANALYTICS_PER_MIN", 120)?,
            anomaly_strategy: parsed_or("ANOMALY_STRATEGY", StrategyKind::IsolationForest)?,
            forest,
        })
    }
}
