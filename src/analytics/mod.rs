use std::sync::Arc;

use async_trait::async_trait;
use strum_macros::{Display, EnumString};

use crate::error::AnalyticsError;
use crate::model::anomaly::{AnomalyRecord, Threshold};
use crate::repository::AttendanceRepository;

pub mod features;
pub mod forecast;
pub mod holidays;
pub mod isolation_forest;
pub mod rules;
pub mod scorer;

use isolation_forest::ForestParams;
use rules::RuleBasedStrategy;
use scorer::IsolationForestStrategy;

/// A way of scanning every employee's history for unusual attendance.
#[async_trait]
pub trait AnomalyDetectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Findings across all employees, highest `anomaly_score` first.
    async fn detect(&self, threshold: Threshold) -> Result<Vec<AnomalyRecord>, AnalyticsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum StrategyKind {
    IsolationForest,
    RuleBased,
}

pub fn build_strategy(
    kind: StrategyKind,
    repo: Arc<dyn AttendanceRepository>,
    forest: ForestParams,
) -> Arc<dyn AnomalyDetectionStrategy> {
    match kind {
        StrategyKind::IsolationForest => Arc::new(IsolationForestStrategy::new(repo, forest)),
        StrategyKind::RuleBased => Arc::new(RuleBasedStrategy::new(repo)),
    }
}
