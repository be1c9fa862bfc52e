pub mod analytics;
pub mod attendance;
