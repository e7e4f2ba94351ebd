pub mod diff;
pub mod health;

pub use diff::diff_files;
pub use health::{health_check, metrics_endpoint, readiness_check};
