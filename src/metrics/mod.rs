mod history;
mod provider;

pub use history::SnapshotHistory;
pub use provider::{ActiveMetricsProvider, HttpMetricsProvider, MetricsProvider, ServiceSnapshot};

#[cfg(test)]
pub(crate) use provider::MockMetricsProvider;
