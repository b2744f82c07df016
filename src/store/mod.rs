//! Data stores: one snapshot per domain, refreshed without duplicate requests

pub mod data_store;
pub mod fetch_guard;
pub mod sources;

pub use data_store::{
    DataStore, FetchMode, Patch, Refreshable, SnapshotSource, StoreSnapshot, SubResult,
};
pub use fetch_guard::{FetchFuture, FetchResult};
pub use sources::{DashboardSource, EngineSource, LogsSource, QueueSource};

pub type DashboardStore = DataStore<DashboardSource>;
pub type EngineStore = DataStore<EngineSource>;
pub type QueueStore = DataStore<QueueSource>;
pub type LogsStore = DataStore<LogsSource>;
