pub mod calendar;
pub mod db;
pub mod error;
pub mod import;
pub mod pipeline;
pub mod route_types;

pub use error::{Result, SnapshotError};
pub use pipeline::{build_snapshot, BuildOptions, BuildReport};
