use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("feed archive error: {0}")]
    Feed(#[from] gtfs_seed_feed::FeedError),
}

pub type Result<T> = std::result::Result<T, SnapshotError>;
