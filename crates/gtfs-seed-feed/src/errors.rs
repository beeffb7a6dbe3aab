use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("feed is not a readable ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{table} CSV error: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
}
