use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tracing::info;

/// Refuse feeds larger than this. Regional GTFS exports run a few hundred
/// megabytes at most.
const MAX_DOWNLOAD_SIZE: u64 = 500 * 1024 * 1024;

/// Download the feed ZIP into memory. Any failure here aborts the run
/// before the store is touched.
pub async fn download_feed(url: &str) -> Result<Vec<u8>> {
    info!(url, "downloading GTFS feed");
    let response = reqwest::get(url).await.context("feed request failed")?;
    if !response.status().is_success() {
        bail!("feed request returned HTTP {}", response.status());
    }
    if let Some(length) = response.content_length() {
        if length > MAX_DOWNLOAD_SIZE {
            bail!("feed is {length} bytes, over the {MAX_DOWNLOAD_SIZE} byte limit");
        }
    }

    let mut bytes: Vec<u8> = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("feed download interrupted")?;
        if (bytes.len() + chunk.len()) as u64 > MAX_DOWNLOAD_SIZE {
            bail!("feed exceeded the {MAX_DOWNLOAD_SIZE} byte download limit");
        }
        bytes.extend_from_slice(&chunk);
    }

    info!(bytes = bytes.len(), "feed downloaded");
    Ok(bytes)
}
