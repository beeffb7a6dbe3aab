use std::collections::HashMap;
use std::io::Cursor;

use tracing::debug;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::errors::FeedError;
use crate::model::{FeedRecord, Row};

/// An in-memory GTFS feed archive.
///
/// The archive is the pipeline's record source: it hands out typed records
/// per table and nothing else touches the raw bytes.
pub struct FeedArchive {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl FeedArchive {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FeedError> {
        Ok(Self {
            archive: ZipArchive::new(Cursor::new(bytes))?,
        })
    }

    /// Parse every row of `T::TABLE`.
    ///
    /// A table absent from the archive yields zero records rather than an
    /// error. Rows missing a required field are dropped.
    pub fn records<T: FeedRecord>(&mut self) -> Result<Vec<T>, FeedError> {
        let entry = match self.archive.by_name(T::TABLE) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                debug!(table = T::TABLE, "table not present in feed");
                return Ok(Vec::new());
            }
            Err(err) => return Err(FeedError::Zip(err)),
        };

        let mut reader = csv::Reader::from_reader(entry);
        let headers = reader
            .headers()
            .map_err(|source| FeedError::Csv {
                table: T::TABLE,
                source,
            })?
            .clone();
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            // Some feeds ship a UTF-8 BOM glued to the first header name.
            .map(|(i, name)| (name.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for result in reader.records() {
            let record = result.map_err(|source| FeedError::Csv {
                table: T::TABLE,
                source,
            })?;
            match T::parse(&Row::new(&index, &record)) {
                Some(parsed) => records.push(parsed),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            debug!(
                table = T::TABLE,
                dropped, "dropped rows missing required fields"
            );
        }

        Ok(records)
    }
}
