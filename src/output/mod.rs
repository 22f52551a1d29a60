//! Partitioned Parquet dataset output
//!
//! A dataset lives at `<output root>/<name>.parquet/` with one directory per
//! partition value, Hive style:
//!
//! ```text
//! songs.parquet/song_id=SOUPIRU12A6D4FA1E1/data.parquet
//! time.parquet/start_time=1542241826796/data.parquet
//! ```
//!
//! Every write overwrites the whole dataset. There is no append or merge
//! mode: a rerun with identical inputs produces identical logical tables.

mod writer;

pub use writer::{batch_to_parquet_bytes, ParquetWriterConfig};

use crate::error::Result;
use crate::storage::Storage;
use crate::tables::Table;
use std::collections::BTreeMap;
use tracing::info;

/// Build the object path for one partition of a dataset
fn partition_path(name: &str, key: &str, value: &str) -> String {
    // Partition values are ids, ordinals, or epoch millis; slashes would
    // change the directory depth
    let sanitized = value.replace('/', "_");
    format!("{name}.parquet/{key}={sanitized}/data.parquet")
}

/// Write a table as a partitioned Parquet dataset, overwriting prior output
///
/// Rows are grouped by their partition value; each group becomes one file.
/// An empty row set still truncates the destination, matching overwrite
/// semantics for a run whose input produced nothing for this table.
pub async fn write_table<T: Table + Clone>(
    storage: &Storage,
    rows: &[T],
    config: &ParquetWriterConfig,
) -> Result<()> {
    let dataset = format!("{}.parquet", T::NAME);
    storage.delete_prefix(&dataset).await?;

    // BTreeMap keeps partition output order stable across reruns
    let mut partitions: BTreeMap<String, Vec<&T>> = BTreeMap::new();
    for row in rows {
        partitions.entry(row.partition_value()).or_default().push(row);
    }

    let partition_count = partitions.len();
    for (value, group) in partitions {
        let owned: Vec<T> = group.into_iter().cloned().collect();
        let batch = T::to_batch(&owned)?;
        let bytes = batch_to_parquet_bytes(&batch, config)?;
        let path = partition_path(T::NAME, T::PARTITION_KEY, &value);
        storage.put(&path, bytes).await?;
    }

    info!(
        table = T::NAME,
        rows = rows.len(),
        partitions = partition_count,
        "Wrote dataset"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::SongRow;

    fn song(id: &str, title: &str) -> SongRow {
        SongRow {
            song_id: id.to_string(),
            title: title.to_string(),
            artist_id: "A1".to_string(),
            year: 2018,
            duration: 180.0,
        }
    }

    #[test]
    fn test_partition_path() {
        assert_eq!(
            partition_path("songs", "song_id", "S1"),
            "songs.parquet/song_id=S1/data.parquet"
        );
    }

    #[test]
    fn test_partition_path_sanitizes_slashes() {
        assert_eq!(
            partition_path("users", "userId", "a/b"),
            "users.parquet/userId=a_b/data.parquet"
        );
    }

    #[tokio::test]
    async fn test_write_table_partitions_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().to_str().unwrap(), None).unwrap();

        let rows = vec![song("S1", "One"), song("S2", "Two"), song("S1", "One again")];
        write_table(&storage, &rows, &ParquetWriterConfig::default())
            .await
            .unwrap();

        assert!(storage
            .get("songs.parquet/song_id=S1/data.parquet")
            .await
            .is_ok());
        assert!(storage
            .get("songs.parquet/song_id=S2/data.parquet")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_write_table_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(dir.path().to_str().unwrap(), None).unwrap();
        let config = ParquetWriterConfig::default();

        write_table(&storage, &[song("S1", "One"), song("S2", "Two")], &config)
            .await
            .unwrap();
        write_table(&storage, &[song("S3", "Three")], &config)
            .await
            .unwrap();

        assert!(storage
            .get("songs.parquet/song_id=S1/data.parquet")
            .await
            .is_err());
        assert!(storage
            .get("songs.parquet/song_id=S3/data.parquet")
            .await
            .is_ok());
    }
}
