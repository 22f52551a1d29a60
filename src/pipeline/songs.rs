//! Song-catalog extraction stage
//!
//! Reads the song-metadata files, derives the `songs` and `artists`
//! dimensions by exact-row deduplication, writes both as partitioned Parquet,
//! and returns the in-memory `songs` table for the event stage.

use crate::error::Result;
use crate::output::{write_table, ParquetWriterConfig};
use crate::records::SongRecord;
use crate::storage::Storage;
use crate::tables::{ArtistRow, SongRow};
use std::collections::HashSet;
use tracing::info;

/// Song files live under a fixed alphabetic subdirectory of the input root
const SONG_DATA_PREFIX: &str = "song_data/A/A/A";

/// Run the song-catalog stage
pub async fn process_song_data(
    input: &Storage,
    output: &Storage,
    config: &ParquetWriterConfig,
) -> Result<Vec<SongRow>> {
    info!(prefix = SONG_DATA_PREFIX, "Reading song metadata");
    let paths = input.list_json(SONG_DATA_PREFIX, 0).await?;

    let mut records = Vec::new();
    for path in &paths {
        for value in input.read_ndjson(path).await? {
            records.push(SongRecord::from_json(&value)?);
        }
    }
    info!(files = paths.len(), records = records.len(), "Loaded song metadata");

    let songs = project_songs(&records);
    write_table(output, &songs, config).await?;

    let artists = project_artists(&records);
    write_table(output, &artists, config).await?;

    Ok(songs)
}

/// Distinct projection of (song_id, title, artist_id, year, duration)
///
/// Deduplication is exact-row: two records sharing a song_id but differing in
/// any projected column both survive.
pub fn project_songs(records: &[SongRecord]) -> Vec<SongRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for record in records {
        let row = SongRow {
            song_id: record.song_id.clone(),
            title: record.title.clone(),
            artist_id: record.artist_id.clone(),
            year: record.year,
            duration: record.duration,
        };
        if seen.insert(row.dedup_key()) {
            rows.push(row);
        }
    }
    rows
}

/// Distinct projection of the artist columns
pub fn project_artists(records: &[SongRecord]) -> Vec<ArtistRow> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for record in records {
        let row = ArtistRow {
            artist_id: record.artist_id.clone(),
            artist_name: record.artist_name.clone(),
            artist_location: record.artist_location.clone(),
            artist_latitude: record.artist_latitude,
            artist_longitude: record.artist_longitude,
        };
        if seen.insert(row.dedup_key()) {
            rows.push(row);
        }
    }
    rows
}
