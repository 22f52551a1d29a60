//! Star-schema output tables
//!
//! Each table has a typed row struct, a declared Arrow schema, and a
//! conversion to a `RecordBatch`. Column names in the Parquet output keep the
//! upstream spelling (`userId`, `sessionId`) so downstream consumers see the
//! same layout the raw logs use.

use crate::error::Result;
use arrow::array::{
    ArrayRef, Float64Array, Int32Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::sync::Arc;

/// A materializable output table
pub trait Table: Sized {
    /// Dataset name without the `.parquet` suffix
    const NAME: &'static str;

    /// Column the output is partitioned by
    const PARTITION_KEY: &'static str;

    /// Declared Arrow schema
    fn schema() -> SchemaRef;

    /// Partition-directory value for this row
    fn partition_value(&self) -> String;

    /// Convert rows into a single `RecordBatch`
    fn to_batch(rows: &[Self]) -> Result<RecordBatch>;
}

fn utc_timestamp_ms() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
}

// ============================================================================
// songs
// ============================================================================

/// One row of the `songs` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

impl SongRow {
    /// Key for exact-row deduplication (`duration` by bit pattern)
    pub fn dedup_key(&self) -> (String, String, String, i32, u64) {
        (
            self.song_id.clone(),
            self.title.clone(),
            self.artist_id.clone(),
            self.year,
            self.duration.to_bits(),
        )
    }
}

impl Table for SongRow {
    const NAME: &'static str = "songs";
    const PARTITION_KEY: &'static str = "song_id";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("year", DataType::Int32, false),
            Field::new("duration", DataType::Float64, false),
        ]))
    }

    fn partition_value(&self) -> String {
        self.song_id.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.song_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.title))),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| &r.artist_id),
            )),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(Float64Array::from_iter_values(
                rows.iter().map(|r| r.duration),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

// ============================================================================
// artists
// ============================================================================

/// One row of the `artists` dimension
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

impl ArtistRow {
    /// Key for exact-row deduplication (coordinates by bit pattern)
    pub fn dedup_key(&self) -> (String, String, Option<String>, Option<u64>, Option<u64>) {
        (
            self.artist_id.clone(),
            self.artist_name.clone(),
            self.artist_location.clone(),
            self.artist_latitude.map(f64::to_bits),
            self.artist_longitude.map(f64::to_bits),
        )
    }
}

impl Table for ArtistRow {
    const NAME: &'static str = "artists";
    const PARTITION_KEY: &'static str = "artist_id";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("artist_name", DataType::Utf8, false),
            Field::new("artist_location", DataType::Utf8, true),
            Field::new("artist_latitude", DataType::Float64, true),
            Field::new("artist_longitude", DataType::Float64, true),
        ]))
    }

    fn partition_value(&self) -> String {
        self.artist_id.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| &r.artist_id),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| &r.artist_name),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| r.artist_location.clone())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.artist_latitude).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| r.artist_longitude).collect::<Vec<_>>(),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

// ============================================================================
// users
// ============================================================================

/// One row of the `users` dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
}

impl Table for UserRow {
    const NAME: &'static str = "users";
    const PARTITION_KEY: &'static str = "userId";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("userId", DataType::Utf8, false),
            Field::new("firstName", DataType::Utf8, false),
            Field::new("lastName", DataType::Utf8, false),
            Field::new("gender", DataType::Utf8, false),
            Field::new("level", DataType::Utf8, false),
        ]))
    }

    fn partition_value(&self) -> String {
        self.user_id.clone()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.user_id))),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| &r.first_name),
            )),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| &r.last_name),
            )),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.gender))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.level))),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

// ============================================================================
// time
// ============================================================================

/// One row of the `time` dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRow {
    /// Epoch milliseconds, UTC
    pub start_time: i64,
    pub hour: i32,
    pub day: i32,
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// 1 = Sunday .. 7 = Saturday
    pub weekday: i32,
}

impl TimeRow {
    /// Derive the calendar fields from an epoch-millisecond timestamp
    pub fn from_millis(ts: i64) -> Self {
        // Out-of-range millis clamp to the epoch rather than panic
        let dt: DateTime<Utc> = DateTime::from_timestamp_millis(ts).unwrap_or_default();
        Self {
            start_time: ts,
            hour: dt.hour() as i32,
            day: dt.day() as i32,
            week: dt.iso_week().week() as i32,
            month: dt.month() as i32,
            year: dt.year(),
            weekday: dt.weekday().number_from_sunday() as i32,
        }
    }
}

impl Table for TimeRow {
    const NAME: &'static str = "time";
    const PARTITION_KEY: &'static str = "start_time";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("start_time", utc_timestamp_ms(), false),
            Field::new("hour", DataType::Int32, false),
            Field::new("day", DataType::Int32, false),
            Field::new("week", DataType::Int32, false),
            Field::new("month", DataType::Int32, false),
            Field::new("year", DataType::Int32, false),
            Field::new("weekday", DataType::Int32, false),
        ]))
    }

    fn partition_value(&self) -> String {
        self.start_time.to_string()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(
                TimestampMillisecondArray::from_iter_values(rows.iter().map(|r| r.start_time))
                    .with_timezone("UTC"),
            ),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.hour))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.day))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.week))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.month))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.year))),
            Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.weekday))),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}

// ============================================================================
// songplays
// ============================================================================

/// One row of the `songplays` fact table
#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub songplay_id: i64,
    /// Epoch milliseconds, UTC
    pub start_time: i64,
    pub user_id: String,
    pub level: String,
    pub song_id: String,
    pub artist_id: String,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl Table for SongplayRow {
    const NAME: &'static str = "songplays";
    const PARTITION_KEY: &'static str = "songplay_id";

    fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("songplay_id", DataType::Int64, false),
            Field::new("start_time", utc_timestamp_ms(), false),
            Field::new("userId", DataType::Utf8, false),
            Field::new("level", DataType::Utf8, false),
            Field::new("song_id", DataType::Utf8, false),
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("sessionId", DataType::Int64, false),
            Field::new("location", DataType::Utf8, true),
            Field::new("userAgent", DataType::Utf8, true),
        ]))
    }

    fn partition_value(&self) -> String {
        self.songplay_id.to_string()
    }

    fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from_iter_values(
                rows.iter().map(|r| r.songplay_id),
            )),
            Arc::new(
                TimestampMillisecondArray::from_iter_values(rows.iter().map(|r| r.start_time))
                    .with_timezone("UTC"),
            ),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.user_id))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.level))),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| &r.song_id))),
            Arc::new(StringArray::from_iter_values(
                rows.iter().map(|r| &r.artist_id),
            )),
            Arc::new(Int64Array::from_iter_values(
                rows.iter().map(|r| r.session_id),
            )),
            Arc::new(StringArray::from(
                rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>(),
            )),
            Arc::new(StringArray::from(
                rows.iter()
                    .map(|r| r.user_agent.clone())
                    .collect::<Vec<_>>(),
            )),
        ];
        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}
