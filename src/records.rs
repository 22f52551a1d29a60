//! Declared input record schemas
//!
//! The raw files are newline-delimited JSON. Instead of inferring a schema at
//! load time, both record shapes are declared here and decoded field by field,
//! failing fast with a named error when a required field is absent or
//! mistyped.

use crate::error::{Error, Result};
use serde_json::Value;

// ============================================================================
// Song-metadata records
// ============================================================================

/// One record from a song-metadata file (one record per file)
#[derive(Debug, Clone, PartialEq)]
pub struct SongRecord {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
    pub artist_name: String,
    pub artist_location: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
}

impl SongRecord {
    const RECORD: &'static str = "song-metadata";

    /// Decode a song-metadata record from a raw JSON value
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, Self::RECORD)?;
        Ok(Self {
            song_id: req_string(obj, "song_id", Self::RECORD)?,
            title: req_string(obj, "title", Self::RECORD)?,
            artist_id: req_string(obj, "artist_id", Self::RECORD)?,
            year: req_i64(obj, "year", Self::RECORD)? as i32,
            duration: req_f64(obj, "duration", Self::RECORD)?,
            artist_name: req_string(obj, "artist_name", Self::RECORD)?,
            artist_location: opt_string(obj, "artist_location")?,
            artist_latitude: opt_f64(obj, "artist_latitude")?,
            artist_longitude: opt_f64(obj, "artist_longitude")?,
        })
    }
}

// ============================================================================
// Activity-log records
// ============================================================================

/// One row from an activity-log file
///
/// Only `ts` and `page` are required: rows for logged-out sessions carry null
/// identity fields, and the play filter happens downstream of decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub user_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub ts: i64,
    pub page: String,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

impl LogRecord {
    const RECORD: &'static str = "activity-log";

    /// Decode an activity-log record from a raw JSON value
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = as_object(value, Self::RECORD)?;
        Ok(Self {
            user_id: opt_string_or_number(obj, "userId")?,
            first_name: opt_string(obj, "firstName")?,
            last_name: opt_string(obj, "lastName")?,
            gender: opt_string(obj, "gender")?,
            level: opt_string(obj, "level")?,
            ts: req_i64(obj, "ts", Self::RECORD)?,
            page: req_string(obj, "page", Self::RECORD)?,
            song: opt_string(obj, "song")?,
            artist: opt_string(obj, "artist")?,
            length: opt_f64(obj, "length")?,
            session_id: req_i64(obj, "sessionId", Self::RECORD)?,
            location: opt_string(obj, "location")?,
            user_agent: opt_string(obj, "userAgent")?,
        })
    }

    /// Key for whole-record deduplication
    ///
    /// `f64` has no total equality, so the optional `length` enters the key as
    /// its raw bit pattern.
    pub fn dedup_key(&self) -> LogDedupKey {
        LogDedupKey {
            user_id: self.user_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            gender: self.gender.clone(),
            level: self.level.clone(),
            ts: self.ts,
            page: self.page.clone(),
            song: self.song.clone(),
            artist: self.artist.clone(),
            length_bits: self.length.map(f64::to_bits),
            session_id: self.session_id,
            location: self.location.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// Hashable identity of a full activity-log record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogDedupKey {
    user_id: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    level: Option<String>,
    ts: i64,
    page: String,
    song: Option<String>,
    artist: Option<String>,
    length_bits: Option<u64>,
    session_id: i64,
    location: Option<String>,
    user_agent: Option<String>,
}

// ============================================================================
// Field decoding helpers
// ============================================================================

fn as_object<'a>(
    value: &'a Value,
    record: &str,
) -> Result<&'a serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::record_type(record))
}

fn req_string(obj: &serde_json::Map<String, Value>, field: &str, record: &str) -> Result<String> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(Error::missing_field(field, record)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(Error::field_type(field, "string")),
    }
}

fn opt_string(obj: &serde_json::Map<String, Value>, field: &str) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(Error::field_type(field, "string")),
    }
}

/// Accept either a JSON string or a JSON number, as the upstream logger emits
/// user ids both ways
fn opt_string_or_number(
    obj: &serde_json::Map<String, Value>,
    field: &str,
) -> Result<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(Error::field_type(field, "string or number")),
    }
}

fn req_i64(obj: &serde_json::Map<String, Value>, field: &str, record: &str) -> Result<i64> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(Error::missing_field(field, record)),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| Error::field_type(field, "integer")),
        Some(_) => Err(Error::field_type(field, "integer")),
    }
}

fn req_f64(obj: &serde_json::Map<String, Value>, field: &str, record: &str) -> Result<f64> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(Error::missing_field(field, record)),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| Error::field_type(field, "number")),
        Some(_) => Err(Error::field_type(field, "number")),
    }
}

fn opt_f64(obj: &serde_json::Map<String, Value>, field: &str) -> Result<Option<f64>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(_) => Err(Error::field_type(field, "number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn song_json() -> Value {
        json!({
            "num_songs": 1,
            "song_id": "SOUPIRU12A6D4FA1E1",
            "title": "Der Kleine Dompfaff",
            "artist_id": "ARJIE2Y1187B994AB7",
            "year": 0,
            "duration": 152.92036,
            "artist_name": "Line Renaud",
            "artist_location": "",
            "artist_latitude": null,
            "artist_longitude": null
        })
    }

    fn log_json() -> Value {
        json!({
            "userId": "26",
            "firstName": "Ryan",
            "lastName": "Smith",
            "gender": "M",
            "level": "free",
            "ts": 1_541_106_106_796_i64,
            "page": "NextSong",
            "song": "Der Kleine Dompfaff",
            "artist": "Line Renaud",
            "length": 152.92036,
            "sessionId": 169,
            "location": "San Jose-Sunnyvale-Santa Clara, CA",
            "userAgent": "Mozilla/5.0"
        })
    }

    #[test]
    fn test_decode_song_record() {
        let record = SongRecord::from_json(&song_json()).unwrap();
        assert_eq!(record.song_id, "SOUPIRU12A6D4FA1E1");
        assert_eq!(record.year, 0);
        assert!(record.artist_latitude.is_none());
        assert_eq!(record.artist_location.as_deref(), Some(""));
    }

    #[test]
    fn test_song_missing_field() {
        let mut value = song_json();
        value.as_object_mut().unwrap().remove("duration");
        let err = SongRecord::from_json(&value).unwrap_err();
        assert!(matches!(err, Error::MissingField { .. }));
        assert!(err.to_string().contains("duration"));
    }

    #[test]
    fn test_song_mistyped_field() {
        let mut value = song_json();
        value["year"] = json!("nineteen-eighty");
        let err = SongRecord::from_json(&value).unwrap_err();
        assert!(matches!(err, Error::FieldType { .. }));
    }

    #[test]
    fn test_decode_log_record() {
        let record = LogRecord::from_json(&log_json()).unwrap();
        assert_eq!(record.user_id.as_deref(), Some("26"));
        assert_eq!(record.page, "NextSong");
        assert_eq!(record.ts, 1_541_106_106_796);
    }

    #[test]
    fn test_log_numeric_user_id() {
        let mut value = log_json();
        value["userId"] = json!(26);
        let record = LogRecord::from_json(&value).unwrap();
        assert_eq!(record.user_id.as_deref(), Some("26"));
    }

    #[test]
    fn test_log_anonymous_row() {
        let value = json!({
            "userId": "",
            "firstName": null,
            "lastName": null,
            "gender": null,
            "level": "free",
            "ts": 1_541_106_106_796_i64,
            "page": "Home",
            "song": null,
            "artist": null,
            "length": null,
            "sessionId": 52,
            "location": null,
            "userAgent": null
        });
        let record = LogRecord::from_json(&value).unwrap();
        assert!(record.user_id.is_none());
        assert_eq!(record.page, "Home");
    }

    #[test]
    fn test_non_object_line_names_the_record() {
        let err = LogRecord::from_json(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, Error::RecordType { .. }));
        assert_eq!(
            err.to_string(),
            "Expected a JSON object for activity-log record"
        );
    }

    #[test]
    fn test_log_missing_ts_fails() {
        let mut value = log_json();
        value.as_object_mut().unwrap().remove("ts");
        let err = LogRecord::from_json(&value).unwrap_err();
        assert!(err.to_string().contains("ts"));
    }

    #[test]
    fn test_dedup_key_equality() {
        let a = LogRecord::from_json(&log_json()).unwrap();
        let b = LogRecord::from_json(&log_json()).unwrap();
        assert_eq!(a.dedup_key(), b.dedup_key());

        let mut other = log_json();
        other["sessionId"] = json!(170);
        let c = LogRecord::from_json(&other).unwrap();
        assert_ne!(a.dedup_key(), c.dedup_key());
    }
}
