//! Event-log transformation stage
//!
//! Reads the activity logs, deduplicates and time-orders them, keeps only
//! play events, derives the `users` and `time` dimensions, and joins against
//! the song catalog to produce the `songplays` fact table.

use crate::error::Result;
use crate::output::{write_table, ParquetWriterConfig};
use crate::records::LogRecord;
use crate::storage::Storage;
use crate::tables::{SongRow, SongplayRow, TimeRow, UserRow};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

/// Log files live under `log_data/<year>/<month>/` in the input root
const LOG_DATA_PREFIX: &str = "log_data";
const LOG_DIR_LEVELS: usize = 2;

/// Page value marking a play event
const PLAY_PAGE: &str = "NextSong";

/// Run the event-log stage
pub async fn process_log_data(
    input: &Storage,
    output: &Storage,
    songs: &[SongRow],
    config: &ParquetWriterConfig,
) -> Result<()> {
    info!(prefix = LOG_DATA_PREFIX, "Reading activity logs");
    let paths = input.list_json(LOG_DATA_PREFIX, LOG_DIR_LEVELS).await?;

    let mut records = Vec::new();
    for path in &paths {
        for value in input.read_ndjson(path).await? {
            records.push(LogRecord::from_json(&value)?);
        }
    }
    info!(files = paths.len(), records = records.len(), "Loaded activity logs");

    let plays = prepare_plays(records);
    info!(plays = plays.len(), "Filtered play events");

    let users = derive_users(&plays);
    write_table(output, &users, config).await?;

    let time = derive_time(&plays);
    write_table(output, &time, config).await?;

    if songs.is_empty() {
        // Not a hard failure, but the join below cannot produce anything
        warn!("Song catalog is empty; songplays will have zero rows");
    }
    let songplays = join_songplays(&plays, songs);
    write_table(output, &songplays, config).await?;

    Ok(())
}

/// Deduplicate whole records, sort ascending by `ts`, keep only play events
///
/// The sort makes the downstream "most recent level" aggregate and the
/// ordinal key assignment deterministic within a run.
pub fn prepare_plays(records: Vec<LogRecord>) -> Vec<LogRecord> {
    let mut seen = HashSet::new();
    let mut rows: Vec<LogRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();

    rows.sort_by_key(|r| r.ts);
    rows.retain(|r| r.page == PLAY_PAGE);
    rows
}

/// One row per distinct (userId, firstName, lastName, gender)
///
/// `level` is the value carried by the row with the greatest `ts` in the
/// group; ties resolve to the later row in the deterministic sort order. The
/// input must already be sorted ascending by `ts`.
pub fn derive_users(plays: &[LogRecord]) -> Vec<UserRow> {
    let mut latest: BTreeMap<(String, String, String, String), String> = BTreeMap::new();

    for play in plays {
        let (Some(user_id), Some(first), Some(last), Some(gender), Some(level)) = (
            &play.user_id,
            &play.first_name,
            &play.last_name,
            &play.gender,
            &play.level,
        ) else {
            continue;
        };
        latest.insert(
            (user_id.clone(), first.clone(), last.clone(), gender.clone()),
            level.clone(),
        );
    }

    latest
        .into_iter()
        .map(|((user_id, first_name, last_name, gender), level)| UserRow {
            user_id,
            first_name,
            last_name,
            gender,
            level,
        })
        .collect()
}

/// One row per distinct `start_time` with its calendar breakdown
pub fn derive_time(plays: &[LogRecord]) -> Vec<TimeRow> {
    let distinct: BTreeSet<i64> = plays.iter().map(|r| r.ts).collect();
    distinct.into_iter().map(TimeRow::from_millis).collect()
}

/// Inner-join play events to the song catalog on exact title equality
///
/// The match is case-sensitive with no normalization: case or punctuation
/// drift between the log's free-text `song` field and the catalog title
/// silently drops the row. `songplay_id` is a global monotonic ordinal over
/// the joined output, so it is unique across the whole run.
pub fn join_songplays(plays: &[LogRecord], songs: &[SongRow]) -> Vec<SongplayRow> {
    let mut by_title: HashMap<&str, Vec<&SongRow>> = HashMap::new();
    for song in songs {
        by_title.entry(song.title.as_str()).or_default().push(song);
    }

    let mut rows = Vec::new();
    let mut next_id: i64 = 1;

    for play in plays {
        let Some(title) = &play.song else { continue };
        let Some(matches) = by_title.get(title.as_str()) else {
            continue;
        };

        // A title shared by several catalog rows multiplies the play,
        // matching inner-join semantics
        for song in matches {
            rows.push(SongplayRow {
                songplay_id: next_id,
                start_time: play.ts,
                user_id: play.user_id.clone().unwrap_or_default(),
                level: play.level.clone().unwrap_or_default(),
                song_id: song.song_id.clone(),
                artist_id: song.artist_id.clone(),
                session_id: play.session_id,
                location: play.location.clone(),
                user_agent: play.user_agent.clone(),
            });
            next_id += 1;
        }
    }

    rows
}
