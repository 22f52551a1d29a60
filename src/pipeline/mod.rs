//! Job orchestration
//!
//! Two stages run in sequence and share nothing but the in-memory `songs`
//! table handed from the first to the second. The first error aborts the run;
//! datasets already overwritten by an earlier stage stay overwritten.

mod events;
mod songs;

pub use events::{derive_time, derive_users, join_songplays, prepare_plays, process_log_data};
pub use songs::{process_song_data, project_artists, project_songs};

use crate::config::JobConfig;
use crate::error::Result;
use crate::output::ParquetWriterConfig;
use crate::storage::Storage;
use tracing::info;

/// Execute one full ETL run
pub async fn run(config: &JobConfig) -> Result<()> {
    let input = Storage::open(&config.input_root, config.credentials.as_ref())?;
    let output = Storage::create(&config.output_root, config.credentials.as_ref())?;
    let writer_config = ParquetWriterConfig::default();

    info!(
        input = config.input_root,
        output = config.output_root,
        "Starting ETL run"
    );

    let songs = process_song_data(&input, &output, &writer_config).await?;
    process_log_data(&input, &output, &songs, &writer_config).await?;

    info!("ETL run complete");
    Ok(())
}
