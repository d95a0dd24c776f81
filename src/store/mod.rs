//! Durable mirror of the aggregator's records
//!
//! One file per record type under the data directory: counters, tickets
//! and user sets as JSONL (one record per line), the status as a single
//! JSON document. Loading tolerates corrupt individual lines - they are
//! logged and skipped so one bad record never takes down the rest - while
//! an unreadable file is a startup error.
//!
//! ```text
//! data/
//!   status.json      durable BotStatus fields
//!   reactions.jsonl  one counter per line
//!   tickets.jsonl    one ticket per line
//!   admins.jsonl     authorized users
//!   bans.jsonl       banned users
//!   guilds.jsonl     per-guild channel config
//! ```

mod atomic;
mod worker;

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::{
    AdminRecord, BanRecord, GuildChannels, ReactionRecord, RecordKind, RecordSet, StatusRecord,
    Ticket,
};

pub use atomic::{cleanup_stale_temps, replace_file};
pub use worker::run_flush_worker;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors the file store can fail with. These stay inside the process:
/// load failures are fatal at startup, save failures are logged by the
/// flush worker and retried on the next mutation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Locations of the record files
#[derive(Debug, Clone)]
pub struct StoreConfig {
    data_dir: PathBuf,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, kind: RecordKind) -> PathBuf {
        match kind {
            RecordKind::Status => self.data_dir.join("status.json"),
            RecordKind::Reactions => self.data_dir.join("reactions.jsonl"),
            RecordKind::Tickets => self.data_dir.join("tickets.jsonl"),
            RecordKind::Admins => self.data_dir.join("admins.jsonl"),
            RecordKind::Bans => self.data_dir.join("bans.jsonl"),
            RecordKind::Guilds => self.data_dir.join("guilds.jsonl"),
        }
    }
}

/// The persistent store adapter
#[derive(Debug, Clone)]
pub struct FileStore {
    config: StoreConfig,
}

impl FileStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Load every record type at startup. A missing file bootstraps that
    /// record type empty; an unreadable file is an error.
    pub fn load(&self) -> StoreResult<RecordSet> {
        let cleaned = cleanup_stale_temps(self.config.data_dir())?;
        if cleaned > 0 {
            warn!(cleaned, "removed stale temp files from an interrupted write");
        }

        let status = self.load_status()?;

        let reactions = self
            .load_lines::<ReactionRecord>(RecordKind::Reactions)?
            .into_iter()
            .map(ReactionRecord::into_entry)
            .collect();

        let tickets: BTreeMap<u64, Ticket> = self
            .load_lines::<Ticket>(RecordKind::Tickets)?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let admins = self
            .load_lines::<AdminRecord>(RecordKind::Admins)?
            .into_iter()
            .map(|a| (a.user, a.added_at))
            .collect();

        let bans = self
            .load_lines::<BanRecord>(RecordKind::Bans)?
            .into_iter()
            .map(|b| (b.user.clone(), b))
            .collect();

        let guilds = self
            .load_lines::<GuildChannels>(RecordKind::Guilds)?
            .into_iter()
            .map(|g| (g.guild.clone(), g))
            .collect();

        Ok(RecordSet {
            status,
            reactions,
            tickets,
            admins,
            bans,
            guilds,
        })
    }

    fn load_status(&self) -> StoreResult<StatusRecord> {
        let path = self.config.path_for(RecordKind::Status);
        if !path.exists() {
            return Ok(StatusRecord::default());
        }

        let content = fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(status) => Ok(status),
            Err(e) => {
                // A single corrupt record: fall back to defaults, the next
                // flush rewrites it.
                warn!(path = %path.display(), error = %e, "status record unreadable, using defaults");
                Ok(StatusRecord::default())
            }
        }
    }

    /// Read one JSONL file, skipping (and logging) lines that fail to parse
    fn load_lines<T: DeserializeOwned>(&self, kind: RecordKind) -> StoreResult<Vec<T>> {
        let path = self.config.path_for(kind);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!(
                        path = %path.display(),
                        line = line_no + 1,
                        error = %e,
                        "skipping corrupt record"
                    );
                }
            }
        }

        debug!(kind = %kind, loaded = records.len(), skipped, "loaded record file");
        Ok(records)
    }

    pub fn save_status(&self, status: &StatusRecord) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(status)?;
        replace_file(self.config.path_for(RecordKind::Status), |file| {
            writeln!(file, "{}", json)
        })?;
        Ok(())
    }

    pub fn save_reactions(&self, records: &[ReactionRecord]) -> StoreResult<()> {
        self.save_lines(RecordKind::Reactions, records)
    }

    pub fn save_tickets(&self, tickets: &[Ticket]) -> StoreResult<()> {
        self.save_lines(RecordKind::Tickets, tickets)
    }

    pub fn save_admins(&self, admins: &[AdminRecord]) -> StoreResult<()> {
        self.save_lines(RecordKind::Admins, admins)
    }

    pub fn save_bans(&self, bans: &[BanRecord]) -> StoreResult<()> {
        self.save_lines(RecordKind::Bans, bans)
    }

    pub fn save_guilds(&self, guilds: &[GuildChannels]) -> StoreResult<()> {
        self.save_lines(RecordKind::Guilds, guilds)
    }

    fn save_lines<T: Serialize>(&self, kind: RecordKind, records: &[T]) -> StoreResult<()> {
        // Serialize before touching the file so an encoding error cannot
        // leave a truncated temp behind the rename.
        let mut content = String::new();
        for record in records {
            content.push_str(&serde_json::to_string(record)?);
            content.push('\n');
        }

        replace_file(self.config.path_for(kind), |file| {
            file.write_all(content.as_bytes())
        })?;
        Ok(())
    }
}
