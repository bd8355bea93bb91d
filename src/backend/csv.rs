//! CSV sink: one row per worklog event, header written exactly once.
//!
//! The delimiter and quoting mode come from the configuration. The sequential
//! `worklog_id` is derived from the current line count, so it drifts by n if n
//! rows are removed by hand; the file is owned by a single listener process.

use std::fs::OpenOptions;
use std::path::Path;

use crate::config::CsvConfig;
use crate::error::{Error, Result};
use crate::store::{worklog::resolve_timestamp, NewWorklog, Worklog};

use super::StorageBackend;

const HEADER: [&str; 5] = [
    "worklog_id",
    "project_id",
    "action_id",
    "timestamp",
    "ticket_key",
];

pub struct CsvBackend {
    config: CsvConfig,
    delimiter: u8,
}

impl CsvBackend {
    /// Validate the configured delimiter up front; a bad delimiter is a
    /// startup error, not a per-write one.
    pub fn new(config: CsvConfig) -> anyhow::Result<Self> {
        let mut bytes = config.delimiter.bytes();
        let delimiter = match (bytes.next(), bytes.next()) {
            (Some(b), None) => b,
            _ => anyhow::bail!(
                "CSV delimiter must be a single byte, got {:?}",
                config.delimiter
            ),
        };
        Ok(Self { config, delimiter })
    }

    fn output_path(&self) -> &Path {
        Path::new(&self.config.output)
    }

    /// Data rows currently in the file (line count minus the header).
    fn row_count(&self) -> Result<i64> {
        match std::fs::read_to_string(self.output_path()) {
            Ok(contents) => Ok(contents.lines().count().saturating_sub(1) as i64),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(Error::Write(format!(
                "cannot read {}: {e}",
                self.config.output
            ))),
        }
    }
}

impl StorageBackend for CsvBackend {
    fn driver(&self) -> &'static str {
        "csv"
    }

    fn append_worklog(&mut self, entry: &NewWorklog) -> Result<Worklog> {
        let timestamp = resolve_timestamp(entry)?;
        let worklog_id = self.row_count()? + 1;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.output_path())
            .map_err(|e| {
                Error::Write(format!(
                    "cannot open {} for append: {e}",
                    self.config.output
                ))
            })?;
        let write_header = file.metadata().map(|m| m.len() == 0).unwrap_or(true);

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(self.config.quoting.quote_style())
            .from_writer(file);

        if write_header {
            writer.write_record(HEADER)?;
        }
        writer.write_record([
            worklog_id.to_string(),
            entry.project_id.clone(),
            entry.action_id.clone(),
            timestamp.clone(),
            entry.ticket_key.clone().unwrap_or_default(),
        ])?;
        writer.flush().map_err(|e| Error::Write(e.to_string()))?;

        Ok(Worklog {
            worklog_id,
            project_id: entry.project_id.clone(),
            action_id: entry.action_id.clone(),
            timestamp,
            ticket_key: entry.ticket_key.clone(),
        })
    }

    /// Make sure the output file exists; the header itself is written by the
    /// first append into an empty file.
    fn init_schema(&mut self) -> Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.output_path())
            .map_err(|e| Error::Write(format!("cannot create {}: {e}", self.config.output)))?;
        Ok(())
    }

    fn drop_schema(&mut self) -> Result<()> {
        match std::fs::remove_file(self.output_path()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Write(format!(
                "cannot remove {}: {e}",
                self.config.output
            ))),
        }
    }

    /// CSV rows carry no `deleted` column, so there is nothing to prune.
    fn prune_deleted(&mut self) -> Result<()> {
        Ok(())
    }

    fn truncate(&mut self) -> Result<()> {
        match OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(self.output_path())
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Write(format!(
                "cannot truncate {}: {e}",
                self.config.output
            ))),
        }
    }
}
