//! Health metrics appended to a JSON-lines log.

use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::HealthLog;
use crate::error::{AssistantError, Result};

/// Entries shown by a summary.
const SUMMARY_ENTRIES: usize = 5;

/// One logged measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthEntry {
    /// Local time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    /// Lower-cased metric name, e.g. `water`.
    pub metric_type: String,
    pub value: String,
    /// Lower-cased unit, possibly empty.
    #[serde(default)]
    pub unit: String,
}

/// Append-only health log file.
#[derive(Debug)]
pub struct JsonlHealthLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlHealthLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// All readable entries, oldest first. Unreadable lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be opened.
    pub fn entries(&self) -> Result<Vec<HealthEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = std::fs::File::open(&self.path).map_err(|e| {
            AssistantError::Health(format!("cannot open {}: {e}", self.path.display()))
        })?;
        let mut entries = Vec::new();
        for (lineno, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HealthEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(line = lineno + 1, "skipping unreadable health log entry: {e}"),
            }
        }
        Ok(entries)
    }
}

impl HealthLog for JsonlHealthLog {
    fn log_metric(&self, metric_type: &str, value: &str, unit: &str) -> Result<String> {
        let entry = HealthEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            metric_type: metric_type.trim().to_lowercase(),
            value: value.trim().to_owned(),
            unit: unit.trim().to_lowercase(),
        };
        let mut line = serde_json::to_string(&entry)
            .map_err(|e| AssistantError::Health(format!("cannot serialize entry: {e}")))?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                AssistantError::Health(format!("cannot open {}: {e}", self.path.display()))
            })?;
        file.write_all(line.as_bytes())?;

        info!(
            metric = %entry.metric_type,
            value = %entry.value,
            unit = %entry.unit,
            "health metric logged"
        );
        Ok("Got it. I've logged that for you.".to_owned())
    }

    fn summary(&self, metric_type: &str) -> Result<String> {
        if !self.path.exists() {
            return Ok("You haven't logged any health data yet.".to_owned());
        }
        let needle = metric_type.trim().to_lowercase();
        let matching: Vec<HealthEntry> = self
            .entries()?
            .into_iter()
            .filter(|e| e.metric_type.to_lowercase().contains(&needle))
            .collect();
        if matching.is_empty() {
            return Ok(format!(
                "I couldn't find any recent entries for '{}'.",
                metric_type.trim()
            ));
        }

        let recent = &matching[matching.len().saturating_sub(SUMMARY_ENTRIES)..];
        let lines: Vec<String> = recent
            .iter()
            .map(|e| {
                format!("- On {}, you logged: {} {}", e.timestamp, e.value, e.unit)
                    .trim_end()
                    .to_owned()
            })
            .collect();
        Ok(format!(
            "Here are your last {SUMMARY_ENTRIES} entries for '{}':\n{}",
            title_case(metric_type.trim()),
            lines.join("\n")
        ))
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
