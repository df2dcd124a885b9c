use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Clone, Debug)]
pub struct BackupStats {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub files_archived: u64,
    pub bytes_archived: u64,
    pub archive_size: u64,
    pub parts_uploaded: u64,
}

impl BackupStats {
    pub fn new() -> Self {
        BackupStats {
            start_time: Utc::now(),
            end_time: None,
            files_archived: 0,
            bytes_archived: 0,
            archive_size: 0,
            parts_uploaded: 0,
        }
    }

    pub fn end(&mut self) -> Duration {
        let end_time = Utc::now();
        self.end_time = Some(end_time);
        self.elapsed_time()
    }

    pub fn elapsed_time(&self) -> Duration {
        let end_time = self.end_time.unwrap_or_else(Utc::now);
        (end_time - self.start_time).to_std().unwrap_or_default()
    }
}

impl Default for BackupStats {
    fn default() -> Self {
        BackupStats::new()
    }
}
