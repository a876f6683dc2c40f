//! Visit log - durable visit store backed by a JSONL journal
//!
//! Every saved visit is appended as one JSON object per line. On open the
//! journal is replayed into an [`InMemoryVisitStore`], which serves all reads.

use crate::domain::error::RepositoryError;
use crate::domain::types::{CourierId, Visit, VisitId};
use crate::io::memory::InMemoryVisitStore;
use crate::services::repository::VisitRepository;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Append-only visit journal with an in-memory index
pub struct VisitLog {
    path: PathBuf,
    index: InMemoryVisitStore,
    writer: Mutex<File>,
}

impl VisitLog {
    /// Open (or create) the journal at `path` and replay its contents
    ///
    /// Malformed lines are skipped with a warning.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let index = InMemoryVisitStore::new();
        let mut skipped = 0usize;
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (lineno, line) in reader.split(b'\n').enumerate() {
                let line = line?;
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                match serde_json::from_slice::<Visit>(&line) {
                    Ok(visit) => {
                        index.insert(visit);
                    }
                    Err(e) => {
                        skipped += 1;
                        warn!(file = %path.display(), line = %(lineno + 1), error = %e, "visit_log_line_skipped");
                    }
                }
            }
        }

        let writer = OpenOptions::new().create(true).append(true).open(&path)?;
        info!(
            file = %path.display(),
            visits = %index.len(),
            couriers = %index.courier_count(),
            skipped = %skipped,
            "visit_log_opened"
        );

        Ok(Self { path, index, writer: Mutex::new(writer) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total visits held
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = self.writer.lock();
        writeln!(file, "{}", line)?;
        file.flush()?;
        debug!(file = %self.path.display(), bytes = %line.len(), "visit_log_written");
        Ok(())
    }
}

impl VisitRepository for VisitLog {
    fn find_visits_between(
        &self,
        courier_id: &CourierId,
        store_name: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Visit>, RepositoryError> {
        self.index.find_visits_between(courier_id, store_name, from, to)
    }

    fn save_visit(&self, mut visit: Visit) -> Result<Visit, RepositoryError> {
        if visit.id.is_none() {
            visit.id = Some(VisitId::generate());
        }
        // Journal first; the index only sees visits that made it to disk
        let line = serde_json::to_string(&visit)?;
        self.append_line(&line)?;
        Ok(self.index.insert(visit))
    }

    fn find_visits_by_courier(&self, courier_id: &CourierId) -> Result<Vec<Visit>, RepositoryError> {
        self.index.find_visits_by_courier(courier_id)
    }
}
