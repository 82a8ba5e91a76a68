use std::collections::HashSet;
use std::time::Instant;

use docport_api::{DocumentReader, DocumentWriter, Error, Record, Result};
use tracing::{debug, info};

/// Statistics for one migration run.
#[derive(Debug, Clone)]
pub struct MigrateStats {
    pub documents: usize,
    pub design_documents: usize,
    pub duration_secs: f64,
}

impl MigrateStats {
    pub fn total(&self) -> usize {
        self.documents + self.design_documents
    }
}

/// Copies every record from `reader` to `writer`.
///
/// Stops at the first error, leaving whatever the writer already received
/// behind. The driver itself only rejects empty and repeated ids; all
/// other failures come from the endpoints.
pub fn migrate<R, W>(reader: R, writer: W) -> Result<MigrateStats>
where
    R: DocumentReader,
    W: DocumentWriter,
{
    migrate_with_progress(reader, writer, |_| {})
}

/// Like [`migrate`], invoking `progress` after each record is written.
pub fn migrate_with_progress<R, W, F>(
    mut reader: R,
    mut writer: W,
    mut progress: F,
) -> Result<MigrateStats>
where
    R: DocumentReader,
    W: DocumentWriter,
    F: FnMut(&Record),
{
    let start_time = Instant::now();
    let mut seen = HashSet::new();
    let mut documents = 0usize;
    let mut design_documents = 0usize;

    while let Some(record) = reader.next_record()? {
        if record.id.is_empty() {
            return Err(Error::EmptyDocId);
        }
        if !seen.insert(record.id.clone()) {
            return Err(Error::DuplicateDocId(record.id));
        }
        writer.write(&record)?;
        if record.is_design() {
            design_documents += 1;
        } else {
            documents += 1;
        }
        debug!(id = %record.id, "copied document");
        progress(&record);
    }
    writer.finish()?;

    let stats = MigrateStats {
        documents,
        design_documents,
        duration_secs: start_time.elapsed().as_secs_f64(),
    };
    info!(
        documents = stats.documents,
        design_documents = stats.design_documents,
        "migration complete"
    );
    Ok(stats)
}
