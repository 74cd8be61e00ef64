use crate::domain::ports::ResultSink;
use crate::utils::error::{PigeonError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

pub const VALID_HEADER: [&str; 1] = ["Domain"];
pub const INVALID_HEADER: [&str; 2] = ["Domain", "Error"];

/// Append-only CSV file. The header is written only when the file is empty
/// at open time, so re-running against existing output keeps appending.
pub struct CsvAppendSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvAppendSink {
    pub fn open<P: AsRef<Path>>(path: P, header: &[&str]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let init_error = |source: std::io::Error| PigeonError::SinkInitError {
            path: path.display().to_string(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(init_error)?;
        let is_empty = file.metadata().map_err(init_error)?.len() == 0;

        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        if is_empty {
            writer
                .write_record(header)
                .map_err(|e| init_error(e.into()))?;
            writer.flush().map_err(init_error)?;
            tracing::debug!("Initialised {} with header {:?}", path.display(), header);
        }

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvAppendSink {
    fn append(&mut self, record: &[&str]) -> Result<()> {
        self.writer.write_record(record)?;
        // 逐筆 flush，中途中斷也不會遺失已處理結果
        self.writer.flush()?;
        Ok(())
    }
}
