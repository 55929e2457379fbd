use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use log::info;
use std::{
    fs::OpenOptions,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

use crate::switch::Output;

/// CSV record of every output switch: `timestamp,output`, where the
/// timestamp is in Unix nanoseconds.
pub struct Journal {
    writer: Writer<std::fs::File>,
}

impl Journal {
    /// Opens `path` for appending. The header is written only to a new file.
    pub fn open(path: &Path) -> Result<Self> {
        let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open switch journal {}", path.display()))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            writer.write_record(["timestamp", "output"])?;
            writer.flush()?;
        }

        info!("Recording switches to {}", path.display());
        Ok(Self { writer })
    }

    pub fn record(&mut self, output: Output) -> Result<()> {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        self.writer
            .write_record(&[timestamp.to_string(), output.to_string()])?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_records_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switches.csv");

        {
            let mut journal = Journal::open(&path).unwrap();
            journal.record(Output::Camera).unwrap();
        }
        {
            let mut journal = Journal::open(&path).unwrap();
            journal.record(Output::Animation).unwrap();
        }

        let mut reader = csv::Reader::from_path(&path).unwrap();
        assert_eq!(
            reader.headers().unwrap().iter().collect::<Vec<_>>(),
            vec!["timestamp", "output"]
        );

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "camera");
        assert_eq!(&rows[1][1], "animation");
        assert!(rows[0][0].parse::<u128>().is_ok());
    }
}
