//! Bet record source.
//!
//! Reads the agency's record file line by line and yields raw field rows.
//! Arity is not judged here — the batch builder decides what a well-formed
//! record is; this layer only splits lines into fields.

use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::error::{ClientError, Result};

/// Separator between fields inside the record file.
const RECORD_SEPARATOR: char = ',';

/// An open record file, consumed front to back. The file handle is released
/// on drop.
pub struct BetFile {
    lines: Lines<BufReader<File>>,
    rows: u64,
}

impl BetFile {
    /// Open the record file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Source`] when the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).await.map_err(ClientError::Source)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            rows: 0,
        })
    }

    /// Read the next raw record, `None` once the file is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Source`] on a read failure; the session treats
    /// that as terminal before any further batch is sent.
    pub async fn next_record(&mut self) -> Result<Option<Vec<String>>> {
        match self.lines.next_line().await.map_err(ClientError::Source)? {
            Some(line) => {
                self.rows += 1;
                let fields = line
                    .split(RECORD_SEPARATOR)
                    .map(|field| field.trim().to_string())
                    .collect();
                Ok(Some(fields))
            }
            None => Ok(None),
        }
    }

    /// Rows read so far.
    #[inline]
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    /// Write a scratch record file under the system temp dir.
    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "betstream-{}-{}-{}.csv",
            std::process::id(),
            name,
            nanos
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_rows_in_order() {
        let path = scratch_file(
            "order",
            "Santiago,Lorca,30904465,1999-03-17,7574\nAna,Paz,24242424,2000-01-01,2\n",
        );

        let mut source = BetFile::open(&path).await.unwrap();

        let first = source.next_record().await.unwrap().unwrap();
        assert_eq!(first[0], "Santiago");
        assert_eq!(first.len(), 5);

        let second = source.next_record().await.unwrap().unwrap();
        assert_eq!(second[0], "Ana");

        assert!(source.next_record().await.unwrap().is_none());
        assert_eq!(source.rows(), 2);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_fields_are_trimmed() {
        let path = scratch_file("trim", " Santiago , Lorca ,30904465,1999-03-17, 7574 \n");

        let mut source = BetFile::open(&path).await.unwrap();
        let row = source.next_record().await.unwrap().unwrap();
        assert_eq!(row, vec!["Santiago", "Lorca", "30904465", "1999-03-17", "7574"]);

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_source_error() {
        let result = BetFile::open(Path::new("/definitely/not/here.csv")).await;
        assert!(matches!(result, Err(ClientError::Source(_))));
    }
}
