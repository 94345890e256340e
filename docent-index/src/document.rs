//! Reading source documents from the corpus directory

use std::path::Path;
use tracing::debug;

use crate::errors::{IndexError, IndexResult};

/// Extensions the reader can load as text.
///
/// The corpus convention pairs tabular and plain-text sources with a PDF
/// rendering of the same base name; the PDFs are display artifacts and are
/// not indexed.
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "csv"];

/// A source document loaded from the corpus directory
#[derive(Debug, Clone)]
pub struct Document {
    /// File name the document was loaded from (citation identity)
    pub file_name: String,
    /// Full text content
    pub text: String,
}

/// Read every indexable document under `dir`.
///
/// Fails when the directory is unreadable or when no document yields any
/// text; both are fatal for the session that attempted the load.
pub fn read_documents(dir: impl AsRef<Path>) -> IndexResult<Vec<Document>> {
    let dir = dir.as_ref();
    let mut documents = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let is_text = extension
            .as_deref()
            .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext));
        if !is_text {
            debug!("Skipping non-text corpus file: {}", file_name);
            continue;
        }

        let text = std::fs::read_to_string(&path)?;
        if text.trim().is_empty() {
            debug!("Skipping empty corpus file: {}", file_name);
            continue;
        }

        documents.push(Document {
            file_name: file_name.to_string(),
            text,
        });
    }

    if documents.is_empty() {
        return Err(IndexError::EmptyCorpus(format!(
            "no indexable documents under {}",
            dir.display()
        )));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_reads_text_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("paper.txt"), "Archives and AI").unwrap();
        std::fs::write(dir.path().join("table.csv"), "year,count\n2020,5").unwrap();
        std::fs::write(dir.path().join("paper.pdf"), [0x25, 0x50, 0x44, 0x46]).unwrap();

        let mut documents = read_documents(dir.path()).unwrap();
        documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        assert_eq!(documents.len(), 2);
        assert_eq!(documents[0].file_name, "paper.txt");
        assert_eq!(documents[1].file_name, "table.csv");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = read_documents(dir.path()).unwrap_err();
        assert!(matches!(err, IndexError::EmptyCorpus(_)));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let err = read_documents(&missing).unwrap_err();
        assert!(matches!(err, IndexError::Io(_)));
    }

    #[test]
    fn test_blank_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("blank.txt"), "   \n").unwrap();
        std::fs::write(dir.path().join("real.md"), "# Survey").unwrap();

        let documents = read_documents(dir.path()).unwrap();
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0].file_name, "real.md");
    }
}
