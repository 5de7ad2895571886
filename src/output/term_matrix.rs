//! Document-term frequency matrix export

use crate::storage::{DocumentRecord, Storage};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row per document, one column per term, zero-filled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermMatrix {
    terms: Vec<String>,
    rows: Vec<(u64, Vec<u32>)>,
}

impl TermMatrix {
    /// Builds the matrix; columns are the sorted union of all terms
    pub fn from_documents(documents: &[DocumentRecord]) -> Self {
        let terms: Vec<String> = documents
            .iter()
            .flat_map(|doc| doc.term_frequencies.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut rows: Vec<(u64, Vec<u32>)> = documents
            .iter()
            .map(|doc| {
                let counts = terms
                    .iter()
                    .map(|term| doc.term_frequencies.get(term).copied().unwrap_or(0))
                    .collect();
                (doc.id, counts)
            })
            .collect();
        rows.sort_by_key(|(id, _)| *id);

        Self { terms, rows }
    }

    pub fn from_storage(storage: &dyn Storage) -> crate::Result<Self> {
        Ok(Self::from_documents(&storage.all_documents()?))
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// `(document id, counts)` in document id order
    pub fn rows(&self) -> &[(u64, Vec<u32>)] {
        &self.rows
    }

    /// Writes the matrix as CSV with a `document_id,term...` header
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        write!(writer, "document_id")?;
        for term in &self.terms {
            write!(writer, ",{}", csv_field(term))?;
        }
        writeln!(writer)?;

        for (id, counts) in &self.rows {
            write!(writer, "{}", id)?;
            for count in counts {
                write!(writer, ",{}", count)?;
            }
            writeln!(writer)?;
        }

        writer.flush()
    }

    /// Writes the CSV to `path`, replacing any existing file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let file = File::create(path)?;
        self.write_csv(BufWriter::new(file))?;
        tracing::info!(
            "Wrote term matrix ({} documents x {} terms) to {}",
            self.rows.len(),
            self.terms.len(),
            path.display()
        );
        Ok(())
    }
}

/// Quotes a field if it contains a separator, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
