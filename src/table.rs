//! Delimited files held fully in memory as a header line and string rows.
use crate::config::Encoding;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not read from file at '{}'", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("None of the encodings {tried:?} could decode the file at '{}'", path.display())]
    Encoding { path: PathBuf, tried: Vec<Encoding> },
    #[error("Could not parse '{name}' as delimited file")]
    Csv { name: String, source: csv::Error },
    #[error("Line {line} of '{name}' has {found} fields, but the header only has {expected}")]
    TooManyFields {
        name: String,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("The first line of '{name}' lacks the required column(s) {}", columns.join(", "))]
    MissingColumns { name: String, columns: Vec<String> },
    #[error("Could not write to file at '{}'", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// The file name the table was read from, for use in messages.
    pub name: String,
    pub headers: csv::StringRecord,
    pub rows: Vec<csv::StringRecord>,
}

impl Table {
    /// Parse `text` with `delimiter`, with the first line being the header.
    /// Rows shorter than the header are padded with empty cells, longer rows are an error.
    pub fn parse(name: impl Into<String>, text: &str, delimiter: u8) -> Result<Self, Error> {
        let name = name.into();
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());
        let into_error = |source| Error::Csv {
            name: name.clone(),
            source,
        };
        let headers = csv.headers().map_err(into_error)?.clone();
        let mut rows = Vec::new();
        for record in csv.into_records() {
            let mut record = record.map_err(into_error)?;
            if record.len() > headers.len() {
                return Err(Error::TooManyFields {
                    line: record.position().map_or(rows.len() as u64 + 2, |pos| pos.line()),
                    name: name.clone(),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            while record.len() < headers.len() {
                record.push_field("");
            }
            rows.push(record);
        }
        Ok(Table {
            name,
            headers,
            rows,
        })
    }

    /// Read the file at `path`, decode it with the first of `encodings` that works and parse it.
    pub fn load(path: &Path, delimiter: u8, encodings: &[Encoding]) -> Result<Self, Error> {
        tracing::info!(path = %path.display(), "loading file");
        let bytes = std::fs::read(path).map_err(|source| Error::Read {
            path: path.to_owned(),
            source,
        })?;
        let decoded =
            crate::encoding::decode(&bytes, encodings).ok_or_else(|| Error::Encoding {
                path: path.to_owned(),
                tried: encodings.to_vec(),
            })?;
        let table = Table::parse(file_name(path), &decoded.text, delimiter)?;
        tracing::info!(
            encoding = ?decoded.encoding,
            rows = table.rows.len(),
            columns = table.headers.len(),
            "loaded '{}'",
            table.name
        );
        Ok(table)
    }

    /// Return the index of each of `names`, or an error naming every column that couldn't be found.
    pub fn columns(&self, names: &[&str]) -> Result<Vec<usize>, Error> {
        let mut found = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.headers.iter().position(|header| header.trim() == *name) {
                Some(idx) => found.push(idx),
                None => missing.push(name.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::MissingColumns {
                name: self.name.clone(),
                columns: missing,
            });
        }
        Ok(found)
    }

    /// The 1-based line number of the row at `row`, for use in messages.
    pub fn line(&self, row: usize) -> u64 {
        self.rows
            .get(row)
            .and_then(|record| record.position())
            .map(|pos| pos.line())
            .unwrap_or(row as u64 + 2)
    }

    /// Replace the cell at `column` of the row at `row` with `value`.
    pub fn set(&mut self, row: usize, column: usize, value: &str) {
        if let Some(record) = self.rows.get_mut(row) {
            let position = record.position().cloned();
            let mut rewritten: csv::StringRecord = record
                .iter()
                .enumerate()
                .map(|(idx, field)| if idx == column { value } else { field })
                .collect();
            rewritten.set_position(position);
            *record = rewritten;
        }
    }

    pub fn write(&self, out: impl std::io::Write, delimiter: u8) -> Result<(), csv::Error> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(out);
        out.write_record(&self.headers)?;
        for record in &self.rows {
            out.write_record(record)?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write the table as UTF-8 to `path`, creating its parent directory if needed.
    pub fn save(&self, path: &Path, delimiter: u8) -> Result<(), Error> {
        let into_error = |source| Error::Write {
            path: path.to_owned(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(into_error)?;
        }
        let file = std::fs::File::create(path).map_err(into_error)?;
        self.write(std::io::BufWriter::new(file), delimiter)
            .map_err(|err| into_error(err.into()))?;
        tracing::info!(path = %path.display(), "saved file");
        Ok(())
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
