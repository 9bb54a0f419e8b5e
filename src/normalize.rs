//! Strip Spanish accents and the leading zeros of two well-known codes from text files.
use crate::config::Encoding;
use crate::table::{self, Table};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Literal replacements applied after character substitution, anywhere in the text.
pub const LITERALS: &[(&str, &str)] = &[(";033;", ";33;"), (";011001;", ";11001;")];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Table(#[from] table::Error),
    #[error(transparent)]
    Discover(#[from] crate::discover::Error),
}

/// How a file is split into the pieces of text that are normalized.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Parse the file as delimited table and normalize each data cell. The header stays as is.
    #[default]
    Cells,
    /// Normalize each raw line, delimiters included.
    Lines,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub mode: Mode,
    pub delimiter: u8,
    pub encodings: Vec<Encoding>,
}

/// Files that were processed, and those that failed along with the reason.
#[derive(Debug, Default)]
pub struct Outcome {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, table::Error)>,
}

fn unaccent(c: char) -> Option<char> {
    Some(match c {
        'á' => 'a',
        'é' => 'e',
        'í' => 'i',
        'ó' => 'o',
        'ú' => 'u',
        'Á' => 'A',
        'É' => 'E',
        'Í' => 'I',
        'Ó' => 'O',
        'Ú' => 'U',
        'ñ' => 'n',
        'Ñ' => 'N',
        _ => return None,
    })
}

/// Replace accented vowels and `ñ`/`Ñ` by their plain counterparts, then apply [`LITERALS`] until
/// none of them is left. Other characters are kept.
pub fn normalize(text: &str) -> Cow<'_, str> {
    let needs_work = text.chars().any(|c| unaccent(c).is_some())
        || LITERALS.iter().any(|(from, _)| text.contains(from));
    if !needs_work {
        return Cow::Borrowed(text);
    }
    let mut out: String = text.chars().map(|c| unaccent(c).unwrap_or(c)).collect();
    for (from, to) in LITERALS {
        // Adjacent codes share their delimiter, so a single pass would leave every other one.
        while out.contains(from) {
            out = out.replace(from, to);
        }
    }
    Cow::Owned(out)
}

/// Normalize every data cell of `table`, returning the amount of cells that changed.
pub fn normalize_table(table: &mut Table) -> usize {
    let mut changed = 0;
    for record in &mut table.rows {
        if !record.iter().any(|field| matches!(normalize(field), Cow::Owned(_))) {
            continue;
        }
        let position = record.position().cloned();
        let mut rewritten = csv::StringRecord::with_capacity(record.as_slice().len(), record.len());
        for field in record.iter() {
            let normalized = normalize(field);
            changed += usize::from(normalized != field);
            rewritten.push_field(&normalized);
        }
        rewritten.set_position(position);
        *record = rewritten;
    }
    changed
}

/// Normalize each line of `text`, keeping line endings. Returns the text and the amount of lines that changed.
pub fn normalize_lines(text: &str) -> (String, usize) {
    let mut out = String::with_capacity(text.len());
    let mut changed = 0;
    for line in text.split_inclusive('\n') {
        let normalized = normalize(line);
        changed += usize::from(normalized != line);
        out.push_str(&normalized);
    }
    (out, changed)
}

/// Normalize the file at `input` and write it as UTF-8 to `output`. Returns the amount of cells or
/// lines that changed.
pub fn normalize_file(input: &Path, output: &Path, opts: &Options) -> Result<usize, table::Error> {
    match opts.mode {
        Mode::Cells => {
            let mut table = Table::load(input, opts.delimiter, &opts.encodings)?;
            let changed = normalize_table(&mut table);
            table.save(output, opts.delimiter)?;
            Ok(changed)
        }
        Mode::Lines => {
            let bytes = std::fs::read(input).map_err(|source| table::Error::Read {
                path: input.to_owned(),
                source,
            })?;
            let decoded = crate::encoding::decode(&bytes, &opts.encodings).ok_or_else(|| {
                table::Error::Encoding {
                    path: input.to_owned(),
                    tried: opts.encodings.clone(),
                }
            })?;
            tracing::info!(path = %input.display(), encoding = ?decoded.encoding, "loaded file");
            let (text, changed) = normalize_lines(&decoded.text);
            let into_error = |source| table::Error::Write {
                path: output.to_owned(),
                source,
            };
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent).map_err(into_error)?;
            }
            std::fs::write(output, text).map_err(into_error)?;
            tracing::info!(path = %output.display(), "saved file");
            Ok(changed)
        }
    }
}

/// Normalize every `.csv` file in `data_dir` into a file of the same name in `output_dir`.
/// A file that fails doesn't stop the others.
pub fn normalize_dir(data_dir: &Path, output_dir: &Path, opts: &Options) -> Result<Outcome, Error> {
    let mut outcome = Outcome::default();
    let names = crate::discover::list_files(data_dir)?;
    let csv_files: Vec<_> = names
        .iter()
        .filter(|name| {
            Path::new(name)
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"))
        })
        .collect();
    if csv_files.is_empty() {
        tracing::warn!(dir = %data_dir.display(), "no CSV files to normalize");
        return Ok(outcome);
    }
    for name in csv_files {
        let input = data_dir.join(name);
        let output = output_dir.join(name);
        match normalize_file(&input, &output, opts) {
            Ok(changed) => {
                tracing::info!(file = %name, changed, "normalized");
                outcome.written.push(output);
            }
            Err(err) => {
                tracing::error!(file = %name, "{err}");
                outcome.failed.push((input, err));
            }
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_text_is_borrowed() {
        assert!(matches!(normalize("plain;33;text"), Cow::Borrowed(_)));
        assert!(matches!(normalize(""), Cow::Borrowed(_)));
    }

    #[test]
    fn lines_keep_their_endings() {
        let (text, changed) = normalize_lines("a;b\r\nJosé;033\nÑ");
        assert_eq!(text, "a;b\r\nJose;033\nN");
        assert_eq!(changed, 2);
    }
}
