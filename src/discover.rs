//! Find the input files of a date by their naming patterns, and check that their date stamps agree.
use crate::date::Stamp;
use std::path::{Path, PathBuf};
use time::Date;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not list the directory at '{}'", dir.display())]
    ListDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    #[error("Required {kind} file '{pattern}' could not be found in '{}'", dir.display())]
    MissingFile {
        kind: FileKind,
        pattern: String,
        dir: PathBuf,
    },
    #[error("Expected a date stamp of the form {expected} in file name '{file}'")]
    DateStamp {
        file: String,
        expected: &'static str,
    },
    #[error("'{value}' is not a date of the form YYYYMMDD")]
    InvalidDate { value: String },
    #[error("The {kind} file '{file}' is dated {other}, but the flows file is dated {flows}")]
    DateMismatch {
        kind: FileKind,
        file: String,
        flows: Date,
        other: Date,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Flows,
    Estimates,
    Report,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FileKind::Flows => "flows",
            FileKind::Estimates => "estimates",
            FileKind::Report => "report",
        })
    }
}

impl FileKind {
    pub fn prefix(self) -> &'static str {
        match self {
            FileKind::Flows => "flujos_swap_gbo_",
            FileKind::Estimates => "COL_ESTIM_FLOWS_",
            FileKind::Report => "Informe_R5_GBO_",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            FileKind::Flows | FileKind::Report => ".csv",
            FileKind::Estimates => ".dat",
        }
    }

    pub fn stamp(self) -> Stamp {
        match self {
            FileKind::Flows => Stamp::YearMonthDay,
            FileKind::Estimates => Stamp::DayMonthYear,
            FileKind::Report => Stamp::ShortYearMonthDay,
        }
    }

    /// The canonical file name of this kind for `date`.
    pub fn file_name(self, date: Date) -> String {
        format!("{}{}{}", self.prefix(), self.stamp().format(date), self.extension())
    }

    /// The name of the processed file of this kind for `date`.
    pub fn output_name(self, date: Date) -> String {
        format!(
            "{}{}_procesado{}",
            self.prefix(),
            self.stamp().format(date),
            self.extension()
        )
    }

    /// Return true if `name` has the prefix and extension of this kind.
    pub fn matches(self, name: &str) -> bool {
        name.len() >= self.prefix().len() + self.extension().len()
            && name.starts_with(self.prefix())
            && name.ends_with(self.extension())
    }

    /// Parse the date stamped into `name` right after the prefix.
    pub fn date_of(self, name: &str) -> Result<Date, Error> {
        let stamp = self.stamp();
        self.matches(name)
            .then(|| &name[self.prefix().len()..name.len() - self.extension().len()])
            .and_then(|middle| middle.get(..stamp.len()))
            .and_then(|digits| stamp.parse(digits))
            .ok_or_else(|| Error::DateStamp {
                file: name.to_owned(),
                expected: stamp.pattern(),
            })
    }
}

/// Parse a reference date as given on the command line.
pub fn parse_reference_date(value: &str) -> Result<Date, Error> {
    Stamp::YearMonthDay
        .parse(value.trim())
        .ok_or_else(|| Error::InvalidDate {
            value: value.to_owned(),
        })
}

/// The files to reconcile for one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs {
    pub date: Date,
    pub flows: PathBuf,
    pub estimates: PathBuf,
    pub report: Option<PathBuf>,
}

impl Inputs {
    /// Use the given files, whose names must carry date stamps for the same day.
    pub fn from_paths(
        flows: PathBuf,
        estimates: PathBuf,
        report: Option<PathBuf>,
    ) -> Result<Self, Error> {
        let date = FileKind::Flows.date_of(&crate::table::file_name(&flows))?;
        for (kind, path) in [
            (FileKind::Estimates, Some(&estimates)),
            (FileKind::Report, report.as_ref()),
        ] {
            let Some(path) = path else { continue };
            let file = crate::table::file_name(path);
            let other = kind.date_of(&file)?;
            if other != date {
                return Err(Error::DateMismatch {
                    kind,
                    file,
                    flows: date,
                    other,
                });
            }
        }
        Ok(Inputs {
            date,
            flows,
            estimates,
            report,
        })
    }
}

/// The names of all files in `dir`, sorted.
pub fn list_files(dir: &Path) -> Result<Vec<String>, Error> {
    let into_error = |source| Error::ListDir {
        dir: dir.to_owned(),
        source,
    };
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(into_error)? {
        let entry = entry.map_err(into_error)?;
        if entry.file_type().map_err(into_error)?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

/// Find the file of `kind` for `date` among `names`, using the first one if there are many.
fn locate(dir: &Path, names: &[String], kind: FileKind, date: Date) -> Option<PathBuf> {
    let stem = format!("{}{}", kind.prefix(), kind.stamp().format(date));
    let mut candidates = names
        .iter()
        .filter(|name| name.starts_with(&stem) && kind.matches(name));
    let first = candidates.next()?;
    let others: Vec<_> = candidates.collect();
    if !others.is_empty() {
        tracing::warn!(
            "{} {kind} files match '{}', using '{first}' and ignoring {others:?}",
            others.len() + 1,
            kind.file_name(date),
        );
    }
    Some(dir.join(first))
}

fn inputs_for(dir: &Path, names: &[String], date: Date) -> Result<Inputs, Error> {
    let required = |kind: FileKind| {
        locate(dir, names, kind, date).ok_or_else(|| Error::MissingFile {
            kind,
            pattern: kind.file_name(date),
            dir: dir.to_owned(),
        })
    };
    let inputs = Inputs {
        date,
        flows: required(FileKind::Flows)?,
        estimates: required(FileKind::Estimates)?,
        report: locate(dir, names, FileKind::Report, date),
    };
    if inputs.report.is_none() {
        tracing::warn!(
            "no {} file '{}' in '{}'",
            FileKind::Report,
            FileKind::Report.file_name(date),
            dir.display()
        );
    }
    Ok(inputs)
}

/// Locate the input files for `date` in `dir`. The report file is optional.
pub fn for_date(dir: &Path, date: Date) -> Result<Inputs, Error> {
    inputs_for(dir, &list_files(dir)?, date)
}

/// Locate the input files of every date for which `dir` holds a flows file, in date order.
/// Each date yields its own result so one incomplete set doesn't hide the others.
pub fn all(dir: &Path) -> Result<Vec<Result<Inputs, Error>>, Error> {
    let names = list_files(dir)?;
    let mut dates = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for name in names.iter().filter(|name| FileKind::Flows.matches(name)) {
        match FileKind::Flows.date_of(name) {
            Ok(date) => {
                dates.insert(date);
            }
            Err(err) => out.push(Err(err)),
        }
    }
    out.extend(dates.into_iter().map(|date| inputs_for(dir, &names, date)));
    Ok(out)
}
