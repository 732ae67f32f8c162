use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use ignore::WalkBuilder;
use log::info;

use crate::error::StatsError;

/// File name of the training log written in every run directory
pub const LOG_FILE: &str = "log.csv";

const CLEAN_SUFFIX: &str = "-clean";

/// A training log loaded column by column, missing cells as `NaN`
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingLog {
    path: PathBuf,
    headers: Vec<String>,
    columns: Vec<Vec<f64>>,
}

fn parse_cell(cell: &str, path: &Path) -> Result<f64, StatsError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse().map_err(|_| StatsError::Parse {
        value: cell.to_owned(),
        path: path.to_owned(),
    })
}

impl TrainingLog {
    /// Load a CSV log
    ///
    /// **Errors** if the file has no `frames` column
    pub fn read(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let mut columns = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (column, cell) in columns.iter_mut().zip(record.iter()) {
                column.push(parse_cell(cell, path)?);
            }
        }

        let log = Self {
            path: path.to_owned(),
            headers,
            columns,
        };
        log.frames()?;
        Ok(log)
    }

    /// Save the log as CSV, `NaN` cells left empty
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), StatsError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in 0..self.len() {
            writer.write_record(self.columns.iter().map(|column| {
                let value = column[row];
                if value.is_nan() {
                    String::new()
                } else {
                    value.to_string()
                }
            }))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Replace every missing return by the last recorded one, 0 before the first
    pub fn clean(&mut self) {
        for (header, column) in self.headers.iter().zip(self.columns.iter_mut()) {
            if !header.starts_with("return/") {
                continue;
            }
            let mut prev = 0.0;
            for value in column.iter_mut() {
                if value.is_nan() {
                    *value = prev;
                } else {
                    prev = *value;
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.headers
            .iter()
            .position(|header| header == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn frames(&self) -> Result<&[f64], StatsError> {
        self.column("frames")
            .ok_or_else(|| StatsError::MissingColumn {
                column: String::from("frames"),
                path: self.path.clone(),
            })
    }

    /// Columns whose name starts with `prefix`, paired with the rest of their name
    pub fn columns_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a [f64])> + 'a {
        self.headers
            .iter()
            .zip(&self.columns)
            .filter_map(move |(header, column)| {
                header
                    .strip_prefix(prefix)
                    .map(|suffix| (suffix, column.as_slice()))
            })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep the first `len` rows
    pub fn truncate(&mut self, len: usize) {
        for column in self.columns.iter_mut() {
            column.truncate(len);
        }
    }
}

fn clean_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(CLEAN_SUFFIX);
    PathBuf::from(name)
}

/// Every `log.csv` under `dir`, in lexicographic path order
///
/// Hidden entries are skipped and symbolic links are not followed.
pub fn find_logs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, StatsError> {
    let walker = WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .build();

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry?;
        let is_file = entry.file_type().is_some_and(|ty| ty.is_file());
        if is_file && entry.file_name() == LOG_FILE {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

/// Load every training log under `model_dir` and align them
///
/// Each log is cleaned with [`TrainingLog::clean`] and cached next to the original as
/// `log.csv-clean`; an existing cache is read instead. All logs are then cut to the length
/// of the shortest one and, given `max_frame`, before the first row whose frame count exceeds
/// it.
///
/// **Errors** if no log is found or if alignment leaves no row
pub fn load_and_clean_logs(
    model_dir: impl AsRef<Path>,
    max_frame: Option<f64>,
) -> Result<Vec<TrainingLog>, StatsError> {
    let model_dir = model_dir.as_ref();
    let paths = if model_dir.is_dir() {
        find_logs(model_dir)?
    } else {
        Vec::new()
    };
    if paths.is_empty() {
        return Err(StatsError::NoLogs(model_dir.to_owned()));
    }

    let mut logs = Vec::with_capacity(paths.len());
    for path in paths {
        let cached = clean_path(&path);
        let log = if cached.exists() {
            TrainingLog::read(&cached)?
        } else {
            let mut log = TrainingLog::read(&path)?;
            log.clean();
            log.write(&cached)?;
            log
        };
        info!("{} loaded and cleaned.", path.display());
        logs.push(log);
    }

    let mut length = usize::MAX;
    for log in logs.iter() {
        length = length.min(log.len());
        if let Some(max_frame) = max_frame {
            if let Some(cut) = log.frames()?.iter().position(|&f| f > max_frame) {
                length = length.min(cut);
            }
        }
    }
    if length == 0 {
        return Err(StatsError::EmptyAlignment);
    }
    for log in logs.iter_mut() {
        log.truncate(length);
    }

    Ok(logs)
}
