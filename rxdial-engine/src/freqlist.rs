//! Frequency bookmarks from a CSV table or an ODS spreadsheet.
//!
//! The header row must name a frequency column carrying its unit (`GHz`,
//! `MHz`, `kHz` or `Hz`, any case, anywhere in the name) and a `mode` column.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{Reader, open_workbook_auto};
use log::debug;
use rxdial_messages::{Hertz, Mode, TunerState};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FreqListError {
    #[error("cannot read frequency list {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("cannot open spreadsheet {0}: {1}")]
    Spreadsheet(PathBuf, #[source] calamine::Error),

    #[error("frequency list {source_name} is not correctly formatted: {reason}")]
    Malformed { source_name: String, reason: String },
}

/// Most specific unit first, so `MHz` is not taken for `Hz`.
const UNITS: [(&str, f64); 4] = [("ghz", 1e9), ("mhz", 1e6), ("khz", 1e3), ("hz", 1.0)];

/// Searched in this order when no list is configured.
const LIST_EXTENSIONS: [&str; 2] = ["ods", "csv"];

#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    /// The raw row, for display.
    pub fields: Vec<String>,
    pub frequency: Hertz,
    pub mode_label: String,
}

impl Bookmark {
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_label(&self.mode_label)
    }

    /// Tune to the bookmark. An unknown mode leaves the current one.
    pub fn apply(&self, state: &mut TunerState) {
        state.base_frequency = self.frequency;
        if let Some(mode) = self.mode() {
            state.mode = mode;
        }
    }
}

#[derive(Debug, Clone)]
pub struct FrequencyList {
    pub headers: Vec<String>,
    pub entries: Vec<Bookmark>,
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

impl FrequencyList {
    /// First `*.ods` in `dir`, else the first `*.csv`, by file name.
    pub fn detect(dir: &Path) -> Option<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        LIST_EXTENSIONS
            .iter()
            .find_map(|ext| files.iter().find(|path| has_extension(path, ext)).cloned())
    }

    /// Reads an ODS spreadsheet by extension, anything else as CSV.
    pub fn load(path: &Path) -> Result<Self, FreqListError> {
        if has_extension(path, "ods") {
            return Self::load_spreadsheet(path);
        }
        let text = fs::read_to_string(path).map_err(|e| FreqListError::Read(path.to_path_buf(), e))?;
        Self::parse(&text, &path.display().to_string())
    }

    /// The first sheet of a workbook.
    pub fn load_spreadsheet(path: &Path) -> Result<Self, FreqListError> {
        let source_name = path.display().to_string();
        let spreadsheet_err = |e: calamine::Error| FreqListError::Spreadsheet(path.to_path_buf(), e);

        let mut workbook = open_workbook_auto(path).map_err(spreadsheet_err)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| FreqListError::Malformed {
                source_name: source_name.clone(),
                reason: "no sheets".to_string(),
            })?
            .map_err(spreadsheet_err)?;

        let mut rows = range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect::<Vec<_>>());
        let headers = rows.next().unwrap_or_default();
        debug!("{source_name}: {} spreadsheet rows", range.height());
        Self::from_rows(headers, rows.map(Ok), &source_name)
    }

    pub fn parse(text: &str, source_name: &str) -> Result<Self, FreqListError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| malformed(source_name, e.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect::<Vec<_>>()));
        Self::from_rows(headers, rows, source_name)
    }

    fn from_rows<I>(headers: Vec<String>, rows: I, source_name: &str) -> Result<Self, FreqListError>
    where
        I: Iterator<Item = Result<Vec<String>, csv::Error>>,
    {
        if headers.iter().all(|h| h.is_empty()) {
            return Err(malformed(source_name, "empty file".to_string()));
        }

        let (freq_column, multiplier) = headers
            .iter()
            .enumerate()
            .find_map(|(n, name)| {
                let name = name.to_lowercase();
                UNITS
                    .iter()
                    .find(|(unit, _)| name.contains(unit))
                    .map(|&(_, mult)| (n, mult))
            })
            .ok_or_else(|| malformed(source_name, "no frequency column with a unit".to_string()))?;
        let mode_column = headers
            .iter()
            .position(|name| name.to_lowercase().contains("mode"))
            .ok_or_else(|| malformed(source_name, "no mode column".to_string()))?;

        let mut entries = Vec::new();
        let records = rows.filter(|row| !matches!(row, Ok(fields) if fields.iter().all(|f| f.is_empty())));
        for (row, fields) in records.enumerate() {
            let row = row + 1;
            let fields = fields.map_err(|e| malformed(source_name, format!("row {row}: {e}")))?;
            let (Some(freq), Some(mode)) = (fields.get(freq_column), fields.get(mode_column)) else {
                return Err(malformed(source_name, format!("row {row} is too short")));
            };
            let value: f64 = freq
                .parse()
                .map_err(|_| malformed(source_name, format!("row {row}: bad frequency {freq:?}")))?;
            if !value.is_finite() || value < 0.0 {
                return Err(malformed(source_name, format!("row {row}: bad frequency {freq:?}")));
            }
            entries.push(Bookmark {
                frequency: Hertz((value * multiplier).round() as u64),
                mode_label: mode.to_uppercase(),
                fields,
            });
        }

        Ok(Self { headers, entries })
    }

    /// First bookmark with a field matching `needle`, ignoring case.
    pub fn find(&self, needle: &str) -> Option<&Bookmark> {
        let needle = needle.to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.fields.iter().any(|f| f.to_lowercase() == needle))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn malformed(source_name: &str, reason: String) -> FreqListError {
    FreqListError::Malformed {
        source_name: source_name.to_string(),
        reason,
    }
}
