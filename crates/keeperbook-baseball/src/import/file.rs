// File-level import: read a season's CSV export, parse it, and hand the
// entries to the orchestrator. Batches keep going past a failed file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use keeperbook_core::config::SheetLayout;
use keeperbook_core::store::CanonicalStore;
use regex::Regex;
use serde::Serialize;
use tracing::{error, info, warn};

use super::orchestrator::{ImportSummary, Importer};
use super::sheet::{parse_sheet, SkipCounts};
use super::ImportError;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What happened to one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub year: i32,
    pub teams: Vec<String>,
    pub skipped: SkipCounts,
    pub summary: ImportSummary,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Imported(FileReport),
    Failed { path: PathBuf, error: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn imported(&self) -> impl Iterator<Item = &FileReport> {
        self.outcomes.iter().filter_map(|o| match o {
            FileOutcome::Imported(report) => Some(report),
            FileOutcome::Failed { .. } => None,
        })
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, FileOutcome::Failed { .. }))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{4}").expect("static regex is valid"))
}

/// The season is the first run of four digits in the file name, e.g.
/// `JuniorLeague2024.csv` or `2019 auction.csv`.
pub fn extract_year(path: &Path) -> Result<i32, ImportError> {
    let missing = || ImportError::MissingYear {
        path: path.display().to_string(),
    };
    let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(missing)?;
    let found = year_pattern().find(name).ok_or_else(missing)?;
    found.as_str().parse().map_err(|_| missing())
}

fn rows_from_reader<R: Read>(rdr: R) -> Result<Vec<Vec<String>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Read every row of a CSV file as raw cell strings. A leading UTF-8 byte
/// order mark is dropped.
pub fn read_sheet(path: &Path) -> Result<Vec<Vec<String>>, ImportError> {
    let bytes = std::fs::read(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);
    rows_from_reader(body).map_err(|e| ImportError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Importing
// ---------------------------------------------------------------------------

/// Import one file in a single unit of work.
pub fn import_file<S: CanonicalStore>(
    store: &mut S,
    importer: &Importer,
    layout: &SheetLayout,
    path: &Path,
) -> Result<FileReport, ImportError> {
    let year = extract_year(path)?;
    let rows = read_sheet(path)?;
    let parsed = parse_sheet(&rows, year, layout).map_err(|e| ImportError::Sheet {
        path: path.display().to_string(),
        source: e,
    })?;

    info!(
        year,
        teams = parsed.teams.len(),
        entries = parsed.entries.len(),
        skipped = parsed.skipped.total(),
        "parsed {}",
        path.display()
    );
    if parsed.entries.is_empty() {
        warn!("{} has team labels but no entries", path.display());
    }

    let summary = importer.import_entries(store, &parsed.entries, year)?;
    Ok(FileReport {
        path: path.to_path_buf(),
        year,
        teams: parsed.teams,
        skipped: parsed.skipped,
        summary,
    })
}

/// Import each file in order. A file that fails is logged and reported;
/// files already imported stay committed and the rest still run.
pub fn import_files<S, P>(
    store: &mut S,
    importer: &Importer,
    layout: &SheetLayout,
    paths: &[P],
) -> BatchReport
where
    S: CanonicalStore,
    P: AsRef<Path>,
{
    let mut report = BatchReport::default();
    for path in paths {
        let path = path.as_ref();
        match import_file(store, importer, layout, path) {
            Ok(file_report) => report.outcomes.push(FileOutcome::Imported(file_report)),
            Err(e) => {
                error!("import of {} failed: {}", path.display(), e);
                report.outcomes.push(FileOutcome::Failed {
                    path: path.to_path_buf(),
                    error: e.to_string(),
                });
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_from_file_name() {
        assert_eq!(extract_year(Path::new("data/JuniorLeague2024.csv")).unwrap(), 2024);
        assert_eq!(extract_year(Path::new("2019 auction.csv")).unwrap(), 2019);
    }

    #[test]
    fn year_ignores_directory_digits() {
        let err = extract_year(Path::new("/archive/2020/auction.csv")).unwrap_err();
        assert!(matches!(err, ImportError::MissingYear { .. }));
    }

    #[test]
    fn quoted_cells_and_ragged_rows() {
        let csv = "Position,Mudcats,\nC,\"Soto, Juan\",31\n1B\n";
        let rows = rows_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], "Soto, Juan");
        assert_eq!(rows[2], vec!["1B".to_string()]);
    }

    #[test]
    fn read_sheet_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("League2022.csv");
        std::fs::write(&path, b"\xEF\xBB\xBFPosition,Mudcats,\nPosition,Player,$\n").unwrap();

        let rows = read_sheet(&path).unwrap();
        assert_eq!(rows[0][0], "Position");
    }

    #[test]
    fn read_sheet_missing_file_is_io_error() {
        let err = read_sheet(Path::new("/definitely/not/here2024.csv")).unwrap_err();
        assert!(matches!(err, ImportError::Io { .. }));
    }
}
