// Wide-format auction sheet parsing.
//
// A sheet has one team label per team in row 0, sub-header rows below it,
// then one row per roster slot: the position in column 0 followed by a
// (player, salary) cell pair for every team.

use keeperbook_core::config::SheetLayout;
use keeperbook_core::model::RawAuctionEntry;
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SheetError {
    #[error("sheet has no rows")]
    Empty,

    #[error("no team labels found in the first row")]
    NoTeamLabels,
}

/// Entries dropped while walking the data rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    /// Player or salary cell blank (or past the end of a short row).
    pub blank_cells: usize,
    /// Salary cell present but not a non-negative integer.
    pub invalid_salary: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.blank_cells + self.invalid_salary
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSheet {
    /// Team labels in column order.
    pub teams: Vec<String>,
    pub entries: Vec<RawAuctionEntry>,
    pub skipped: SkipCounts,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

struct TeamColumns {
    label: String,
    player: usize,
    salary: usize,
}

fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|c| c.trim()).unwrap_or("")
}

fn discover_teams(header: &[String], layout: &SheetLayout) -> Vec<TeamColumns> {
    header
        .iter()
        .enumerate()
        .filter_map(|(column, raw)| {
            let label = raw.trim();
            if label.is_empty()
                || layout
                    .ignored_tokens
                    .iter()
                    .any(|token| token.trim().eq_ignore_ascii_case(label))
            {
                return None;
            }
            let player = column + layout.player_offset;
            Some(TeamColumns {
                label: label.to_string(),
                player,
                salary: player + layout.salary_offset,
            })
        })
        .collect()
}

/// Parse one season's sheet into raw entries.
///
/// Data rows start after `layout.header_rows` and end at the first wholly
/// blank row or the first row whose first cell contains the sentinel.
/// Blank cells and unparseable salaries are counted in `skipped`; short rows
/// simply yield fewer entries.
pub fn parse_sheet(
    rows: &[Vec<String>],
    year: i32,
    layout: &SheetLayout,
) -> Result<ParsedSheet, SheetError> {
    let header = rows.first().ok_or(SheetError::Empty)?;
    let teams = discover_teams(header, layout);
    if teams.is_empty() {
        return Err(SheetError::NoTeamLabels);
    }

    let sentinel = layout.sentinel.to_lowercase();
    let mut entries = Vec::new();
    let mut skipped = SkipCounts::default();

    for (row_index, row) in rows.iter().enumerate().skip(layout.header_rows) {
        if row.iter().all(|c| is_blank(c)) {
            break;
        }
        let position = cell(row, 0);
        if position.to_lowercase().contains(&sentinel) {
            break;
        }

        for team in &teams {
            let player = cell(row, team.player);
            let salary = cell(row, team.salary);
            if player.is_empty() || salary.is_empty() {
                skipped.blank_cells += 1;
                continue;
            }
            let Ok(salary) = salary.parse::<u32>() else {
                debug!(
                    row = row_index,
                    team = %team.label,
                    "skipping '{}': salary '{}' is not a non-negative integer",
                    player,
                    salary
                );
                skipped.invalid_salary += 1;
                continue;
            };
            entries.push(RawAuctionEntry {
                year,
                team_label: team.label.clone(),
                position: position.to_string(),
                player_label: player.to_string(),
                salary,
            });
        }
    }

    Ok(ParsedSheet {
        teams: teams.into_iter().map(|t| t.label).collect(),
        entries,
        skipped,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
