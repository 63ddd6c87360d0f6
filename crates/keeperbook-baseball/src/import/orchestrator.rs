// Per-file import: resolve each raw entry and write observations through a
// canonical store inside one unit of work.

use std::collections::HashMap;

use keeperbook_core::config::ImportConfig;
use keeperbook_core::model::{
    AmbiguityRecord, CanonicalPlayer, CanonicalTeam, HistoricalObservation, NewPlayer,
    ObservationWrite, RawAuctionEntry, PLACEHOLDER_OWNER, UNKNOWN_MLB_TEAM,
};
use keeperbook_core::store::CanonicalStore;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::names::normalize;
use super::resolver::{Resolution, Resolver};
use super::ImportError;

/// Outcome counts for one file's entries, plus the entries held back as
/// ambiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub year: i32,
    pub created_player_count: usize,
    pub matched_player_count: usize,
    pub created_observation_count: usize,
    pub updated_observation_count: usize,
    pub created_team_count: usize,
    /// Entries whose player label normalized to nothing.
    pub unnamed_count: usize,
    pub ambiguous: Vec<AmbiguityRecord>,
}

impl ImportSummary {
    fn new(year: i32) -> Self {
        Self {
            year,
            ..Self::default()
        }
    }
}

pub struct Importer {
    resolver: Resolver,
    contract_type: String,
}

impl Importer {
    pub fn new(resolver: Resolver, contract_type: impl Into<String>) -> Self {
        Self {
            resolver,
            contract_type: contract_type.into(),
        }
    }

    pub fn from_config(config: &ImportConfig) -> Self {
        Self::new(
            Resolver::from_kind(config.matcher),
            config.default_contract_type.clone(),
        )
    }

    /// Apply one file's entries to `store`. Either every write lands or, on
    /// error, none of them do.
    pub fn import_entries<S: CanonicalStore>(
        &self,
        store: &mut S,
        entries: &[RawAuctionEntry],
        year: i32,
    ) -> Result<ImportSummary, ImportError> {
        let summary = store.atomically(|store| self.apply(store, entries, year))?;
        info!(
            year,
            created_players = summary.created_player_count,
            matched_players = summary.matched_player_count,
            created_observations = summary.created_observation_count,
            updated_observations = summary.updated_observation_count,
            created_teams = summary.created_team_count,
            ambiguous = summary.ambiguous.len(),
            "import committed"
        );
        Ok(summary)
    }

    fn apply<S: CanonicalStore>(
        &self,
        store: &mut S,
        entries: &[RawAuctionEntry],
        year: i32,
    ) -> Result<ImportSummary, ImportError> {
        // Players created below are pushed here so later rows resolve
        // against them.
        let mut players = store.players()?;
        let mut teams: HashMap<String, CanonicalTeam> = HashMap::new();
        let mut summary = ImportSummary::new(year);

        for entry in entries {
            let team = team_for(store, &mut teams, &entry.team_label, &mut summary)?;

            let Some(name) = normalize(&entry.player_label) else {
                summary.unnamed_count += 1;
                continue;
            };

            let player = match self.resolver.resolve(&name.surname_key, &players) {
                Resolution::Unique(player) => {
                    summary.matched_player_count += 1;
                    player
                }
                Resolution::NotFound => {
                    // Named by the normalized label, e.g. "Aaron  Judge" -> "Aaron Judge".
                    let player = store.create_player(NewPlayer {
                        display_name: name.display_form.clone(),
                        position: non_empty(&entry.position),
                        mlb_team: Some(UNKNOWN_MLB_TEAM.to_string()),
                    })?;
                    debug!(id = player.id, "created player '{}'", player.display_name);
                    summary.created_player_count += 1;
                    players.push(player.clone());
                    player
                }
                Resolution::Ambiguous(candidates) => {
                    warn!(
                        year,
                        team = %entry.team_label,
                        candidates = candidates.len(),
                        "ambiguous player '{}', holding back for review",
                        entry.player_label
                    );
                    summary.ambiguous.push(ambiguity(entry, year, &candidates));
                    continue;
                }
            };

            ensure_references(&*store, &player, &team)?;
            let write = store.upsert_observation(&HistoricalObservation {
                player_id: player.id,
                team_id: team.id,
                year,
                salary: entry.salary,
                contract_type: self.contract_type.clone(),
            })?;
            match write {
                ObservationWrite::Created => summary.created_observation_count += 1,
                ObservationWrite::Updated => summary.updated_observation_count += 1,
            }
        }

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn ambiguity(entry: &RawAuctionEntry, year: i32, candidates: &[CanonicalPlayer]) -> AmbiguityRecord {
    AmbiguityRecord {
        year,
        team_label: entry.team_label.clone(),
        raw_name: entry.player_label.clone(),
        position: entry.position.clone(),
        salary: entry.salary,
        candidate_player_ids: candidates.iter().map(|p| p.id).collect(),
    }
}

/// Get-or-create a team by exact name, caching it for the rest of the run.
fn team_for<S: CanonicalStore>(
    store: &mut S,
    cache: &mut HashMap<String, CanonicalTeam>,
    label: &str,
    summary: &mut ImportSummary,
) -> Result<CanonicalTeam, ImportError> {
    if let Some(team) = cache.get(label) {
        return Ok(team.clone());
    }
    let team = match store.team_by_name(label)? {
        Some(team) => team,
        None => {
            let team = store.create_team(label, PLACEHOLDER_OWNER)?;
            info!(id = team.id, "created team '{}' (owner {})", label, PLACEHOLDER_OWNER);
            summary.created_team_count += 1;
            team
        }
    };
    cache.insert(label.to_string(), team.clone());
    Ok(team)
}

/// Both ends of an observation must exist before it is written.
fn ensure_references<S: CanonicalStore>(
    store: &S,
    player: &CanonicalPlayer,
    team: &CanonicalTeam,
) -> Result<(), ImportError> {
    if store.player_by_id(player.id)?.is_none() {
        return Err(ImportError::Integrity {
            message: format!(
                "player {} ('{}') is missing from the store",
                player.id, player.display_name
            ),
        });
    }
    if store.team_by_id(team.id)?.is_none() {
        return Err(ImportError::Integrity {
            message: format!("team {} ('{}') is missing from the store", team.id, team.name),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use keeperbook_core::store::MemoryStore;

    fn entry(team: &str, position: &str, player: &str, salary: u32) -> RawAuctionEntry {
        RawAuctionEntry {
            year: 2024,
            team_label: team.to_string(),
            position: position.to_string(),
            player_label: player.to_string(),
            salary,
        }
    }

    fn importer() -> Importer {
        Importer::from_config(&ImportConfig::default())
    }

    #[test]
    fn creates_players_teams_and_observations() {
        let mut store = MemoryStore::new();
        let entries = vec![
            entry("Mudcats", "OF", "Aaron Judge", 48),
            entry("Vorticists", "SS", "Bobby Witt", 35),
        ];

        let summary = importer().import_entries(&mut store, &entries, 2024).unwrap();

        assert_eq!(summary.created_player_count, 2);
        assert_eq!(summary.created_team_count, 2);
        assert_eq!(summary.created_observation_count, 2);
        assert!(summary.ambiguous.is_empty());

        let judge = &store.players_by_name("Aaron Judge").unwrap()[0];
        assert_eq!(judge.position.as_deref(), Some("OF"));
        assert_eq!(judge.mlb_team.as_deref(), Some(UNKNOWN_MLB_TEAM));

        let team = store.team_by_name("Mudcats").unwrap().unwrap();
        assert!(team.needs_owner());

        let obs = store.observations_for_player(judge.id).unwrap();
        assert_eq!(obs[0].salary, 48);
        assert_eq!(obs[0].contract_type, "auction");
    }

    #[test]
    fn player_created_earlier_in_run_is_matched() {
        let mut store = MemoryStore::new();
        let entries = vec![
            entry("Mudcats", "OF", "Aaron Judge", 48),
            entry("Vorticists", "OF", "Judge, Aaron", 50),
        ];

        let summary = importer().import_entries(&mut store, &entries, 2024).unwrap();

        assert_eq!(summary.created_player_count, 1);
        assert_eq!(summary.matched_player_count, 1);
        assert_eq!(store.player_count(), 1);
        assert_eq!(store.observation_count(), 2);
    }

    #[test]
    fn reimport_updates_salary_in_place() {
        let mut store = MemoryStore::new();
        let importer = importer();
        importer
            .import_entries(&mut store, &[entry("Mudcats", "OF", "Aaron Judge", 48)], 2024)
            .unwrap();

        let second = importer
            .import_entries(&mut store, &[entry("Mudcats", "OF", "Aaron Judge", 52)], 2024)
            .unwrap();

        assert_eq!(second.created_observation_count, 0);
        assert_eq!(second.updated_observation_count, 1);
        assert_eq!(second.created_team_count, 0);
        assert_eq!(store.observation_count(), 1);
        assert_eq!(store.observations().unwrap()[0].salary, 52);
    }

    #[test]
    fn ambiguous_entry_writes_nothing() {
        let mut store = MemoryStore::new();
        for name in ["Will Smith", "Dominic Smith"] {
            store
                .create_player(NewPlayer {
                    display_name: name.to_string(),
                    position: None,
                    mlb_team: None,
                })
                .unwrap();
        }

        let summary = importer()
            .import_entries(&mut store, &[entry("Mudcats", "C", "Smith", 12)], 2024)
            .unwrap();

        assert_eq!(store.player_count(), 2);
        assert_eq!(store.observation_count(), 0);
        assert_eq!(summary.ambiguous.len(), 1);
        let record = &summary.ambiguous[0];
        assert_eq!(record.raw_name, "Smith");
        assert_eq!(record.salary, 12);
        assert_eq!(record.candidate_player_ids, vec![1, 2]);
    }

    #[test]
    fn unnamed_entries_are_counted() {
        let mut store = MemoryStore::new();
        let summary = importer()
            .import_entries(&mut store, &[entry("Mudcats", "C", "   ", 3)], 2024)
            .unwrap();
        assert_eq!(summary.unnamed_count, 1);
        assert_eq!(store.player_count(), 0);
    }

    #[test]
    fn existing_team_is_reused() {
        let mut store = MemoryStore::new();
        let existing = store.create_team("Mudcats", "Pat").unwrap();

        let summary = importer()
            .import_entries(&mut store, &[entry("Mudcats", "OF", "Aaron Judge", 48)], 2024)
            .unwrap();

        assert_eq!(summary.created_team_count, 0);
        assert_eq!(store.observations().unwrap()[0].team_id, existing.id);
        assert_eq!(store.team_by_id(existing.id).unwrap().unwrap().owner, "Pat");
    }

    #[test]
    fn new_player_named_by_collapsed_label() {
        let mut store = MemoryStore::new();
        importer()
            .import_entries(&mut store, &[entry("Mudcats", "OF", "  Aaron \t Judge ", 48)], 2024)
            .unwrap();
        assert_eq!(store.players().unwrap()[0].display_name, "Aaron Judge");
    }

    #[test]
    fn blank_position_stored_as_none() {
        let mut store = MemoryStore::new();
        importer()
            .import_entries(&mut store, &[entry("Mudcats", " ", "Aaron Judge", 48)], 2024)
            .unwrap();
        assert!(store.players().unwrap()[0].position.is_none());
    }
}
