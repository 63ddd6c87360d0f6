// Canonical store abstraction and an in-memory implementation.
//
// The import pipeline only ever talks to a `CanonicalStore`. `Database`
// (SQLite) is the production backend; `MemoryStore` backs tests and dry runs.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::{
    CanonicalPlayer, CanonicalTeam, HistoricalObservation, NewPlayer, ObservationWrite, PlayerId,
    TeamId,
};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("integrity violation: {message}")]
    Integrity { message: String },

    #[error("store unavailable: {message}")]
    Unavailable { message: String },
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// The narrow set of operations the import pipeline and the readers need
/// from persistent storage.
pub trait CanonicalStore {
    /// All players in creation order.
    fn players(&self) -> Result<Vec<CanonicalPlayer>, StoreError>;

    fn player_by_id(&self, id: PlayerId) -> Result<Option<CanonicalPlayer>, StoreError>;

    /// Players whose display name equals `name` exactly, in creation order.
    fn players_by_name(&self, name: &str) -> Result<Vec<CanonicalPlayer>, StoreError>;

    fn create_player(&mut self, player: NewPlayer) -> Result<CanonicalPlayer, StoreError>;

    /// All teams in creation order.
    fn teams(&self) -> Result<Vec<CanonicalTeam>, StoreError>;

    fn team_by_id(&self, id: TeamId) -> Result<Option<CanonicalTeam>, StoreError>;

    fn team_by_name(&self, name: &str) -> Result<Option<CanonicalTeam>, StoreError>;

    /// Create a team. Fails with `Integrity` if the name is taken.
    fn create_team(&mut self, name: &str, owner: &str) -> Result<CanonicalTeam, StoreError>;

    /// Replace a team's owner and return the updated team. Fails with
    /// `Integrity` if no team has `id`.
    fn set_team_owner(&mut self, id: TeamId, owner: &str) -> Result<CanonicalTeam, StoreError>;

    /// Insert the observation, or overwrite salary and contract type of the
    /// existing row with the same (player_id, team_id, year).
    fn upsert_observation(
        &mut self,
        observation: &HistoricalObservation,
    ) -> Result<ObservationWrite, StoreError>;

    /// All observations ordered by (player_id, team_id, year).
    fn observations(&self) -> Result<Vec<HistoricalObservation>, StoreError>;

    /// A single player's observations ordered by year.
    fn observations_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<HistoricalObservation>, StoreError>;

    /// Run `f` as one unit of work. If `f` returns an error, every mutation
    /// it made is discarded.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation
// ---------------------------------------------------------------------------

/// Vec/BTreeMap-backed store. Rollback restores a snapshot taken when the
/// unit of work began.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    players: Vec<CanonicalPlayer>,
    teams: Vec<CanonicalTeam>,
    observations: BTreeMap<(PlayerId, TeamId, i32), HistoricalObservation>,
    next_player_id: PlayerId,
    next_team_id: TeamId,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }
}

impl CanonicalStore for MemoryStore {
    fn players(&self) -> Result<Vec<CanonicalPlayer>, StoreError> {
        Ok(self.players.clone())
    }

    fn player_by_id(&self, id: PlayerId) -> Result<Option<CanonicalPlayer>, StoreError> {
        Ok(self.players.iter().find(|p| p.id == id).cloned())
    }

    fn players_by_name(&self, name: &str) -> Result<Vec<CanonicalPlayer>, StoreError> {
        Ok(self
            .players
            .iter()
            .filter(|p| p.display_name == name)
            .cloned()
            .collect())
    }

    fn create_player(&mut self, player: NewPlayer) -> Result<CanonicalPlayer, StoreError> {
        self.next_player_id += 1;
        let created = CanonicalPlayer {
            id: self.next_player_id,
            display_name: player.display_name,
            position: player.position,
            mlb_team: player.mlb_team,
            roster_team_id: None,
        };
        self.players.push(created.clone());
        Ok(created)
    }

    fn teams(&self) -> Result<Vec<CanonicalTeam>, StoreError> {
        Ok(self.teams.clone())
    }

    fn team_by_id(&self, id: TeamId) -> Result<Option<CanonicalTeam>, StoreError> {
        Ok(self.teams.iter().find(|t| t.id == id).cloned())
    }

    fn team_by_name(&self, name: &str) -> Result<Option<CanonicalTeam>, StoreError> {
        Ok(self.teams.iter().find(|t| t.name == name).cloned())
    }

    fn create_team(&mut self, name: &str, owner: &str) -> Result<CanonicalTeam, StoreError> {
        if self.teams.iter().any(|t| t.name == name) {
            return Err(StoreError::Integrity {
                message: format!("team name '{name}' already exists"),
            });
        }
        self.next_team_id += 1;
        let created = CanonicalTeam {
            id: self.next_team_id,
            name: name.to_string(),
            owner: owner.to_string(),
        };
        self.teams.push(created.clone());
        Ok(created)
    }

    fn set_team_owner(&mut self, id: TeamId, owner: &str) -> Result<CanonicalTeam, StoreError> {
        let team = self
            .teams
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::Integrity {
                message: format!("unknown team id {id}"),
            })?;
        team.owner = owner.to_string();
        Ok(team.clone())
    }

    fn upsert_observation(
        &mut self,
        observation: &HistoricalObservation,
    ) -> Result<ObservationWrite, StoreError> {
        if !self.players.iter().any(|p| p.id == observation.player_id) {
            return Err(StoreError::Integrity {
                message: format!("unknown player id {}", observation.player_id),
            });
        }
        if !self.teams.iter().any(|t| t.id == observation.team_id) {
            return Err(StoreError::Integrity {
                message: format!("unknown team id {}", observation.team_id),
            });
        }

        let key = (observation.player_id, observation.team_id, observation.year);
        match self.observations.get_mut(&key) {
            Some(existing) => {
                existing.salary = observation.salary;
                existing.contract_type = observation.contract_type.clone();
                Ok(ObservationWrite::Updated)
            }
            None => {
                self.observations.insert(key, observation.clone());
                Ok(ObservationWrite::Created)
            }
        }
    }

    fn observations(&self) -> Result<Vec<HistoricalObservation>, StoreError> {
        Ok(self.observations.values().cloned().collect())
    }

    fn observations_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<HistoricalObservation>, StoreError> {
        let mut rows: Vec<_> = self
            .observations
            .values()
            .filter(|o| o.player_id == player_id)
            .cloned()
            .collect();
        rows.sort_by_key(|o| (o.year, o.team_id));
        Ok(rows)
    }

    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        let snapshot = self.clone();
        let result = f(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }
}
