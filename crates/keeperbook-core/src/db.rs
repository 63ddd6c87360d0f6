// SQLite persistence for the canonical player/team store, historical
// auction observations, contracts, projections and live bids.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, warn};

use crate::model::{
    AuctionBid, CanonicalPlayer, CanonicalTeam, Contract, HistoricalObservation, NewPlayer,
    ObservationWrite, PlayerId, ProjectedValue, RosteredContract, TeamId,
};
use crate::store::{CanonicalStore, StoreError};

/// SQLite-backed canonical store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                name       TEXT NOT NULL UNIQUE,
                owner      TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS players (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                name           TEXT NOT NULL,
                position       TEXT,
                mlb_team       TEXT,
                roster_team_id INTEGER REFERENCES teams(id),
                created_at     TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_players_name ON players(name);

            CREATE TABLE IF NOT EXISTS historical_auctions (
                player_id     INTEGER NOT NULL REFERENCES players(id),
                team_id       INTEGER NOT NULL REFERENCES teams(id),
                year          INTEGER NOT NULL,
                salary        INTEGER NOT NULL,
                contract_type TEXT NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                PRIMARY KEY (player_id, team_id, year)
            );

            CREATE TABLE IF NOT EXISTS contracts (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id       INTEGER NOT NULL REFERENCES players(id),
                team_id         INTEGER NOT NULL REFERENCES teams(id),
                salary          INTEGER NOT NULL,
                contract_type   TEXT NOT NULL,
                year            INTEGER NOT NULL,
                years_remaining INTEGER NOT NULL DEFAULT 0,
                rotation_round  INTEGER,
                notes           TEXT,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS projections (
                player_id INTEGER NOT NULL REFERENCES players(id),
                year      INTEGER NOT NULL,
                source    TEXT NOT NULL,
                value     REAL NOT NULL,
                PRIMARY KEY (player_id, year, source)
            );

            CREATE TABLE IF NOT EXISTS auction_bids (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                player_id  INTEGER NOT NULL REFERENCES players(id),
                team_id    INTEGER NOT NULL REFERENCES teams(id),
                bid_amount INTEGER NOT NULL,
                is_winning INTEGER NOT NULL DEFAULT 1,
                timestamp  TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn rollback(&self) {
        let conn = self.conn();
        if conn.is_autocommit() {
            return;
        }
        if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
            warn!("rollback failed: {}", rollback_err);
        }
    }

    /// Acquire the database connection. A poisoned lock still holds a usable
    /// connection; SQLite rolls back any statement the panicking holder left
    /// half-done.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ------------------------------------------------------------------
    // Roster assignment
    // ------------------------------------------------------------------

    /// Point a player's roster at `team_id`, or clear it with `None`.
    pub fn set_roster_team(
        &self,
        player_id: PlayerId,
        team_id: Option<TeamId>,
    ) -> Result<(), StoreError> {
        let updated = self.conn().execute(
            "UPDATE players SET roster_team_id = ?1 WHERE id = ?2",
            params![team_id, player_id],
        )?;
        if updated == 0 {
            return Err(StoreError::Integrity {
                message: format!("unknown player id {player_id}"),
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Contracts
    // ------------------------------------------------------------------

    /// Insert a contract and return its new id. `contract.id` is ignored.
    pub fn insert_contract(&self, contract: &Contract) -> Result<i64, StoreError> {
        let id: i64 = self.conn().query_row(
            "INSERT INTO contracts
                (player_id, team_id, salary, contract_type, year, years_remaining, rotation_round, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id",
            params![
                contract.player_id,
                contract.team_id,
                contract.salary,
                contract.contract_type,
                contract.year,
                contract.years_remaining,
                contract.rotation_round,
                contract.notes,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// A team's contracts joined with player names, ordered by contract id.
    pub fn contracts_for_team(&self, team_id: TeamId) -> Result<Vec<RosteredContract>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.player_id, c.team_id, c.salary, c.contract_type, c.year,
                    c.years_remaining, c.rotation_round, c.notes, p.name, p.position
             FROM contracts c JOIN players p ON p.id = c.player_id
             WHERE c.team_id = ?1
             ORDER BY c.id",
        )?;
        let rows = stmt
            .query_map(params![team_id], |row| {
                Ok(RosteredContract {
                    contract: Contract {
                        id: row.get(0)?,
                        player_id: row.get(1)?,
                        team_id: row.get(2)?,
                        salary: row.get(3)?,
                        contract_type: row.get(4)?,
                        year: row.get(5)?,
                        years_remaining: row.get(6)?,
                        rotation_round: row.get(7)?,
                        notes: row.get(8)?,
                    },
                    player_name: row.get(9)?,
                    position: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ------------------------------------------------------------------
    // Projections
    // ------------------------------------------------------------------

    /// Insert or replace a projected value for (player, year, source).
    pub fn upsert_projection(&self, projection: &ProjectedValue) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO projections (player_id, year, source, value)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                projection.player_id,
                projection.year,
                projection.source,
                projection.value
            ],
        )?;
        Ok(())
    }

    /// Mean projected value across all sources for a player's season, or
    /// `None` when no source projects the player.
    pub fn projected_value(&self, player_id: PlayerId, year: i32) -> Result<Option<f64>, StoreError> {
        let value: Option<f64> = self.conn().query_row(
            "SELECT AVG(value) FROM projections WHERE player_id = ?1 AND year = ?2",
            params![player_id, year],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Live bids
    // ------------------------------------------------------------------

    /// Record a live bid: every earlier bid on the player stops winning and
    /// the new bid becomes the winner.
    pub fn record_live_bid(
        &self,
        player_id: PlayerId,
        team_id: TeamId,
        amount: u32,
    ) -> Result<AuctionBid, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let superseded = tx.execute(
            "UPDATE auction_bids SET is_winning = 0 WHERE player_id = ?1",
            params![player_id],
        )?;
        let timestamp = chrono::Utc::now().to_rfc3339();
        let id: i64 = tx.query_row(
            "INSERT INTO auction_bids (player_id, team_id, bid_amount, is_winning, timestamp)
             VALUES (?1, ?2, ?3, 1, ?4)
             RETURNING id",
            params![player_id, team_id, amount, timestamp],
            |row| row.get(0),
        )?;
        tx.commit()?;
        debug!(player_id, team_id, amount, superseded, "recorded live bid");

        Ok(AuctionBid {
            id,
            player_id,
            team_id,
            amount,
            is_winning: true,
            timestamp,
        })
    }

    /// The current winning bid on a player, if any.
    pub fn winning_bid(&self, player_id: PlayerId) -> Result<Option<AuctionBid>, StoreError> {
        let bid = self
            .conn()
            .query_row(
                "SELECT id, player_id, team_id, bid_amount, is_winning, timestamp
                 FROM auction_bids WHERE player_id = ?1 AND is_winning = 1
                 ORDER BY id DESC LIMIT 1",
                params![player_id],
                |row| {
                    Ok(AuctionBid {
                        id: row.get(0)?,
                        player_id: row.get(1)?,
                        team_id: row.get(2)?,
                        amount: row.get(3)?,
                        is_winning: row.get(4)?,
                        timestamp: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(bid)
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

const PLAYER_COLUMNS: &str = "id, name, position, mlb_team, roster_team_id";
const OBSERVATION_COLUMNS: &str = "player_id, team_id, year, salary, contract_type";

fn player_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalPlayer> {
    Ok(CanonicalPlayer {
        id: row.get(0)?,
        display_name: row.get(1)?,
        position: row.get(2)?,
        mlb_team: row.get(3)?,
        roster_team_id: row.get(4)?,
    })
}

fn team_from_row(row: &Row<'_>) -> rusqlite::Result<CanonicalTeam> {
    Ok(CanonicalTeam {
        id: row.get(0)?,
        name: row.get(1)?,
        owner: row.get(2)?,
    })
}

fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<HistoricalObservation> {
    Ok(HistoricalObservation {
        player_id: row.get(0)?,
        team_id: row.get(1)?,
        year: row.get(2)?,
        salary: row.get(3)?,
        contract_type: row.get(4)?,
    })
}

// ---------------------------------------------------------------------------
// CanonicalStore
// ---------------------------------------------------------------------------

impl CanonicalStore for Database {
    fn players(&self) -> Result<Vec<CanonicalPlayer>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id"))?;
        let players = stmt
            .query_map([], player_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }

    fn player_by_id(&self, id: PlayerId) -> Result<Option<CanonicalPlayer>, StoreError> {
        let player = self
            .conn()
            .query_row(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
                params![id],
                player_from_row,
            )
            .optional()?;
        Ok(player)
    }

    fn players_by_name(&self, name: &str) -> Result<Vec<CanonicalPlayer>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PLAYER_COLUMNS} FROM players WHERE name = ?1 ORDER BY id"
        ))?;
        let players = stmt
            .query_map(params![name], player_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(players)
    }

    fn create_player(&mut self, player: NewPlayer) -> Result<CanonicalPlayer, StoreError> {
        let id: PlayerId = self.conn().query_row(
            "INSERT INTO players (name, position, mlb_team) VALUES (?1, ?2, ?3) RETURNING id",
            params![player.display_name, player.position, player.mlb_team],
            |row| row.get(0),
        )?;
        Ok(CanonicalPlayer {
            id,
            display_name: player.display_name,
            position: player.position,
            mlb_team: player.mlb_team,
            roster_team_id: None,
        })
    }

    fn teams(&self) -> Result<Vec<CanonicalTeam>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, owner FROM teams ORDER BY id")?;
        let teams = stmt
            .query_map([], team_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(teams)
    }

    fn team_by_id(&self, id: TeamId) -> Result<Option<CanonicalTeam>, StoreError> {
        let team = self
            .conn()
            .query_row(
                "SELECT id, name, owner FROM teams WHERE id = ?1",
                params![id],
                team_from_row,
            )
            .optional()?;
        Ok(team)
    }

    fn team_by_name(&self, name: &str) -> Result<Option<CanonicalTeam>, StoreError> {
        let team = self
            .conn()
            .query_row(
                "SELECT id, name, owner FROM teams WHERE name = ?1",
                params![name],
                team_from_row,
            )
            .optional()?;
        Ok(team)
    }

    fn create_team(&mut self, name: &str, owner: &str) -> Result<CanonicalTeam, StoreError> {
        let conn = self.conn();
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM teams WHERE name = ?1)",
            params![name],
            |row| row.get(0),
        )?;
        if taken {
            return Err(StoreError::Integrity {
                message: format!("team name '{name}' already exists"),
            });
        }
        let id: TeamId = conn.query_row(
            "INSERT INTO teams (name, owner) VALUES (?1, ?2) RETURNING id",
            params![name, owner],
            |row| row.get(0),
        )?;
        Ok(CanonicalTeam {
            id,
            name: name.to_string(),
            owner: owner.to_string(),
        })
    }

    fn set_team_owner(&mut self, id: TeamId, owner: &str) -> Result<CanonicalTeam, StoreError> {
        let team = self
            .conn()
            .query_row(
                "UPDATE teams SET owner = ?2 WHERE id = ?1 RETURNING id, name, owner",
                params![id, owner],
                team_from_row,
            )
            .optional()?;
        team.ok_or_else(|| StoreError::Integrity {
            message: format!("unknown team id {id}"),
        })
    }

    fn upsert_observation(
        &mut self,
        observation: &HistoricalObservation,
    ) -> Result<ObservationWrite, StoreError> {
        let conn = self.conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM historical_auctions
                           WHERE player_id = ?1 AND team_id = ?2 AND year = ?3)",
            params![observation.player_id, observation.team_id, observation.year],
            |row| row.get(0),
        )?;

        if exists {
            conn.execute(
                "UPDATE historical_auctions SET salary = ?4, contract_type = ?5
                 WHERE player_id = ?1 AND team_id = ?2 AND year = ?3",
                params![
                    observation.player_id,
                    observation.team_id,
                    observation.year,
                    observation.salary,
                    observation.contract_type,
                ],
            )?;
            Ok(ObservationWrite::Updated)
        } else {
            conn.execute(
                "INSERT INTO historical_auctions (player_id, team_id, year, salary, contract_type)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    observation.player_id,
                    observation.team_id,
                    observation.year,
                    observation.salary,
                    observation.contract_type,
                ],
            )?;
            Ok(ObservationWrite::Created)
        }
    }

    fn observations(&self) -> Result<Vec<HistoricalObservation>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM historical_auctions
             ORDER BY player_id, team_id, year"
        ))?;
        let rows = stmt
            .query_map([], observation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn observations_for_player(
        &self,
        player_id: PlayerId,
    ) -> Result<Vec<HistoricalObservation>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {OBSERVATION_COLUMNS} FROM historical_auctions
             WHERE player_id = ?1 ORDER BY year, team_id"
        ))?;
        let rows = stmt
            .query_map(params![player_id], observation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Wraps `f` in `BEGIN IMMEDIATE` ... `COMMIT`. The write lock is taken
    /// up front so no other connection can slip in between the reads and
    /// writes of one import. Any failure, including a failed `COMMIT`, ends
    /// in `ROLLBACK` so the connection is never left inside a transaction.
    fn atomically<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Self) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.conn()
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(StoreError::from)?;

        match f(self) {
            Ok(value) => {
                let committed = self.conn().execute_batch("COMMIT");
                match committed {
                    Ok(()) => Ok(value),
                    Err(commit_err) => {
                        warn!("commit failed: {}", commit_err);
                        self.rollback();
                        Err(StoreError::from(commit_err).into())
                    }
                }
            }
            Err(e) => {
                self.rollback();
                Err(e)
            }
        }
    }
}
