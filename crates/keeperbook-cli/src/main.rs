// keeperbook command-line entry point.
//
// Every command:
// 1. Initializes tracing (log to file, stdout stays clean for JSON)
// 2. Loads config/league.toml (copying defaults on first run)
// 3. Opens the SQLite database
// 4. Runs one operation and prints its report as pretty JSON

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use keeperbook_baseball::analysis;
use keeperbook_baseball::import::file::import_files;
use keeperbook_baseball::import::orchestrator::Importer;
use keeperbook_baseball::roster::{contract_timeline, RosterAccountant};
use keeperbook_baseball::valuation::bid::recommend_for_player;
use keeperbook_core::config::{self, Config};
use keeperbook_core::db::Database;
use keeperbook_core::model::{
    CanonicalPlayer, CanonicalTeam, Contract, NewPlayer, ProjectedValue, UNKNOWN_MLB_TEAM,
};
use keeperbook_core::store::CanonicalStore;

#[derive(Parser)]
#[command(name = "keeperbook")]
#[command(about = "Keeper-league auction history import and bid recommendations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import wide-format auction CSV exports (one season per file)
    Import {
        /// Files to import, in order; the season comes from each file name
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List teams; `needs_owner` flags import placeholders
    Teams,

    /// List players, optionally only those with an exact display name
    Players {
        #[arg(long)]
        name: Option<String>,
    },

    /// Create a player by hand, e.g. to settle an ambiguous import row
    AddPlayer {
        name: String,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        mlb_team: Option<String>,
    },

    /// Replace a team's owner
    SetOwner {
        team: String,
        owner: String,
    },

    /// Recommend an auction bid for a player
    Recommend {
        /// Player display name, exactly as stored
        player: String,
        /// Projected dollar value; overrides any stored projection
        #[arg(long)]
        projected: Option<f64>,
        /// Season whose stored projection to use
        #[arg(long)]
        year: Option<i32>,
    },

    /// Store a projected dollar value for a player's season
    Project {
        player: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        value: f64,
        #[arg(long, default_value = "manual")]
        source: String,
    },

    /// Put a player under contract with a team
    Sign {
        #[arg(long)]
        team: String,
        #[arg(long)]
        player: String,
        #[arg(long)]
        salary: u32,
        #[arg(long, default_value = "auction_keeper")]
        contract_type: String,
        #[arg(long)]
        year: i32,
        #[arg(
            long,
            default_value = "0",
            value_parser = clap::value_parser!(u32).range(..=MAX_YEARS_REMAINING)
        )]
        years_remaining: u32,
        #[arg(long)]
        rotation_round: Option<u32>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Show a team's salary, budget and contract timeline
    Team {
        name: String,
    },

    /// Check whether a team can add a player at a salary
    ValidateAdd {
        #[arg(long)]
        team: String,
        #[arg(long)]
        player: String,
        #[arg(long)]
        salary: u32,
    },

    /// Keeper candidates, salary changes, duplicate names and team spending
    Analyze,

    /// Record a live-auction bid as the current winner for the player
    LiveBid {
        #[arg(long)]
        team: String,
        #[arg(long)]
        player: String,
        #[arg(long)]
        amount: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;
    info!("keeperbook starting up");

    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, ${} budget",
        config.league.name, config.league.num_teams, config.league.budget
    );

    let mut db = Database::open(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path))?;

    run(cli.command, &config, &mut db)
}

fn run(command: Commands, config: &Config, db: &mut Database) -> anyhow::Result<()> {
    match command {
        Commands::Import { files } => {
            let importer = Importer::from_config(&config.import);
            let report = import_files(db, &importer, &config.import.layout, &files);
            print_json(&report)?;
            if report.failed_count() > 0 {
                bail!("{} of {} files failed to import", report.failed_count(), files.len());
            }
        }

        Commands::Teams => {
            print_json(&list_teams(db)?)?;
        }

        Commands::Players { name } => {
            let players = match name {
                Some(name) => db.players_by_name(&name)?,
                None => db.players()?,
            };
            print_json(&players)?;
        }

        Commands::AddPlayer {
            name,
            position,
            mlb_team,
        } => {
            let player = add_player(db, &name, position, mlb_team)?;
            print_json(&player)?;
        }

        Commands::SetOwner { team, owner } => {
            let team = set_owner(db, &team, &owner)?;
            print_json(&team)?;
        }

        Commands::Recommend {
            player,
            projected,
            year,
        } => {
            let player = find_player(db, &player)?;
            let projected = match (projected, year) {
                (Some(value), _) => Some(value),
                (None, Some(year)) => db.projected_value(player.id, year)?,
                (None, None) => None,
            };
            let valuation = recommend_for_player(&*db, player.id, projected)?;
            print_json(&serde_json::json!({
                "player": player,
                "valuation": valuation,
            }))?;
        }

        Commands::Project {
            player,
            year,
            value,
            source,
        } => {
            if !value.is_finite() {
                bail!("projected value must be a finite number, got {value}");
            }
            let player = find_player(db, &player)?;
            let projection = ProjectedValue {
                player_id: player.id,
                year,
                value,
                source,
            };
            db.upsert_projection(&projection)?;
            print_json(&projection)?;
        }

        Commands::Sign {
            team,
            player,
            salary,
            contract_type,
            year,
            years_remaining,
            rotation_round,
            notes,
        } => {
            let team = find_team(db, &team)?;
            let player = find_player(db, &player)?;
            let mut contract = Contract {
                id: 0,
                player_id: player.id,
                team_id: team.id,
                salary,
                contract_type,
                year,
                years_remaining,
                rotation_round,
                notes,
            };
            contract.id = db.insert_contract(&contract)?;
            db.set_roster_team(player.id, Some(team.id))?;
            info!(
                "signed '{}' to '{}' for ${}",
                player.display_name, team.name, salary
            );
            print_json(&contract)?;
        }

        Commands::Team { name } => {
            let team = find_team(db, &name)?;
            let contracts = db.contracts_for_team(team.id)?;
            let accountant = RosterAccountant::new(config.league.budget);
            let bare: Vec<Contract> = contracts.iter().map(|c| c.contract.clone()).collect();
            print_json(&serde_json::json!({
                "info": accountant.calculate_team_info(&team, &contracts),
                "auction_budget": accountant.remaining_auction_budget(&bare),
                "timeline": contract_timeline(&contracts),
            }))?;
        }

        Commands::ValidateAdd {
            team,
            player,
            salary,
        } => {
            let team = find_team(db, &team)?;
            let player = find_player(db, &player)?;
            let contracts: Vec<Contract> = db
                .contracts_for_team(team.id)?
                .into_iter()
                .map(|line| line.contract)
                .collect();
            let holder = match player.roster_team_id {
                Some(id) => db.team_by_id(id)?,
                None => None,
            };
            let accountant = RosterAccountant::new(config.league.budget);
            print_json(&accountant.validate_add(&contracts, team.id, holder.as_ref(), salary))?;
        }

        Commands::Analyze => {
            print_json(&analysis::analyze(&*db)?)?;
        }

        Commands::LiveBid {
            team,
            player,
            amount,
        } => {
            let team = find_team(db, &team)?;
            let player = find_player(db, &player)?;
            let bid = db.record_live_bid(player.id, team.id, amount)?;
            print_json(&bid)?;
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// League maintenance
// ---------------------------------------------------------------------------

/// Longest contract `sign` accepts.
const MAX_YEARS_REMAINING: i64 = 20;

#[derive(Debug, Serialize)]
struct TeamRow {
    #[serde(flatten)]
    team: CanonicalTeam,
    needs_owner: bool,
}

fn list_teams(db: &Database) -> anyhow::Result<Vec<TeamRow>> {
    Ok(db
        .teams()?
        .into_iter()
        .map(|team| TeamRow {
            needs_owner: team.needs_owner(),
            team,
        })
        .collect())
}

fn add_player(
    db: &mut Database,
    name: &str,
    position: Option<String>,
    mlb_team: Option<String>,
) -> anyhow::Result<CanonicalPlayer> {
    let display_name = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if display_name.is_empty() {
        bail!("player name must not be blank");
    }
    let existing = db.players_by_name(&display_name)?.len();
    if existing > 0 {
        warn!("adding another player named '{}' ({} already)", display_name, existing);
    }
    let player = db.create_player(NewPlayer {
        display_name,
        position,
        mlb_team: Some(mlb_team.unwrap_or_else(|| UNKNOWN_MLB_TEAM.to_string())),
    })?;
    info!(id = player.id, "added player '{}'", player.display_name);
    Ok(player)
}

fn set_owner(db: &mut Database, team: &str, owner: &str) -> anyhow::Result<CanonicalTeam> {
    let owner = owner.trim();
    if owner.is_empty() {
        bail!("owner must not be blank");
    }
    let team = find_team(db, team)?;
    let updated = db.set_team_owner(team.id, owner)?;
    info!("team '{}' owner: {} -> {}", updated.name, team.owner, updated.owner);
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn find_player(db: &Database, name: &str) -> anyhow::Result<CanonicalPlayer> {
    let mut matches = db.players_by_name(name)?;
    match matches.len() {
        0 => bail!("no player named '{name}'"),
        1 => Ok(matches.remove(0)),
        n => {
            let ids: Vec<String> = matches.iter().map(|p| p.id.to_string()).collect();
            bail!("{n} players are named '{name}' (ids {}); resolve the duplicate first", ids.join(", "))
        }
    }
}

fn find_team(db: &Database, name: &str) -> anyhow::Result<CanonicalTeam> {
    db.team_by_name(name)?
        .with_context(|| format!("no team named '{name}'"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize report")?;
    println!("{text}");
    Ok(())
}

/// Used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "keeperbook=info,warn";

/// Send tracing output to `logs/keeperbook.log`, appending across runs.
/// Stdout is reserved for the JSON reports.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("cannot create {}", log_dir.display()))?;
    let log_path = log_dir.join("keeperbook.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("cannot open {}", log_path.display()))?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use keeperbook_core::model::PLACEHOLDER_OWNER;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_validate_add() {
        let cli = Cli::try_parse_from([
            "keeperbook",
            "validate-add",
            "--team",
            "Mudcats",
            "--player",
            "Aaron Judge",
            "--salary",
            "10",
        ])
        .unwrap();
        match cli.command {
            Commands::ValidateAdd {
                team,
                player,
                salary,
            } => {
                assert_eq!(team, "Mudcats");
                assert_eq!(player, "Aaron Judge");
                assert_eq!(salary, 10);
            }
            _ => panic!("expected validate-add"),
        }
    }

    #[test]
    fn import_requires_files() {
        assert!(Cli::try_parse_from(["keeperbook", "import"]).is_err());
    }

    #[test]
    fn sign_rejects_overlong_contract() {
        let base = [
            "keeperbook", "sign", "--team", "Mudcats", "--player", "Aaron Judge",
            "--salary", "45", "--year", "2025", "--years-remaining",
        ];
        let accepted = Cli::try_parse_from(base.iter().copied().chain(["20"]));
        assert!(accepted.is_ok());
        let rejected = Cli::try_parse_from(base.iter().copied().chain(["2147483647"]));
        assert!(rejected.is_err());
    }

    #[test]
    fn parses_maintenance_commands() {
        assert!(matches!(
            Cli::try_parse_from(["keeperbook", "teams"]).unwrap().command,
            Commands::Teams
        ));
        match Cli::try_parse_from(["keeperbook", "players", "--name", "Will Smith"])
            .unwrap()
            .command
        {
            Commands::Players { name } => assert_eq!(name.as_deref(), Some("Will Smith")),
            _ => panic!("expected players"),
        }
        match Cli::try_parse_from(["keeperbook", "add-player", "Dominic Smith", "--position", "1B"])
            .unwrap()
            .command
        {
            Commands::AddPlayer {
                name,
                position,
                mlb_team,
            } => {
                assert_eq!(name, "Dominic Smith");
                assert_eq!(position.as_deref(), Some("1B"));
                assert!(mlb_team.is_none());
            }
            _ => panic!("expected add-player"),
        }
        match Cli::try_parse_from(["keeperbook", "set-owner", "Mudcats", "Pat"])
            .unwrap()
            .command
        {
            Commands::SetOwner { team, owner } => {
                assert_eq!(team, "Mudcats");
                assert_eq!(owner, "Pat");
            }
            _ => panic!("expected set-owner"),
        }
    }

    #[test]
    fn list_teams_flags_placeholder_owners() {
        let mut db = Database::open(":memory:").unwrap();
        db.create_team("Mudcats", PLACEHOLDER_OWNER).unwrap();
        db.create_team("Vorticists", "Lee").unwrap();

        let rows = list_teams(&db).unwrap();

        assert_eq!(rows.len(), 2);
        assert!(rows[0].needs_owner);
        assert!(!rows[1].needs_owner);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["name"], "Mudcats");
        assert_eq!(json["needs_owner"], true);
    }

    #[test]
    fn add_player_normalizes_name_and_defaults_mlb_team() {
        let mut db = Database::open(":memory:").unwrap();

        let player = add_player(&mut db, "  Dominic   Smith ", Some("1B".into()), None).unwrap();

        assert_eq!(player.display_name, "Dominic Smith");
        assert_eq!(player.mlb_team.as_deref(), Some(UNKNOWN_MLB_TEAM));
        assert_eq!(db.players_by_name("Dominic Smith").unwrap(), vec![player]);
        assert!(add_player(&mut db, "   ", None, None).is_err());
    }

    #[test]
    fn set_owner_replaces_placeholder() {
        let mut db = Database::open(":memory:").unwrap();
        db.create_team("Mudcats", PLACEHOLDER_OWNER).unwrap();

        let team = set_owner(&mut db, "Mudcats", " Pat ").unwrap();

        assert_eq!(team.owner, "Pat");
        assert!(!db.team_by_name("Mudcats").unwrap().unwrap().needs_owner());
        assert!(set_owner(&mut db, "Mudcats", "  ").is_err());
        assert!(set_owner(&mut db, "Pirates", "Lee").is_err());
    }
}
