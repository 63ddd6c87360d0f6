// Configuration loading and parsing (config/league.toml).

use serde::Deserialize;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub import: ImportConfig,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire league.toml file.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    #[serde(default)]
    import: ImportSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub num_teams: usize,
    /// Auction budget per team, in dollars.
    pub budget: u32,
    pub roster_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ImportSection {
    sentinel: String,
    header_rows: usize,
    player_offset: usize,
    salary_offset: usize,
    ignored_tokens: Vec<String>,
    matcher: String,
    default_contract_type: String,
}

impl Default for ImportSection {
    fn default() -> Self {
        let layout = SheetLayout::default();
        Self {
            sentinel: layout.sentinel,
            header_rows: layout.header_rows,
            player_offset: layout.player_offset,
            salary_offset: layout.salary_offset,
            ignored_tokens: layout.ignored_tokens,
            matcher: "substring".into(),
            default_contract_type: DEFAULT_CONTRACT_TYPE.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// Contract type recorded on imported auction observations.
pub const DEFAULT_CONTRACT_TYPE: &str = "auction";

/// Where the cells of a wide-format auction sheet live.
///
/// Row 0 carries team labels; rows `1..header_rows` are sub-headers. A team's
/// player cell is `label_column + player_offset` and its salary cell is
/// `player_column + salary_offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// A row whose first cell contains this (case-insensitively) ends the data.
    pub sentinel: String,
    pub header_rows: usize,
    pub player_offset: usize,
    pub salary_offset: usize,
    /// Row-0 cells that are column captions rather than team labels.
    pub ignored_tokens: Vec<String>,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            sentinel: "SPENT".into(),
            header_rows: 2,
            player_offset: 0,
            salary_offset: 1,
            ignored_tokens: vec!["Position".into(), "Player".into(), "$".into()],
        }
    }
}

/// How a surname key is compared against canonical display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatcherKind {
    /// Case-insensitive substring of the display name.
    #[default]
    Substring,
    /// Case-insensitive equality with one token of the display name.
    Token,
}

impl MatcherKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "substring" => Some(Self::Substring),
            "token" => Some(Self::Token),
            _ => None,
        }
    }
}

/// The public import config assembled from the `[import]` section.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub layout: SheetLayout,
    pub matcher: MatcherKind,
    pub default_contract_type: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            layout: SheetLayout::default(),
            matcher: MatcherKind::default(),
            default_contract_type: DEFAULT_CONTRACT_TYPE.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` relative to
/// `base_dir`.
///
/// Does not copy defaults; `load_config()` handles that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let league_path = base_dir.join("config").join("league.toml");
    let league_text = read_file(&league_path)?;
    let file: LeagueFile = toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
        path: league_path.clone(),
        source: e,
    })?;

    validate_league(&file.league)?;
    let import = assemble_import(file.import)?;

    Ok(Config {
        league: file.league,
        import,
        db_path: file.database.path,
    })
}

/// Seed `config/` from `defaults/`: every default file that `config/` lacks
/// is copied over, and the copies are returned. `.example` templates stay
/// behind and a file already in `config/` is left untouched.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        return if config_dir.is_dir() {
            Ok(Vec::new())
        } else {
            Err(copy_error(format!(
                "no defaults/ or config/ directory under {}; run keeperbook from the league directory",
                base_dir.display()
            )))
        };
    }

    fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;
    let listing = fs::read_dir(&defaults_dir)
        .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?;

    let mut copied = Vec::new();
    for entry in listing {
        let source = entry
            .map_err(|e| copy_error(format!("cannot list {}: {e}", defaults_dir.display())))?
            .path();
        if !source.is_file() || source.extension().is_some_and(|ext| ext == "example") {
            continue;
        }
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if copy_if_absent(&source, &target)? {
            info!("seeded {} from defaults", target.display());
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Copy `source` to `target` unless `target` exists. Returns whether a copy
/// was made. `create_new` makes the existence check and the create one step.
fn copy_if_absent(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match OpenOptions::new().write(true).create_new(true).open(target) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error(format!("cannot create {}: {e}", target.display()))),
    };
    let mut src = File::open(source)
        .map_err(|e| copy_error(format!("cannot open {}: {e}", source.display())))?;
    io::copy(&mut src, &mut dest).map_err(|e| {
        copy_error(format!(
            "cannot copy {} to {}: {e}",
            source.display(),
            target.display()
        ))
    })?;
    Ok(true)
}

fn copy_error(message: String) -> ConfigError {
    ConfigError::DefaultsCopyError { message }
}

/// Loads config relative to the current working directory, copying
/// defaults first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_league(league: &LeagueConfig) -> Result<(), ConfigError> {
    if league.num_teams == 0 {
        return Err(invalid("league.num_teams", "must be greater than 0"));
    }
    if league.budget == 0 {
        return Err(invalid("league.budget", "must be greater than 0"));
    }
    if league.roster_size == 0 {
        return Err(invalid("league.roster_size", "must be greater than 0"));
    }
    Ok(())
}

fn assemble_import(section: ImportSection) -> Result<ImportConfig, ConfigError> {
    if section.sentinel.trim().is_empty() {
        return Err(invalid("import.sentinel", "must not be empty"));
    }
    if section.header_rows == 0 {
        return Err(invalid(
            "import.header_rows",
            "must be at least 1 (row 0 holds the team labels)",
        ));
    }
    if section.salary_offset == 0 {
        return Err(invalid(
            "import.salary_offset",
            "must be at least 1 (salary cannot share the player column)",
        ));
    }
    let matcher = MatcherKind::parse(&section.matcher).ok_or_else(|| {
        invalid(
            "import.matcher",
            format!(
                "unknown matcher '{}'; expected \"substring\" or \"token\"",
                section.matcher
            ),
        )
    })?;
    if section.default_contract_type.trim().is_empty() {
        return Err(invalid("import.default_contract_type", "must not be empty"));
    }

    Ok(ImportConfig {
        layout: SheetLayout {
            sentinel: section.sentinel,
            header_rows: section.header_rows,
            player_offset: section.player_offset,
            salary_offset: section.salary_offset,
            ignored_tokens: section.ignored_tokens,
        },
        matcher,
        default_contract_type: section.default_contract_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Repository-level `defaults/` directory.
    fn defaults_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../defaults")
    }

    const MINIMAL_LEAGUE: &str = r#"
[league]
name = "Test"
num_teams = 10
budget = 280
roster_size = 25

[database]
path = "test.db"
"#;

    /// Write `contents` as config/league.toml under a fresh temp dir.
    fn config_with(contents: &str) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        let config_dir = tmp.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("league.toml"), contents).unwrap();
        tmp
    }

    fn expect_validation_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_project_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config_dir = tmp.path().join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::copy(
            defaults_dir().join("league.toml"),
            config_dir.join("league.toml"),
        )
        .unwrap();

        let config = load_config_from(tmp.path()).expect("should load valid config");

        assert_eq!(config.league.name, "Junior League");
        assert_eq!(config.league.num_teams, 10);
        assert_eq!(config.league.budget, 280);
        assert_eq!(config.league.roster_size, 25);
        assert_eq!(config.import.layout, SheetLayout::default());
        assert_eq!(config.import.matcher, MatcherKind::Substring);
        assert_eq!(config.import.default_contract_type, "auction");
        assert_eq!(config.db_path, "keeperbook.db");
    }

    #[test]
    fn import_section_is_optional() {
        let tmp = config_with(MINIMAL_LEAGUE);
        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.import.layout.sentinel, "SPENT");
        assert_eq!(config.import.layout.salary_offset, 1);
        assert_eq!(config.import.matcher, MatcherKind::Substring);
    }

    #[test]
    fn partial_import_section_keeps_other_defaults() {
        let tmp = config_with(&format!(
            "{MINIMAL_LEAGUE}\n[import]\nmatcher = \"token\"\nheader_rows = 3\n"
        ));
        let config = load_config_from(tmp.path()).unwrap();
        assert_eq!(config.import.matcher, MatcherKind::Token);
        assert_eq!(config.import.layout.header_rows, 3);
        assert_eq!(config.import.layout.sentinel, "SPENT");
    }

    #[test]
    fn rejects_num_teams_zero() {
        let tmp = config_with(&MINIMAL_LEAGUE.replace("num_teams = 10", "num_teams = 0"));
        let err = load_config_from(tmp.path()).unwrap_err();
        expect_validation_field(err, "league.num_teams");
    }

    #[test]
    fn rejects_budget_zero() {
        let tmp = config_with(&MINIMAL_LEAGUE.replace("budget = 280", "budget = 0"));
        let err = load_config_from(tmp.path()).unwrap_err();
        expect_validation_field(err, "league.budget");
    }

    #[test]
    fn rejects_zero_salary_offset() {
        let tmp = config_with(&format!("{MINIMAL_LEAGUE}\n[import]\nsalary_offset = 0\n"));
        let err = load_config_from(tmp.path()).unwrap_err();
        expect_validation_field(err, "import.salary_offset");
    }

    #[test]
    fn rejects_zero_header_rows() {
        let tmp = config_with(&format!("{MINIMAL_LEAGUE}\n[import]\nheader_rows = 0\n"));
        let err = load_config_from(tmp.path()).unwrap_err();
        expect_validation_field(err, "import.header_rows");
    }

    #[test]
    fn rejects_blank_sentinel() {
        let tmp = config_with(&format!("{MINIMAL_LEAGUE}\n[import]\nsentinel = \"  \"\n"));
        let err = load_config_from(tmp.path()).unwrap_err();
        expect_validation_field(err, "import.sentinel");
    }

    #[test]
    fn rejects_unknown_matcher() {
        let tmp = config_with(&format!("{MINIMAL_LEAGUE}\n[import]\nmatcher = \"fuzzy\"\n"));
        let err = load_config_from(tmp.path()).unwrap_err();
        expect_validation_field(err, "import.matcher");
    }

    #[test]
    fn file_not_found_for_missing_league_toml() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("config")).unwrap();

        let err = load_config_from(tmp.path()).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("league.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = config_with("this is not valid [[[ toml");
        let err = load_config_from(tmp.path()).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("league.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let defaults = tmp.path().join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::copy(defaults_dir().join("league.toml"), defaults.join("league.toml")).unwrap();
        fs::write(defaults.join("league.toml.example"), "# template\n").unwrap();

        let copied = ensure_config_files(tmp.path()).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.path().join("config/league.toml").exists());
        assert!(!tmp.path().join("config/league.toml.example").exists());

        // The copied defaults load cleanly.
        load_config_from(tmp.path()).unwrap();
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let defaults = tmp.path().join("defaults");
        let config_dir = tmp.path().join("config");
        fs::create_dir_all(&defaults).unwrap();
        fs::create_dir_all(&config_dir).unwrap();
        fs::copy(defaults_dir().join("league.toml"), defaults.join("league.toml")).unwrap();
        fs::write(config_dir.join("league.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(tmp.path()).expect("should succeed");
        assert!(copied.is_empty());
        let content = fs::read_to_string(config_dir.join("league.toml")).unwrap();
        assert_eq!(content, "# custom\n");
    }

    #[test]
    fn ensure_config_files_no_defaults_dir_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        assert!(ensure_config_files(tmp.path()).unwrap().is_empty());
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ensure_config_files(tmp.path()).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("no defaults/ or config/ directory"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
    }
}
