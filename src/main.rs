//! Football form features CLI
//!
//! Imports the match log, builds the training table and computes fixture
//! features for prediction.

use clap::{Parser, Subcommand};
use football::{Config, Result};

#[derive(Parser)]
#[command(name = "football")]
#[command(about = "Time-aware form features for football match prediction", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Training table commands
    Dataset {
        #[command(subcommand)]
        action: DatasetCommands,
    },
    /// Compute features for a fixture in a given season
    Features {
        /// Home team id or name
        home: String,
        /// Away team id or name
        away: String,
        /// Season the fixture belongs to, e.g. 2015/2016
        #[arg(long)]
        season: String,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import Match.csv and Team.csv into the database
    Import {
        /// Match CSV (defaults to data.matches_csv)
        #[arg(long)]
        matches: Option<String>,
        /// Team CSV (defaults to data.teams_csv)
        #[arg(long)]
        teams: Option<String>,
    },
    /// Show database status
    Status,
    /// List seasons in the database
    Seasons,
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Build the training table and write it as CSV
    Build {
        /// Output path (defaults to data.dataset_path)
        #[arg(long)]
        output: Option<String>,
    },
    /// Label distribution and baseline accuracy for a season split
    Summary {
        /// Season held out for testing
        #[arg(long)]
        test_season: String,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { matches, teams } => commands::data_import(&config, matches, teams),
            DataCommands::Status => commands::data_status(&config),
            DataCommands::Seasons => commands::data_seasons(&config),
        },
        Commands::Dataset { action } => match action {
            DatasetCommands::Build { output } => commands::dataset_build(&config, output),
            DatasetCommands::Summary { test_season } => {
                commands::dataset_summary(&config, &test_season)
            }
        },
        Commands::Features {
            home,
            away,
            season,
            format,
        } => commands::features(&config, &home, &away, &season, format),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use football::data::{load_matches, load_teams, Baselines, Database, DatasetBuilder};
    use football::features::COLUMNS;
    use football::predict::inference::format_features;
    use football::predict::PredictionFeatureBuilder;
    use football::{EntityId, FormError, MatchOutcome, MatchRecord, Team};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data/raw")?;
        std::fs::create_dir_all("data/processed")?;
        println!("Created data/raw and data/processed directories");

        println!("\nNext steps:");
        println!("  1. Copy Match.csv and Team.csv into data/raw/");
        println!("  2. Run 'football data import' to load them");
        println!("  3. Run 'football dataset build' to write the training table");
        println!("  4. Run 'football features \"Team A\" \"Team B\" --season 2015/2016'");

        Ok(())
    }

    pub fn data_import(
        config: &Config,
        matches: Option<String>,
        teams: Option<String>,
    ) -> Result<()> {
        let mut db = Database::open(&config.data.database_path)?;

        let teams_path = teams.unwrap_or_else(|| config.data.teams_csv.clone());
        if std::path::Path::new(&teams_path).exists() {
            let teams = load_teams(&teams_path)?;
            let count = db.upsert_teams(&teams)?;
            println!("Stored {} teams in database", count);
        } else {
            log::warn!("Team file {} not found, skipping team import", teams_path);
        }

        let matches_path = matches.unwrap_or_else(|| config.data.matches_csv.clone());
        let loaded = load_matches(&matches_path)?;
        let count = db.upsert_matches(&loaded.matches)?;
        println!("Stored {} matches in database", count);
        if loaded.skipped > 0 {
            println!("Skipped {} malformed rows", loaded.skipped);
        }

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Teams:    {}", stats.team_count);
        println!("  Matches:  {}", stats.match_count);
        println!("  Seasons:  {}", stats.season_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest.date(), latest.date());
        }

        Ok(())
    }

    pub fn data_seasons(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let seasons = db.seasons()?;

        if seasons.is_empty() {
            println!("No seasons in database. Run 'football data import' first.");
            return Ok(());
        }
        for season in seasons {
            println!("{}", season);
        }
        Ok(())
    }

    pub fn dataset_build(config: &Config, output: Option<String>) -> Result<()> {
        let matches = match_log(config)?;
        let table = DatasetBuilder::build(&matches, &config.features)?;

        let output = output.unwrap_or_else(|| config.data.dataset_path.clone());
        table.write_csv(&output)?;

        println!("Training Table");
        println!("───────────────────────────────");
        println!("  Matches:  {}", matches.len());
        println!("  Rows:     {}", table.emitted());
        println!("  Skipped:  {}", table.skipped);
        println!("  Written:  {}", output);

        Ok(())
    }

    pub fn dataset_summary(config: &Config, test_season: &str) -> Result<()> {
        let matches = match_log(config)?;
        let table = DatasetBuilder::build(&matches, &config.features)?;
        let (train, test) = table.split_by_season(test_season);

        if test.is_empty() {
            return Err(FormError::UnknownSeason(test_season.to_string()));
        }

        let counts = table.label_counts();
        let baselines = Baselines::evaluate(&train, &test);

        println!("Dataset Summary");
        println!("───────────────────────────────");
        println!("  Rows:     {}", table.len());
        for outcome in MatchOutcome::ALL {
            println!(
                "  {} ({}): {}",
                outcome,
                outcome.short_label(),
                counts.get(&outcome).copied().unwrap_or(0)
            );
        }
        println!();
        println!("  Train:    {} rows before {}", train.len(), test_season);
        println!("  Test:     {} rows in {}", test.len(), test_season);
        println!();
        println!("Baselines");
        println!("───────────────────────────────");
        println!("  Always home win:      {:.1}%", baselines.always_home * 100.0);
        println!(
            "  Most frequent ({}):   {:.1}%",
            baselines.most_frequent.short_label(),
            baselines.most_frequent_accuracy * 100.0
        );

        Ok(())
    }

    pub fn features(
        config: &Config,
        home: &str,
        away: &str,
        season: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let home_team = resolve_team(&db, home)?;
        let away_team = resolve_team(&db, away)?;

        let matches = match_log(config)?;
        let builder = PredictionFeatureBuilder::new(&matches, config.features)?;
        let fv = builder.build(season, home_team.id, away_team.id)?;

        match format {
            OutputFormat::Table => {
                print!(
                    "{}",
                    format_features(&fv, &home_team.long_name, &away_team.long_name)
                );
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "home": home_team,
                    "away": away_team,
                    "features": fv,
                });
                let text = serde_json::to_string_pretty(&json)
                    .map_err(|e| FormError::Parse(e.to_string()))?;
                println!("{}", text);
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(std::io::stdout());
                writer.write_record(COLUMNS)?;
                writer.write_record(fv.to_record())?;
                writer.flush()?;
            }
        }

        Ok(())
    }

    /// Matches from the database, or straight from the CSV when nothing is imported
    fn match_log(config: &Config) -> Result<Vec<MatchRecord>> {
        let db = Database::open(&config.data.database_path)?;
        let matches = db.get_all_matches()?;
        if !matches.is_empty() {
            return Ok(matches);
        }

        log::warn!(
            "Database is empty, reading {} directly",
            config.data.matches_csv
        );
        Ok(load_matches(&config.data.matches_csv)?.matches)
    }

    /// Resolve a team by numeric id or by name
    fn resolve_team(db: &Database, query: &str) -> Result<Team> {
        if let Ok(id) = query.trim().parse::<i64>() {
            return match db.get_team(EntityId(id)) {
                Ok(team) => Ok(team),
                // Teams table may be empty; ids still work against the match log
                Err(FormError::UnknownTeam(_)) => Ok(Team {
                    id: EntityId(id),
                    long_name: EntityId(id).to_string(),
                    short_name: String::new(),
                }),
                Err(e) => Err(e),
            };
        }

        db.find_team_by_name(query)?
            .ok_or_else(|| FormError::UnknownTeam(query.to_string()))
    }
}
