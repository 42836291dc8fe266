mod common;
mod logic;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use geoquiz_game::{FileStore, GameConfig, RegionCatalogue, StatisticsService};
use std::fs::{self, File};
use std::io::{BufWriter, Write, stdout};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

use common::{parse_filter, split_csv};
use logic::{
    RunReport, build_report, load_replay, resolve_seeds, run_replay, run_simulation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Play seeded rounds with a simulated player
    Simulate,
    /// Grade a recorded click file
    Replay,
    /// Print the stored statistics
    Report,
    /// Write the statistics export document
    Export,
    /// Wipe all stored statistics
    Reset,
}

#[derive(Debug, Parser)]
#[command(name = "geoquiz-tester", version = "0.1.0")]
#[command(about = "Simulated play, replays and statistics upkeep for the GeoQuiz engine")]
struct Args {
    /// What to do
    #[arg(long, value_enum, default_value_t = Mode::Simulate)]
    mode: Mode,

    /// GeoJSON catalogue of ORP regions
    #[arg(long, default_value = "geoquiz-game/data/sample_orp.geojson")]
    catalogue: PathBuf,

    /// Directory holding the statistics blob
    #[arg(long, default_value = "target/geoquiz-stats")]
    store: PathBuf,

    /// Optional engine configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rounds per simulated run
    #[arg(long, default_value_t = 20)]
    rounds: u32,

    /// Seeds to run (comma-separated)
    #[arg(long, default_value = "1337")]
    seeds: String,

    /// Probability that the simulated player finds the target
    #[arg(long, default_value_t = 0.75, value_parser = parse_skill)]
    skill: f64,

    /// Region filter: all, group:<name> or district:<name>
    #[arg(long, default_value = "all")]
    filter: String,

    /// Click file for replay mode
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Number of recent sessions to include in reports
    #[arg(long, default_value_t = 10)]
    recent: usize,

    /// Output report format
    #[arg(long, default_value = "console")]
    #[arg(value_parser = ["json", "markdown", "console"])]
    report: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Optional path to write the report (or export) instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Confirm destructive operations
    #[arg(long)]
    yes: bool,
}

fn parse_skill(raw: &str) -> Result<f64, String> {
    let skill: f64 = raw
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if (0.0..=1.0).contains(&skill) {
        Ok(skill)
    } else {
        Err(format!("skill must be between 0 and 1, got {skill}"))
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let store = FileStore::new(&args.store);
    let mut stats = StatisticsService::open(store, config.stats.clone())
        .with_context(|| {
            format!("failed to open statistics in {}", args.store.display())
        })?;

    match args.mode {
        Mode::Simulate | Mode::Replay => {
            if args.report == "console" {
                announce_banner();
            }
            let start_time = Instant::now();
            let catalogue = Rc::new(load_catalogue(&args.catalogue)?);
            let filter = parse_filter(&args.filter)?;
            let runs = if args.mode == Mode::Simulate {
                let seeds = resolve_seeds(&split_csv(&args.seeds))?;
                let mut runs = Vec::with_capacity(seeds.len());
                for seed in seeds {
                    runs.push(run_simulation(
                        Rc::clone(&catalogue),
                        &config.scoring,
                        &filter,
                        seed,
                        args.rounds,
                        args.skill,
                        &mut stats,
                    )?);
                }
                runs
            } else {
                let path = args
                    .replay
                    .as_deref()
                    .context("--replay <FILE> is required in replay mode")?;
                let clicks = load_replay(path)?;
                let label = path.display().to_string();
                vec![run_replay(
                    &label,
                    &catalogue,
                    &config.scoring,
                    &filter,
                    &clicks,
                    &mut stats,
                )?]
            };
            log::info!(
                "finished {} run(s) in {:?}",
                runs.len(),
                start_time.elapsed()
            );
            write_reports(args, &build_report(runs, &stats, args.recent))
        }
        Mode::Report => write_reports(args, &build_report(Vec::new(), &stats, args.recent)),
        Mode::Export => {
            let document = stats.export()?;
            let path = args
                .output
                .clone()
                .unwrap_or_else(|| args.store.join(&document.file_name));
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            fs::write(&path, &document.contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Exported statistics to {}", path.display());
            Ok(())
        }
        Mode::Reset => {
            if !args.yes {
                bail!("refusing to reset statistics without --yes");
            }
            let token = stats.request_reset();
            stats.confirm_reset(token)?.require_durable()?;
            println!("{}", "Statistics reset".yellow());
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GameConfig> {
    let Some(path) = path else {
        return Ok(GameConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    GameConfig::from_json(&raw).with_context(|| format!("invalid config {}", path.display()))
}

fn load_catalogue(path: &Path) -> Result<RegionCatalogue> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalogue {}", path.display()))?;
    let catalogue = RegionCatalogue::from_geojson(&raw)
        .with_context(|| format!("invalid catalogue {}", path.display()))?;
    log::debug!("loaded {} regions from {}", catalogue.len(), path.display());
    Ok(catalogue)
}

fn announce_banner() {
    println!("{}", "🗺️  GeoQuiz Tester".bright_cyan().bold());
    println!("{}", "==================".cyan());
}

fn write_reports(args: &Args, report: &RunReport) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report.as_str() {
        "json" => logic::reports::generate_json_report(output_target.writer(), report)?,
        "markdown" => logic::reports::generate_markdown_report(output_target.writer(), report)?,
        _ => logic::reports::generate_console_report(output_target.writer(), report)?,
    }

    output_target.flush_inner()?;
    if report.runs.iter().any(|run| !run.durable) {
        log::warn!(
            "some results were not persisted to {}",
            args.store.display()
        );
    }
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../geoquiz-game/data/sample_orp.geojson"
    );

    fn base_args(store: &Path) -> Args {
        Args {
            mode: Mode::Simulate,
            catalogue: PathBuf::from(SAMPLE),
            store: store.to_path_buf(),
            config: None,
            rounds: 6,
            seeds: "1,2".to_string(),
            skill: 0.8,
            filter: "all".to_string(),
            replay: None,
            recent: 10,
            report: "json".to_string(),
            verbose: false,
            output: None,
            yes: false,
        }
    }

    #[test]
    fn parse_skill_enforces_unit_range() {
        assert_eq!(parse_skill("0.5"), Ok(0.5));
        assert!(parse_skill("1.5").is_err());
        assert!(parse_skill("lots").is_err());
    }

    #[test]
    fn simulate_writes_json_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.json");
        let args = Args {
            output: Some(output.clone()),
            ..base_args(&dir.path().join("store"))
        };
        run(&args).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(output).unwrap()).unwrap();
        assert_eq!(value["runs"].as_array().unwrap().len(), 2);
        assert_eq!(value["overall"]["totalAttempts"], 12);
        assert_eq!(value["recentSessions"].as_array().unwrap().len(), 2);
        assert!(dir.path().join("store/geo_quiz_statistics.json").exists());
    }

    #[test]
    fn reset_requires_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            mode: Mode::Reset,
            ..base_args(dir.path())
        };
        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("--yes"));

        let confirmed = Args { yes: true, ..args };
        run(&confirmed).unwrap();
    }

    #[test]
    fn export_defaults_into_the_store_directory() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            mode: Mode::Export,
            ..base_args(dir.path())
        };
        run(&args).unwrap();
        let exported: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("geo-quiz-stats-")
            })
            .collect();
        assert_eq!(exported.len(), 1);
    }

    #[test]
    fn replay_mode_needs_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            mode: Mode::Replay,
            ..base_args(dir.path())
        };
        assert!(run(&args).unwrap_err().to_string().contains("--replay"));
    }

    #[test]
    fn out_of_range_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        fs::write(&config, r#"{ "scoring": { "precision_span_km": 0 } }"#).unwrap();
        let args = Args {
            config: Some(config),
            ..base_args(&dir.path().join("store"))
        };
        let message = format!("{:#}", run(&args).unwrap_err());
        assert!(
            message.contains("scoring.precision_span_km must be a positive number")
        );
        assert!(!dir.path().join("store").exists());
    }

    #[test]
    fn markdown_report_of_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.md");
        let args = Args {
            mode: Mode::Report,
            report: "markdown".to_string(),
            output: Some(output.clone()),
            ..base_args(&dir.path().join("store"))
        };
        run(&args).unwrap();
        let content = fs::read_to_string(output).unwrap();
        assert!(content.contains("# GeoQuiz Statistics"));
        assert!(content.contains("- **Attempts:** 0"));
    }
}
