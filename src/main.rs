use anyhow::Result;
use clap::{Parser, Subcommand};
use dota_coach_lib::{
    audience::Role,
    catalog::Catalog,
    config, db,
    dispatch::format_clock,
    rules::{Category, FireSchedule, GameSpeed},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dota-coach-live", version, about = "Timed coaching hints for Dota 2")]
struct Cli {
    /// Config directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow the live tick feed and print hints as they fire
    Live,
    /// Run a recorded tick feed through the engine
    Replay {
        file: PathBuf,
        /// Do not record this run in the match history
        #[arg(long)]
        no_history: bool,
    },
    /// Validate a rule catalog (the configured one when omitted)
    Check {
        catalog: Option<PathBuf>,
    },
    /// List the hints a role would get, in firing order
    Preview {
        #[arg(long)]
        role: Role,
        #[arg(long)]
        hero: Option<String>,
        #[arg(long, default_value = "normal")]
        speed: GameSpeed,
    },
    /// Show recently recorded matches
    History {
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        tracing::error!("{:#}", e);
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let app_dir = cli.config_dir.unwrap_or_else(config::app_dir);
    let cfg = config::load_or_default(&app_dir)?;

    match cli.command {
        Commands::Live => {
            dota_coach_lib::init_logging(&app_dir.join("logs"), &cfg.log_filter)?;
            dota_coach_lib::run_live(cfg, &app_dir).await
        }
        Commands::Replay { file, no_history } => {
            dota_coach_lib::init_logging(&app_dir.join("logs"), &cfg.log_filter)?;
            let mut cfg = cfg;
            if no_history {
                cfg.record_history = false;
            }
            dota_coach_lib::run_replay(cfg, &app_dir, file).await
        }
        Commands::Check { catalog } => check(catalog.or(cfg.catalog_path)),
        Commands::Preview { role, hero, speed } => preview(cfg.catalog_path, role, hero, speed),
        Commands::History { limit } => history(&app_dir, limit),
    }
}

fn check(path: Option<PathBuf>) -> Result<()> {
    let catalog = Catalog::load_or_builtin(path.as_deref())?;
    let source = path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in catalog".to_owned());
    println!("{}: {} rules OK", source, catalog.len());
    for category in Category::ALL {
        let n = catalog.in_category(category).len();
        if n > 0 {
            println!("  {:<14} {}", category.as_str(), n);
        }
    }
    Ok(())
}

fn describe(schedule: &FireSchedule) -> String {
    match schedule {
        FireSchedule::Once { at } => format_clock(*at),
        FireSchedule::List { times } => times.iter().map(|t| format_clock(*t)).collect::<Vec<_>>().join(", "),
        FireSchedule::Repeating { first, interval, limit } => {
            let mut s = format!("{} every {}s", format_clock(*first), interval);
            if let Some(n) = limit {
                s.push_str(&format!(" (x{})", n));
            }
            s
        }
    }
}

fn preview(catalog_path: Option<PathBuf>, role: Role, hero: Option<String>, speed: GameSpeed) -> Result<()> {
    let catalog = Catalog::load_or_builtin(catalog_path.as_deref())?;
    let mut rules = catalog.preview(role, hero.as_deref());
    rules.sort_by_key(|r| r.schedule_for(speed).first_time());

    for rule in rules {
        let gate = match &rule.position {
            Some(p) => format!(" [{}]", p.area),
            None => String::new(),
        };
        println!(
            "{:<28} {:<12} {}{}\n    {}",
            rule.id,
            rule.category.as_str(),
            describe(rule.schedule_for(speed)),
            gate,
            rule.payload.text,
        );
    }
    Ok(())
}

fn history(app_dir: &std::path::Path, limit: u32) -> Result<()> {
    let path = dota_coach_lib::history_db_path(app_dir);
    if !path.exists() {
        println!("No matches recorded yet.");
        return Ok(());
    }
    for m in db::match_history(&path, limit)? {
        println!(
            "#{:<4} {:<20} {:<8} {:<8} {:<7} {:>7}  {} hints",
            m.id,
            m.hero,
            m.role,
            m.team,
            m.speed,
            m.last_clock.map(format_clock).unwrap_or_else(|| "-".to_owned()),
            m.hints_fired,
        );
    }
    Ok(())
}
