use clap::{ArgAction, Parser, Subcommand};
use eyre::{bail, ensure};
use rteams::algos::RandomPermutation;
use rteams::checks::{check_team_sizes, ensure_consistent};
use rteams::config::Config;
use rteams::display::{
    display_details, display_empty, display_heatmap, display_stats, display_stragglers,
};
use rteams::engine::{Actor, Engine, MemoryStore};
use rteams::loaders::{Loaded, Source, export};
use rteams::model::{ProjectId, Roster};
use std::path::PathBuf;
use tracing::{Level, info, warn};

#[derive(Parser)]
#[command(version, author, about)]
struct Cli {
    /// Use FILE instead of rteams.toml
    #[arg(short, long, value_name = "FILE", default_value = "rteams.toml")]
    config: PathBuf,
    /// Do not write back results to the database
    #[arg(short = 'n', long)]
    dry_run: bool,
    /// Set verbosity level
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split unassigned invited students into new balanced teams
    Generate,
    /// Seat students without a team in teams which still have room
    Stragglers,
    /// Swap members between unlocked teams to improve their balance
    Rebalance,
    /// Display teams and statistics
    Show,
    /// Write the memberships of the project to a CSV file
    Export { file: PathBuf },
}

fn select_project(roster: &Roster, name: Option<&str>) -> eyre::Result<ProjectId> {
    if let Some(name) = name {
        return match roster.project_by_name(name) {
            Some(p) => Ok(p.id),
            None => bail!("unknown project: {name}"),
        };
    }
    let active = roster
        .projects()
        .iter()
        .filter(|p| p.is_active())
        .collect::<Vec<_>>();
    match active.as_slice() {
        [p] => Ok(p.id),
        [] => bail!("no active project"),
        _ => bail!(
            "several active projects, choose one of {} in configuration",
            active
                .iter()
                .map(|p| p.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load(&cli.config)?;
    let mut source = Source::open(&config).await?;
    let Loaded { roster, mut keys } = source.load().await?;
    ensure_consistent(&roster)?;
    let project = select_project(&roster, config.solver.project.as_deref())?;
    let engine = Engine::new(MemoryStore::new(roster));
    let actor = Actor::System;
    let mut modified = true;
    let mut remaining = 0;
    match cli.command {
        Command::Generate => {
            let mut permutation = match config.solver.seed {
                Some(seed) => RandomPermutation::seeded(seed),
                None => RandomPermutation::from_os_rng(),
            };
            let generation = engine.generate(
                &actor,
                project,
                config.solver.team_size,
                config.solver.max_teams,
                &mut permutation,
            )?;
            if !generation.leftover.is_empty() {
                warn!(
                    leftover = generation.leftover.len(),
                    max_teams = config.solver.max_teams,
                    "some students did not fit in the generated teams"
                );
            }
            remaining = generation.leftover.len();
            info!(
                teams = generation.teams.len(),
                score = generation.report.score_after,
                "teams have been generated"
            );
        }
        Command::Stragglers => {
            let report = engine.auto_assign_stragglers(&actor, project)?;
            display_stragglers(&engine.snapshot()?, &report)?;
            remaining = report.remaining.len();
        }
        Command::Rebalance => {
            let report = engine.rebalance(&actor, project)?;
            println!(
                "Rebalanced in {} passes with {} swaps (score {:.2} -> {:.2})",
                report.passes, report.swaps, report.score_before, report.score_after
            );
        }
        Command::Show => modified = false,
        Command::Export { file } => {
            export(&engine.snapshot()?, project, &file)?;
            modified = false;
        }
    }
    let roster = engine.into_store().into_inner()?;
    if modified && !cli.dry_run {
        source.save(&roster, &mut keys).await?;
    }
    display_details(&roster, project)?;
    display_stats(&roster, project)?;
    display_empty(&roster, project)?;
    display_heatmap(&roster, project)?;
    check_team_sizes(&roster, project);
    ensure!(
        remaining == 0,
        "{remaining} students could not get assigned to any team"
    );
    Ok(())
}
