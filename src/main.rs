//! ttplan CLI: run planning worlds.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use tt_planner::config::PlannerConfig;
use tt_planner::plan::Mode;
use tt_planner::seeds::{World, bundled_worlds};

#[derive(Parser)]
#[command(name = "ttplan", version, about = "Goal-directed actor simulation")]
struct Cli {
    /// Planner configuration file (TOML). Defaults apply without one.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a world and print the best alternative when it settles.
    Run {
        /// Bundled world id or path to a world file.
        world: String,

        /// `daydreaming` runs free; `performance` replays the world's input
        /// against a paced clock.
        #[arg(long, default_value = "daydreaming")]
        mode: String,

        /// Print the final context as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Parse a world without running it.
    Check {
        /// Bundled world id or path to a world file.
        world: Option<String>,

        /// List the bundled worlds.
        #[arg(long)]
        list: bool,
    },

    /// Print the effective configuration as TOML.
    DumpConfig,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PlannerConfig::load(path)?,
        None => PlannerConfig::default(),
    };

    match cli.command {
        Commands::Run { world, mode, json } => {
            let Some(mode) = Mode::from_label(&mode) else {
                miette::bail!("unknown mode \"{mode}\": use `daydreaming` or `performance`");
            };
            if !matches!(mode, Mode::Daydreaming | Mode::Performance) {
                miette::bail!("worlds run in `daydreaming` or `performance` mode, not `{mode}`");
            }
            let world = World::resolve(&world)?;
            let mut session = world.session(config, mode);
            let cx = session.best();
            let passes = session.main_loop(cx, mode);

            let report = session.report(session.best())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
            } else {
                println!("World \"{}\" ({}), {passes} passes:", world.name, world.id);
                println!("{report}");
            }
        }

        Commands::Check { world, list } => {
            if list || world.is_none() {
                let worlds = bundled_worlds();
                println!("Bundled worlds ({}):", worlds.len());
                for w in &worlds {
                    println!("  {:<10} {}", w.id, w.description);
                }
            }
            if let Some(name) = world {
                let world = World::resolve(&name)?;
                println!("World \"{}\" ({}):", world.name, world.id);
                println!("  start:        {}", world.start);
                match world.horizon {
                    Some(h) => println!("  horizon:      {h}"),
                    None => println!("  horizon:      none"),
                }
                println!("  isa links:    {}", world.isa.len());
                println!("  actors:       {}", world.actors.len());
                println!("  facts:        {}", world.facts.len());
                println!("  goals:        {}", world.goals.len());
                println!("  appointments: {}", world.appointments.len());
                println!("  input units:  {}", world.input.len());
            }
        }

        Commands::DumpConfig => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
