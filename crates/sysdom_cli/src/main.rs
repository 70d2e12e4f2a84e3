//! Sysdom CLI: runs the bundled demo designs on the simulation kernel.
//!
//! `sysdom run` elaborates and simulates a demo, printing the issues it
//! reported; `sysdom describe` prints a demo's descriptor tree as JSON; and
//! `sysdom init` writes a starter `sysdom.toml`.

#![warn(missing_docs)]

mod demo;
mod describe;
mod init;
mod project;
mod run;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Sysdom, a discrete-event simulation kernel for hardware models.
#[derive(Parser, Debug)]
#[command(name = "sysdom", version, about = "Sysdom simulation kernel")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable kernel debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a `sysdom.toml` file or the directory holding it.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a starter `sysdom.toml`.
    Init {
        /// Target directory. Defaults to the current directory.
        dir: Option<String>,

        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },
    /// Elaborate and simulate a demo design.
    Run(RunArgs),
    /// Print the descriptor tree of a demo design.
    Describe(DescribeArgs),
}

/// Arguments for `sysdom run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Design to simulate.
    #[arg(value_enum)]
    pub demo: Demo,

    /// Profile from `sysdom.toml` to apply.
    #[arg(short, long)]
    pub profile: Option<String>,

    /// Simulation time limit (e.g. "100ns", "2us").
    #[arg(long)]
    pub time: Option<String>,

    /// Record a VCD waveform to this path.
    #[arg(long)]
    pub vcd: Option<String>,
}

/// Arguments for `sysdom describe`.
#[derive(Parser, Debug)]
pub struct DescribeArgs {
    /// Design to describe.
    #[arg(value_enum)]
    pub demo: Demo,

    /// Print single-line JSON.
    #[arg(long)]
    pub compact: bool,

    /// Print only the descriptor fingerprint.
    #[arg(long)]
    pub fingerprint: bool,
}

/// Bundled designs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// An 8-bit counter on a 10ns clock.
    Counter,
    /// A dual-port block memory driven into a collision.
    Memory,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from the environment.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether debug logging is on.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a configuration file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Init { dir, force } => init::run(dir, force, &global),
        Command::Run(ref args) => run::run(args, &global),
        Command::Describe(ref args) => describe::run(args),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(global.quiet, global.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(global.color)
        .with_target(false)
        .init();
}

/// Issues are rendered separately, so kernel logs stay off unless asked for.
fn default_filter(quiet: bool, verbose: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "off",
        (false, true) => "sysdom_sim=debug,sysdom_cli=debug",
        (false, false) => "sysdom_cli=info",
    }
}
