//! # gpc CLI entry point
//!
//! Parses command-line arguments, installs the tracing subscriber and
//! dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gpc_cli::build::{run_build, BuildArgs};
use gpc_cli::config::DEFAULT_CONFIG_FILE;
use gpc_cli::plan::{run_plan, PlanArgs};
use gpc_cli::{GlobalOptions, EXIT_CONFIGURATION};

/// Gaulois-pipe compiler.
///
/// Resolves the transforms and schemas referenced by pipeline configuration
/// documents and compiles every distinct transform exactly once.
#[derive(Parser, Debug)]
#[command(name = "gpc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the build configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output directory, overriding the configuration file.
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan configuration documents and compile the build set.
    Build(BuildArgs),

    /// Scan configuration documents and print the build set.
    Plan(PlanArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let options = GlobalOptions {
        config: cli.config,
        output_dir: cli.output_dir,
    };
    tracing::debug!(config = %options.config.display(), "gpc starting");

    let result = match cli.command {
        Commands::Build(args) => run_build(&args, &options),
        Commands::Plan(args) => run_plan(&args, &options),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_CONFIGURATION)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpc_cli::plan::PlanFormat;

    #[test]
    fn cli_parse_build_defaults() {
        let cli = Cli::try_parse_from(["gpc", "build"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("gpc.yaml"));
        assert!(cli.output_dir.is_none());
        if let Commands::Build(args) = cli.command {
            assert!(args.report.is_none());
            assert!(args.generated_at.is_none());
        } else {
            panic!("expected build");
        }
    }

    #[test]
    fn cli_parse_build_with_all_options() {
        let cli = Cli::try_parse_from([
            "gpc",
            "build",
            "--output-dir",
            "/tmp/out",
            "--report",
            "report.json",
            "--generated-at",
            "2026-01-01T00:00:00Z",
        ])
        .unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
        if let Commands::Build(args) = cli.command {
            assert_eq!(args.report, Some(PathBuf::from("report.json")));
            assert_eq!(args.generated_at.as_deref(), Some("2026-01-01T00:00:00Z"));
        } else {
            panic!("expected build");
        }
    }

    #[test]
    fn cli_parse_plan_format() {
        let cli = Cli::try_parse_from(["gpc", "plan", "--format", "json"]).unwrap();
        if let Commands::Plan(args) = cli.command {
            assert_eq!(args.format, PlanFormat::Json);
        } else {
            panic!("expected plan");
        }
        let cli = Cli::try_parse_from(["gpc", "plan"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Plan(PlanArgs {
                format: PlanFormat::Text,
                ..
            })
        ));
    }

    #[test]
    fn cli_parse_verbose_levels() {
        let cli = Cli::try_parse_from(["gpc", "plan"]).unwrap();
        assert_eq!(cli.verbose, 0);
        let cli = Cli::try_parse_from(["gpc", "-vv", "plan"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn cli_parse_config_option() {
        let cli = Cli::try_parse_from(["gpc", "--config", "build/gpc.yaml", "plan"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("build/gpc.yaml"));
    }

    #[test]
    fn cli_parse_no_subcommand_errors() {
        assert!(Cli::try_parse_from(["gpc"]).is_err());
        assert!(Cli::try_parse_from(["gpc", "deploy"]).is_err());
    }
}
