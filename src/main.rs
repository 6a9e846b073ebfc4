use clap::Parser;
use smart_organizer::cli::{OrganizeCommand, run_cli_with_config};
use smart_organizer::output::OutputFormatter;
use std::path::PathBuf;
use std::process::ExitCode;

/// Sorts the files of a directory into category folders with standard names.
#[derive(Parser, Debug)]
#[command(name = "organize", version, about)]
struct Args {
    /// Directory to organize
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Print what would happen without touching any file
    #[arg(long)]
    dry_run: bool,

    /// Undo every recorded move
    #[arg(long)]
    undo: bool,

    /// Keep running and organize new files as they appear
    #[arg(long)]
    watch: bool,

    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "smart_organizer=debug,organize=debug"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Undo takes precedence over watch
    let command = if args.undo {
        OrganizeCommand::Undo {
            dry_run: args.dry_run,
        }
    } else if args.watch {
        OrganizeCommand::Watch {
            dry_run: args.dry_run,
        }
    } else {
        OrganizeCommand::Organize {
            dry_run: args.dry_run,
        }
    };

    match run_cli_with_config(command, &args.path, args.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}
