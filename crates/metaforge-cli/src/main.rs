mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "metaforge",
    version,
    about = "Workspace bootstrap and layer synchronization for OpenEmbedded builds"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, default_value_t = false, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Synchronize layer checkouts and write the build configuration.
    Setup {
        /// Target machine identifier.
        #[arg(short, long)]
        machine: String,
        /// Target distribution identifier.
        #[arg(short, long)]
        distro: String,
        /// Directory the layer repositories are cloned into.
        #[arg(short, long, default_value = "sources")]
        sources: PathBuf,
        /// Build directory the configuration is written under.
        #[arg(short, long, default_value = "build")]
        build: PathBuf,
        /// Flat layer manifest (defaults to <sources>/layers.txt).
        #[arg(short, long)]
        layers: Option<PathBuf>,
        /// Structured JSON manifest document.
        #[arg(long)]
        bblayers: Option<PathBuf>,
        /// Overwrite existing configuration files.
        #[arg(short, long, default_value_t = false)]
        overwrite: bool,
        /// Per-git-operation timeout in seconds.
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Show the corrective actions a setup run would take, without executing
    /// them.
    Plan {
        /// Directory the layer repositories are cloned into.
        #[arg(short, long, default_value = "sources")]
        sources: PathBuf,
        /// Flat layer manifest (defaults to <sources>/layers.txt).
        #[arg(short, long)]
        layers: Option<PathBuf>,
        /// Structured JSON manifest document.
        #[arg(long)]
        bblayers: Option<PathBuf>,
    },
    /// Run diagnostic checks on the host and workspace.
    Doctor {
        /// Directory the layer repositories are cloned into.
        #[arg(short, long, default_value = "sources")]
        sources: PathBuf,
        /// Build directory the configuration is written under.
        #[arg(short, long, default_value = "build")]
        build: PathBuf,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Generate man pages in the specified directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("METAFORGE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time();
    if cli.json {
        // Keep stdout clean for the machine-readable report.
        subscriber.with_writer(std::io::stderr).init();
    } else {
        subscriber.init();
    }

    metaforge_core::install_signal_handler();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Setup {
            machine,
            distro,
            sources,
            build,
            layers,
            bblayers,
            overwrite,
            timeout,
        } => commands::setup::run(&commands::setup::SetupArgs {
            machine,
            distro,
            sources,
            build,
            layers,
            bblayers,
            overwrite,
            timeout,
            json: json_output,
        }),
        Commands::Plan {
            sources,
            layers,
            bblayers,
        } => commands::plan::run(
            &sources,
            layers.as_deref(),
            bblayers.as_deref(),
            json_output,
        ),
        Commands::Doctor { sources, build } => commands::doctor::run(&sources, &build, json_output),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("configuration error:") {
                EXIT_CONFIG_ERROR
            } else if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
