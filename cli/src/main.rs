mod commands;
mod logging;
mod output;

use clap::{Parser, ValueEnum};
use pbix_inspect::{ConfigError, PackageError};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "pbix-inspect")]
#[command(about = "List the contents of a Power BI .pbix file and its embedded data model")]
#[command(version)]
pub struct Cli {
    #[arg(help = "Path to the .pbix file")]
    pub path: String,
    #[arg(long, short, value_enum, default_value = "text", help = "Output format")]
    pub format: OutputFormat,
    #[arg(
        long,
        value_name = "PROGRAM",
        help = "Engine bridge program used to query the embedded data model"
    )]
    pub engine: Option<String>,
    #[arg(
        long = "engine-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        requires = "engine",
        help = "Extra argument passed to the engine bridge (repeatable)"
    )]
    pub engine_args: Vec<String>,
    #[arg(long, value_name = "PATH", help = "Load settings from a JSON config file")]
    pub config: Option<String>,
    #[arg(long, help = "Only list archive contents; skip the data model")]
    pub no_model: bool,
    #[arg(long, short, help = "Verbose mode: log pipeline stages to stderr")]
    pub verbose: bool,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match commands::inspect::run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_error(err: &anyhow::Error) -> ExitCode {
    if is_input_error(err) {
        ExitCode::from(2)
    } else {
        ExitCode::from(3)
    }
}

fn is_input_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        if let Some(pkg_err) = cause.downcast_ref::<PackageError>() {
            return matches!(pkg_err, PackageError::Input(_));
        }
        cause.is::<ConfigError>()
    })
}
