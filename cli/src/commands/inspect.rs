use crate::output::{json, text};
use crate::{Cli, OutputFormat};
use anyhow::{Context, Result};
use pbix_inspect::{EngineConfig, InspectConfig, PbixPackage};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::debug;

pub fn run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;

    let pkg = PbixPackage::open(&cli.path, &config)?;
    debug!(entries = pkg.total_files(), "listed container");

    // The listing goes out before the model step so it survives any failure there.
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if cli.format == OutputFormat::Text {
        text::write_listing(&mut handle, &pkg.file_name(), pkg.entries())?;
        handle.flush()?;
    }

    let outcome = if cli.no_model {
        None
    } else {
        let engine = config.engine.build();
        Some(pkg.load_model(&config, engine.as_ref()))
    };

    match cli.format {
        OutputFormat::Text => {
            if let Some(outcome) = &outcome {
                text::write_model_section(&mut handle, outcome.model())?;
            }
        }
        OutputFormat::Json => {
            json::write_json_report(&mut handle, &pkg, outcome.as_ref())?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(cli: &Cli) -> Result<InspectConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path))?;
            InspectConfig::from_json_str(&text)
                .with_context(|| format!("Invalid config: {}", path))?
        }
        None => InspectConfig::default(),
    };

    if let Some(program) = &cli.engine {
        config.engine = EngineConfig {
            program: Some(program.clone()),
            args: cli.engine_args.clone(),
        };
    }

    config.validate()?;
    Ok(config)
}
