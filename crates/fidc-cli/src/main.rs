//! FIDC CLI - Main entry point

use fidc_cli::api::{ApiClient, ListQuery};
use fidc_cli::config::Config;
use fidc_cli::submission::SubmissionForm;
use fidc_cli::{commands, Cli, Commands, ConfigCommand, ImportsCommand};
use fidc_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // A local .env may carry FIDC_* settings
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Verbose mode logs debug to the console; otherwise only warnings
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let log_config = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("fidc-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> fidc_cli::Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = &cli.server_url {
        config.set("server_url", url)?;
    }

    match &cli.command {
        Commands::Imports { command } => {
            let client = ApiClient::from_config(&config)?;

            match command {
                ImportsCommand::Submit {
                    file,
                    fidc_id,
                    origem,
                    tipo_banco,
                    tipo_cnab,
                    modalidade,
                    cedente_id,
                    format,
                } => {
                    let form = SubmissionForm {
                        file: None,
                        fidc_id: fidc_id.clone(),
                        origem: origem.clone(),
                        tipo_banco: tipo_banco.clone(),
                        tipo_cnab: tipo_cnab.clone(),
                        modalidade: modalidade.clone(),
                        cedente_id: cedente_id.clone(),
                    };
                    commands::imports::submit(&client, file, form, *format).await
                },

                ImportsCommand::List {
                    page,
                    page_size,
                    watch,
                    format,
                } => {
                    let query = ListQuery::new(*page, page_size.unwrap_or(config.page_size));
                    commands::imports::list(&client, query, config.poll_interval(), *watch, *format)
                        .await
                },

                ImportsCommand::Show { id, verify, format } => {
                    commands::imports::show(&client, id, verify.as_deref(), *format).await
                },

                ImportsCommand::Reprocess { id, force, format } => {
                    commands::imports::reprocess(&client, id, *force, *format).await
                },
            }
        },

        Commands::Config { command } => match command {
            ConfigCommand::Get { key } => commands::config::get(&config, key),
            ConfigCommand::Set { key, value } => {
                commands::config::set(&Config::file_path()?, key, value)
            },
            ConfigCommand::Show => commands::config::show(&config, &Config::file_path()?),
        },
    }
}
