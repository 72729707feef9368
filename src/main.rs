use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use cvagent::client::{PollConfig, TaskClient};
use cvagent::config::Config;
use cvagent::domain::{DocumentPair, TaskRecord, TaskState};
use cvagent::registry::TaskRegistry;
use cvagent::remote::WorkflowClient;
use cvagent::server;
use cvagent::stream::{extract_from_lines, split_lines};

fn setup_logging(config: &Config, verbose: bool) -> Result<()> {
    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));

    if let Some(log_file) = &config.log_file {
        if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create log directory")?;
        }
        let target = Box::new(
            fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_file)
                .context("Failed to open log file")?,
        );
        builder.target(env_logger::Target::Pipe(target));
    }

    builder.init();
    if let Some(log_file) = &config.log_file {
        info!("Logging initialized, writing to: {}", log_file.display());
    }
    Ok(())
}

async fn run_application(cli: &Cli, config: Config) -> Result<()> {
    match &cli.command {
        Commands::Serve { port } => handle_serve_command(*port, config).await,
        Commands::Submit {
            cv_url,
            report_url,
            server,
            poll_interval,
            max_wait,
            output,
        } => {
            let poll = PollConfig {
                interval: Duration::from_secs(*poll_interval),
                max_wait: Duration::from_secs(*max_wait),
                ..PollConfig::default()
            };
            let documents = DocumentPair::new(cv_url.as_str(), report_url.as_str());
            handle_submit_command(server, &documents, &poll, output.as_ref()).await
        }
        Commands::Status { id, server } => handle_status_command(server, id).await,
        Commands::Extract { file, label } => {
            let label = label.as_deref().unwrap_or(&config.remote.target_label);
            handle_extract_command(file, label)
        }
    }
}

async fn handle_serve_command(port: Option<u16>, mut config: Config) -> Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }

    let source = WorkflowClient::new(config.workflow_config())
        .context("Failed to create workflow client (set WORKFLOW_APP_ID and WORKFLOW_API_KEY)")?;
    let registry = TaskRegistry::new(Arc::new(source), config.registry_config()?);

    let bind_addr = config.server.bind_addr();
    println!("{} {}", "Serving on".green(), bind_addr);
    server::serve(&bind_addr, registry, config.tasks.sweep_interval())
        .await
        .context("Server failed")?;
    Ok(())
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

async fn handle_submit_command(
    server: &str,
    documents: &DocumentPair,
    poll: &PollConfig,
    output: Option<&PathBuf>,
) -> Result<()> {
    let client = TaskClient::new(server)?;

    println!("{} - {}", timestamp(), "Submitting documents...".cyan());
    let task_id = client.create(documents).await.context("Failed to create task")?;
    println!("{} - Task started with ID: {}", timestamp(), task_id.bold());

    let record = client
        .wait_for_terminal(&task_id, poll, |record| match record {
            Some(record) => println!("{} - Status: {:?}", timestamp(), record.status()),
            None => println!("{} - {}", timestamp(), "Task not found yet, retrying".yellow()),
        })
        .await
        .context("Task did not complete")?;

    print_record(&record)?;
    if let Some(path) = output {
        fs::write(path, serde_json::to_string_pretty(&record)?)
            .context(format!("Failed to write {}", path.display()))?;
        println!("Result saved to {}", path.display());
    }

    if let TaskState::Failed { error } = &record.state {
        bail!("Task failed ({:?}): {}", error.kind, error.message);
    }
    Ok(())
}

async fn handle_status_command(server: &str, id: &str) -> Result<()> {
    info!("Getting status for task: {}", id);
    let client = TaskClient::new(server)?;
    match client.status(id).await? {
        Some(record) => print_record(&record),
        None => bail!("Task not found or expired: {}", id),
    }
}

fn handle_extract_command(file: &Path, label: &str) -> Result<()> {
    // Raw bytes: a line that is not valid UTF-8 is skipped, not fatal
    let content = fs::read(file).context(format!("Failed to read {}", file.display()))?;
    let text = extract_from_lines(split_lines(&content), label)
        .context(format!("Nothing extracted for channel {}", label))?;

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(e) => {
            eprintln!("{} {}", "Channel text is not valid JSON:".yellow(), e);
            println!("{}", text);
        }
    }
    Ok(())
}

fn print_record(record: &TaskRecord) -> Result<()> {
    let label = match &record.state {
        TaskState::Completed { .. } => "completed".green(),
        TaskState::Failed { .. } => "failed".red(),
        TaskState::Pending | TaskState::Running => format!("{:?}", record.status()).yellow(),
    };
    println!("{} {} ({})", "Task".bold(), record.id, label);
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Setup logging once the level is known
    setup_logging(&config, cli.is_verbose()).context("Failed to setup logging")?;
    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, config).await.context("Application failed")?;

    Ok(())
}
