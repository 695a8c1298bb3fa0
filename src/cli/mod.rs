pub mod commands;

use crate::chrome::ChromeLauncher;
use crate::config::{Config, ConfigOverrides, PROJECT_CONFIG_FILE, default_config_path};
use crate::output::{self, OutputFormatter, RunSummary, text};
use crate::scrape::{RunOutcome, SnapshotAssembler};
use clap::Parser;
use commands::{Command, ConfigCommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "render-snapshot")]
#[command(version, about = "Snapshot script-rendered listings into a JSON document")]
#[command(
    long_about = "Drives headless Chrome through a configured site, walks its paginated listings, \
                  recovers modal-only detail links and writes one JSON snapshot per run"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to config file (replaces global and project files)")]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Snapshot output path")]
    pub output: Option<PathBuf>,

    #[arg(long, global = true, help = "Run Chrome in headless mode")]
    pub headless: Option<bool>,

    #[arg(long, global = true, help = "Path to Chrome executable")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, global = true, help = "Navigation timeout in seconds")]
    pub timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            headless: self.headless,
            chrome_path: self.chrome_path.clone(),
            timeout: self.timeout,
            output: self.output.clone(),
        }
    }

    fn load_config(&self) -> crate::Result<Config> {
        let config = match self.config {
            Some(ref path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        Ok(config.load_with_overrides(self.overrides()))
    }
}

/// Returns the process exit code. Errors are configuration problems; scrape
/// failures are reported through the snapshot and a `failed` outcome.
pub async fn run() -> crate::Result<i32> {
    let cli = Cli::parse();

    match cli.command.clone().unwrap_or(Command::Run) {
        Command::Run => run_snapshot(&cli).await,
        Command::Config { subcommand } => {
            handle_config_command(subcommand.unwrap_or(ConfigCommand::Show), &cli)
        }
    }
}

async fn run_snapshot(cli: &Cli) -> crate::Result<i32> {
    let config = Arc::new(cli.load_config()?);
    config.validate()?;

    let assembler = SnapshotAssembler::new(config.clone(), ChromeLauncher::new(config));
    let doc = assembler.run().await;

    let summary = RunSummary::new(&doc, assembler.store().path());
    output::print_output(&summary, cli.json)?;

    Ok(if doc.outcome() == RunOutcome::Failed {
        1
    } else {
        0
    })
}

fn handle_config_command(subcommand: ConfigCommand, cli: &Cli) -> crate::Result<i32> {
    match subcommand {
        ConfigCommand::Show => {
            let config = cli.load_config()?;
            output::print_output(&ConfigView(&config), cli.json)?;
        }
        ConfigCommand::Path => {
            let paths = ConfigPaths {
                global: default_config_path()?,
                project: std::env::current_dir()?.join(PROJECT_CONFIG_FILE),
                explicit: cli.config.clone(),
            };
            output::print_output(&paths, cli.json)?;
        }
        ConfigCommand::Check => {
            let config = cli.load_config()?;
            config.validate()?;
            println!(
                "{}",
                text::success(&format!(
                    "Configuration is valid ({} section(s))",
                    config.site.sections.len()
                ))
            );
        }
    }
    Ok(0)
}

struct ConfigView<'a>(&'a Config);

impl OutputFormatter for ConfigView<'_> {
    fn format_text(&self) -> String {
        self.0.summary()
    }

    fn format_json(&self, pretty: bool) -> crate::Result<String> {
        output::to_json(self.0, pretty)
    }
}

#[derive(Serialize)]
struct ConfigPaths {
    global: PathBuf,
    project: PathBuf,
    explicit: Option<PathBuf>,
}

impl OutputFormatter for ConfigPaths {
    fn format_text(&self) -> String {
        let mark = |path: &PathBuf| {
            if path.exists() {
                format!("{}", path.display())
            } else {
                format!("{} (missing)", path.display())
            }
        };

        let mut lines = vec![
            text::key_value("Global", &mark(&self.global)),
            text::key_value("Project", &mark(&self.project)),
        ];
        if let Some(ref explicit) = self.explicit {
            lines.push(text::key_value("Explicit", &mark(explicit)));
        }
        lines.join("\n")
    }

    fn format_json(&self, pretty: bool) -> crate::Result<String> {
        output::to_json(self, pretty)
    }
}
