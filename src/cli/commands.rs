use clap::Subcommand;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(about = "Scrape the configured site and write the snapshot (default)")]
    Run,

    #[command(about = "Inspect the effective configuration")]
    Config {
        #[command(subcommand)]
        subcommand: Option<ConfigCommand>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    #[command(about = "Show effective configuration (default)")]
    Show,

    #[command(about = "Show global and project config file paths")]
    Path,

    #[command(about = "Validate configuration without launching Chrome")]
    Check,
}
