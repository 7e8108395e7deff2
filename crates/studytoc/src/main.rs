use crate::prelude::*;
use clap::Parser;

mod error;
mod extract;
mod info;
mod prelude;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Recover a table of contents from PDF study material"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// Whether to display additional information.
    #[clap(long, env = "STUDYTOC_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Run the full cascade and print the table of contents
    Extract(crate::extract::ExtractOptions),

    /// Run a single extraction stage
    Stage(crate::extract::StageOptions),

    /// Show what every stage finds in a document
    Info(crate::info::InfoOptions),
}

fn init_logging(global: &Global) {
    let default_filter = if global.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let app = App::parse();

    init_logging(&app.global);
    color_eyre::install()?;

    match app.command {
        SubCommands::Extract(options) => crate::extract::extract(options, app.global).await,
        SubCommands::Stage(options) => crate::extract::stage(options, app.global).await,
        SubCommands::Info(options) => crate::info::info(options, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
