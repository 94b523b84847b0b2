use crate::demo::{run_demo, run_health_score, DemoArgs, HealthScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use leadmarket::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Lead Marketplace Service",
    about = "Run and demonstrate the lead marketplace lifecycle and trust engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Compute a broker health score offline from summary figures
    Health(HealthScoreArgs),
    /// Run an end-to-end CLI demo covering lead sale, refund, and scoring
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Health(args) => run_health_score(args),
        Command::Demo(args) => run_demo(args),
    }
}
