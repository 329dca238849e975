use clap::Parser;
use privatrente::api::{self, ApiError, Cli, Command};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Project(args) => api::run_project(args).map(|json| println!("{json}")),
        Command::Solve(args) => api::run_solve(args).map(|json| println!("{json}")),
        Command::Serve(args) => api::run_http_server(args.port)
            .await
            .map_err(ApiError::from),
    };

    if let Err(e) = outcome {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    // stdout carries the JSON output, so logs go to stderr.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
