use clap::Parser;
use harness::{execute, Cli, DriverOutput, DriverResult};
use std::process::ExitCode;
use tracing::error;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => {
            print!("{}", output.text);
            if output.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("Testsuite aborted: {}", e);
            eprintln!("testsuite: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> DriverResult<DriverOutput> {
    let cwd = toolchain::current_dir()?;
    execute(cli, &cwd).await
}
