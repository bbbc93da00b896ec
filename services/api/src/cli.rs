use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gatepass::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gatepass",
    about = "Run the hostel gate-pass service or walk through a sample leave",
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
    /// Walk a holiday and an emergency leave through every approval and gate step
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
    /// JSON roster of students, wardens, security staff, and parents
    #[arg(long)]
    pub(crate) directory: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["gatepass"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn serve_accepts_a_roster_path() {
        let cli = Cli::try_parse_from([
            "gatepass",
            "serve",
            "--port",
            "9090",
            "--directory",
            "roster.json",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(9090));
                assert_eq!(args.directory, Some(PathBuf::from("roster.json")));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn demo_rejects_malformed_dates() {
        assert!(Cli::try_parse_from(["gatepass", "demo", "--start", "14/03/2025"]).is_err());
    }
}
