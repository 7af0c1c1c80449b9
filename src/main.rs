mod config;
mod dataset;
mod filter;
mod github;
mod harvest;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::{info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

/// PR Harvester — collects repository and pull request metadata from the
/// GitHub GraphQL API into JSON datasets, then filters them.
#[derive(Parser, Debug)]
#[command(name = "pr-harvester", version, about)]
struct Cli {
    /// Path to the TOML config file (defaults to .pr-harvester.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List top repositories, fetch their pull requests and write the combined dataset
    Fetch {
        #[arg(short, long, default_value = "repos_and_prs.json")]
        output: PathBuf,

        /// Where the partial dataset goes if the API fails unrecoverably
        #[arg(long, default_value = "partial_repos_and_prs.json")]
        recovery: PathBuf,
    },
    /// Keep reviewed, long-lived pull requests and repositories with enough of them
    Filter {
        #[arg(short, long, default_value = "repos_and_prs.json")]
        input: PathBuf,

        #[arg(short, long, default_value = "filtered_prs.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Fetch { output, recovery } => {
            let token = config
                .github_token()
                .ok_or(github::GitHubError::MissingToken)?;
            let transport = github::HttpTransport::new(&config.github, token);

            let progress: harvest::ProgressCallback = Box::new(|event: harvest::RepositoryProgress| {
                let line = format!("Processed {} of {} repositories ({})", event.processed, event.total, event.repository);
                if event.skipped {
                    eprintln!("{}", line.yellow());
                } else {
                    eprintln!("{}", line.dimmed());
                }
            });

            let summary = harvest::run(&config, &transport, &output, &recovery, Some(&progress))
                .instrument(info_span!("fetch", output = %output.display()))
                .await?;
            println!(
                "{} {} repositories, {} pull requests saved to {}",
                "Done:".green().bold(),
                summary.repositories,
                summary.pull_requests,
                output.display()
            );
        }
        Command::Filter { input, output } => {
            let _span = info_span!("filter", input = %input.display()).entered();
            let criteria = filter::Criteria::from(&config.filter);

            let summary = filter::run(&input, &output, &criteria)?;
            println!(
                "{} {} repositories, {} pull requests saved to {}",
                "Filtered:".green().bold(),
                summary.repositories,
                summary.pull_requests,
                output.display()
            );
        }
    }

    Ok(())
}
