use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use log::{LevelFilter, debug, error};
use std::path::PathBuf;
use vuebr_news::app::App;
use vuebr_news::config::Config;
use vuebr_news::content::IssueNumber;
use vuebr_news::logging::setup_logging;
use vuebr_news::routes::{generate_site, issue_routes};

#[derive(Parser, Debug)]
#[command(name = "vuebr-news", version, about = "Vue.js Brasil community news: feed, routes and podcasts")]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Also write log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.parse::<LevelFilter>().map_err(|_| format!("unknown log level '{}'", s))
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the RSS feed
    Feed,
    /// Print the pre-rendered issue routes
    Routes,
    /// Write feed.xml and routes.json into a directory
    Generate {
        #[arg(long, default_value = "dist")]
        out_dir: PathBuf,
    },
    /// Show the current podcast, optionally moving the cursor first
    Podcasts {
        #[arg(long, default_value_t = 0)]
        next: usize,
        #[arg(long, default_value_t = 0)]
        previous: usize,
    },
    /// Show a single issue
    Issue { number: u32 },
    /// Load everything and dump the store state as JSON
    State,
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Feed => {
            println!("{}", app.feed.render().await?);
        }
        Command::Routes => {
            app.store.get_issues().await?;
            for route in issue_routes(&app.store.issues()) {
                println!("{}", route);
            }
        }
        Command::Generate { out_dir } => {
            let report = generate_site(app, &out_dir).await?;
            println!(
                "Wrote {} and {} ({} routes)",
                report.feed_path.display(),
                report.routes_path.display(),
                report.routes.len()
            );
        }
        Command::Podcasts { next, previous } => {
            app.store.get_podcasts().await?;
            for _ in 0..next {
                app.store.play_next_podcast()?;
            }
            for _ in 0..previous {
                app.store.play_previous_podcast()?;
            }
            for podcast in app.store.podcasts() {
                let marker = if podcast.issue_number() == app.store.current_podcast_number() { ">" } else { " " };
                println!("{} #{} {}", marker, podcast.issue_number(), podcast.name().unwrap_or("(untitled)"));
            }
            match app.store.current_podcast() {
                Some(podcast) => println!("\n{}", podcast),
                None => println!("\nNo podcast selected."),
            }
        }
        Command::Issue { number } => {
            app.store.get_issues().await?;
            let issue = app
                .store
                .issue(IssueNumber::new(number))
                .ok_or_else(|| anyhow!("Issue #{} not found", number))?;
            println!("{}", issue);
        }
        Command::State => {
            let (issues, podcasts) =
                futures::future::join(app.store.get_issues(), app.store.get_podcasts()).await;
            issues?;
            podcasts?;
            println!("{}", serde_json::to_string_pretty(&app.store.snapshot())?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level, cli.log_file.as_deref()).context("Failed to set up logging")?;

    if std::env::var("APP_ENV").map_or(true, |env| env != "production") {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env loaded: {}", e),
        }
    }

    let config = Config::from_env().context("Invalid configuration")?;
    let app = App::from_config(config).context("Failed to create content API client")?;

    if let Err(e) = run(&app, cli.command).await {
        error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
