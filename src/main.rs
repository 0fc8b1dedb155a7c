use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use postcast::config::{
    DEFAULT_API_BASE_URL, DEFAULT_FEED_LANGUAGE, DEFAULT_PODCASTS_ROUTE, DEFAULT_SITE_URL,
    DEFAULT_USERS_ROUTE, default_cache_file,
};
use postcast::{PostcastApi, ReqwestClient, Settings};

/// Build podcast RSS feeds from the Il Post content API
#[derive(Parser)]
#[command(name = "postcast")]
#[command(about = "Build podcast RSS feeds from the Il Post content API")]
#[command(version)]
struct Args {
    /// Account username
    #[arg(long, env = "ILPOST_USERNAME", hide_env_values = true)]
    username: String,

    /// Account password
    #[arg(long, env = "ILPOST_PASSWORD", hide_env_values = true)]
    password: String,

    /// Base URL of the content API
    #[arg(long, env = "ILPOST_API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: Url,

    /// Public site, used as the channel link of generated feeds
    #[arg(long, env = "ILPOST_BASE_URL", default_value = DEFAULT_SITE_URL)]
    site_url: Url,

    #[arg(long, env = "ILPOST_API_ROUTE_PODCASTS", default_value = DEFAULT_PODCASTS_ROUTE)]
    podcasts_route: String,

    #[arg(long, env = "ILPOST_API_ROUTE_USERS", default_value = DEFAULT_USERS_ROUTE)]
    users_route: String,

    /// Where the login credentials are cached between runs
    #[arg(long, env = "ILPOST_SUBSCRIPTION_CACHE_FILE")]
    cache_file: Option<PathBuf>,

    /// Language announced in generated feeds
    #[arg(long, env = "FEED_LANGUAGE", default_value = DEFAULT_FEED_LANGUAGE)]
    language: String,

    /// Give up on an operation after this many seconds
    #[arg(long, env = "POSTCAST_TIMEOUT_SECS", default_value = "30")]
    timeout: u64,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the podcasts in the catalog
    Shows {
        /// Maximum number of podcasts to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// List the episodes of a podcast, newest first
    Episodes {
        /// Podcast slug
        slug: String,

        /// Maximum number of episodes to list
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show the latest episode of a podcast
    Latest {
        /// Podcast slug
        slug: String,
    },

    /// Render the RSS feed of a podcast
    Feed {
        /// Podcast slug
        slug: String,

        /// Include every episode instead of the latest 20
        #[arg(long)]
        complete: bool,

        /// URL the feed will be served from (emitted as atom:link)
        #[arg(long)]
        self_link: Option<Url>,

        /// Write the feed to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn into_parts(self) -> (Settings, Command) {
        let mut settings = Settings::new(
            SecretString::from(self.username),
            SecretString::from(self.password),
        );
        settings.api_base_url = self.api_base_url;
        settings.site_url = self.site_url;
        settings.podcasts_route = self.podcasts_route;
        settings.users_route = self.users_route;
        settings.cache_file = self.cache_file.unwrap_or_else(default_cache_file);
        settings.feed_language = self.language;
        settings.request_timeout = Duration::from_secs(self.timeout);

        (settings, self.command)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let (settings, command) = args.into_parts();
    info!(cache_file = %settings.cache_file.display(), "Starting postcast");

    let client =
        ReqwestClient::with_timeout(settings.request_timeout).context("Failed to build HTTP client")?;
    let api = PostcastApi::new(client, settings).context("Invalid API URL")?;

    api.login().await.context("Failed to log in")?;

    match command {
        Command::Shows { limit } => {
            let shows = api.list_shows(limit).await.context("Failed to list podcasts")?;
            print_json(&shows)?;
        }

        Command::Episodes { slug, limit } => {
            let episodes = api
                .list_episodes(&slug, limit)
                .await
                .with_context(|| format!("Failed to list episodes of '{slug}'"))?;
            print_json(&episodes)?;
        }

        Command::Latest { slug } => {
            let episode = api
                .latest_episode(&slug)
                .await
                .with_context(|| format!("Failed to fetch the latest episode of '{slug}'"))?;
            print_json(&episode)?;
        }

        Command::Feed {
            slug,
            complete,
            self_link,
            output,
        } => {
            let xml = api
                .render_feed(&slug, complete, self_link)
                .await
                .with_context(|| format!("Failed to build the feed of '{slug}'"))?;

            match output {
                Some(path) => {
                    std::fs::write(&path, xml)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Feed written");
                }
                None => println!("{xml}"),
            }
        }
    }

    Ok(())
}
