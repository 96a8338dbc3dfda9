use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{info, warn};

use poliscore_browse::config;
use poliscore_browse::fragment;
use poliscore_browse::model::{Bill, EntityKind, Interaction, Legislator, PageEntity};
use poliscore_browse::orchestrator::{FetchError, ListFetcher};
use poliscore_browse::query::QueryState;
use poliscore_browse::resolver::{self, EntityIdentifier, JurisdictionContext};
use poliscore_browse::service::{HttpListService, ListService};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the year-first path for an entity identifier
    Path { id: String },
    /// Resolve a router path segment into a full identifier
    Resolve {
        #[arg(value_enum)]
        kind: Kind,
        path: String,
    },
    /// Page through a list view
    Browse {
        #[arg(value_enum)]
        list: List,
        /// Fragment to seed the sort from, e.g. `index=byrating&order=ascending`
        #[arg(long)]
        fragment: Option<String>,
        /// Number of pages to fetch
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
    /// Page through a legislator's votes and sponsorships
    Interactions {
        legislator_id: String,
        /// Detail-page fragment, e.g. `sort=byimpact&ascending=false`
        #[arg(long)]
        fragment: Option<String>,
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Legislator,
    Bill,
    Party,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Legislator => EntityKind::Legislator,
            Kind::Bill => EntityKind::Bill,
            Kind::Party => EntityKind::Session,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum List {
    Bills,
    Legislators,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let ctx = cfg.context()?;

    match args.command {
        Command::Path { id } => {
            let id = EntityIdentifier::parse(&id)?;
            println!("{}", resolver::identifier_to_path(&id, &ctx));
        }
        Command::Resolve { kind, path } => {
            let id = resolver::path_to_identifier(&path, kind.into(), &ctx)?;
            println!("{}", id);
        }
        Command::Browse {
            list,
            fragment,
            pages,
        } => {
            let state = seed_state(cfg.app.page_size, fragment.as_deref())?;
            let service = HttpListService::from_config(&cfg)?;
            info!(base_url = %cfg.resolved_base_url(), namespace = %ctx.namespace(), "browsing");
            match list {
                List::Bills => browse::<Bill>(&service, state, pages, &ctx).await?,
                List::Legislators => browse::<Legislator>(&service, state, pages, &ctx).await?,
            }
        }
        Command::Interactions {
            legislator_id,
            fragment,
            pages,
        } => {
            let id = resolver::path_to_identifier(&legislator_id, EntityKind::Legislator, &ctx)?;
            let state = seed_state(cfg.app.page_size, fragment.as_deref())?;
            let service = HttpListService::from_config(&cfg)?;
            interactions(&service, &id.to_string(), state, pages).await?;
        }
    }

    Ok(())
}

fn seed_state(page_size: u32, fragment: Option<&str>) -> Result<QueryState> {
    let base = QueryState::default().with_page_size(page_size)?;
    match fragment {
        Some(raw) => Ok(fragment::decode(raw).apply_to(&base)?),
        None => Ok(base),
    }
}

async fn interactions(
    service: &HttpListService,
    legislator_id: &str,
    state: QueryState,
    pages: u32,
) -> Result<()> {
    let mut fetcher = ListFetcher::<Interaction>::interactions(state);
    for _ in 0..pages {
        match fetcher.fetch_next_interactions(service, legislator_id).await {
            Ok(Some(outcome)) => info!(?outcome, "page"),
            Ok(None) => break,
            Err(err) => return Err(err).context("interaction list failed"),
        }
    }

    for item in fetcher.items() {
        let date = item.date.map(|d| d.to_string()).unwrap_or_default();
        let rating = item.rating(None).map(|r| r.to_string()).unwrap_or_default();
        let name = item.bill_name.as_deref().unwrap_or("");
        println!("{}\t{}\t{}\t{}", date, item.bill_id, rating, name);
    }
    println!(
        "# {}",
        fragment::encode(fetcher.state(), None, fragment::Dialect::Detail)
    );
    Ok(())
}

async fn browse<E: PageEntity>(
    service: &dyn ListService<E>,
    state: QueryState,
    pages: u32,
    ctx: &JurisdictionContext,
) -> Result<()> {
    let mut fetcher = ListFetcher::new(state);
    for _ in 0..pages {
        match fetcher.fetch_next(service).await {
            Ok(Some(outcome)) => info!(?outcome, "page"),
            Ok(None) => break,
            Err(FetchError::Cursor(err)) => {
                warn!(%err, "stopping after this page");
                break;
            }
            Err(err) => return Err(err).context("browse failed"),
        }
    }

    for item in fetcher.items() {
        let path = EntityIdentifier::parse(item.id())
            .map(|id| resolver::identifier_to_path(&id, ctx))
            .unwrap_or_default();
        println!("{}\t{}", item.id(), path);
    }
    println!(
        "# {}",
        fragment::encode(fetcher.state(), None, fragment::Dialect::Listing)
    );
    Ok(())
}
