use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use deal_personalizer::audience::{
    record_enrichment, resolve_visitor, AudienceType, VisitorSignals, DEFAULT_ENRICHMENT_STRENGTH,
};
use deal_personalizer::config::{Config, ConfigOverrides};
use deal_personalizer::deals::RecommendationsPage;
use deal_personalizer::display::{
    DirectRecommendationSource, DisplayController, FetchOutcome, HttpRecommendationSource,
    RecommendationSource,
};
use deal_personalizer::enrichment::{BrandEnrichment, BRAND_ENRICHMENT_CATEGORY};
use deal_personalizer::ordering::build_order_by_clause;
use deal_personalizer::output::csv::page_to_csv;
use deal_personalizer::output::render_json;
use deal_personalizer::output::table::{render_page_table, render_signals_table};
use deal_personalizer::server::run_server;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "deal-personalizer",
    about = "Audience-ranked deal recommendations"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Content API base URL
    #[arg(long = "api-url")]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve the recommendations API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Resolve audience and brand enrichments from a stored visitor record
    Resolve {
        #[arg(long)]
        visitor: Option<PathBuf>,
    },
    /// Record an enrichment visit into a stored visitor record
    Track {
        #[arg(long)]
        visitor: PathBuf,
        #[arg(long, default_value = BRAND_ENRICHMENT_CATEGORY)]
        category: String,
        #[arg(long)]
        value: String,
        #[arg(long, default_value_t = DEFAULT_ENRICHMENT_STRENGTH)]
        strength: f64,
    },
    /// Print the order-by clause for an audience and brand scores
    OrderBy {
        #[arg(long, default_value = "everyone")]
        audience: String,
        /// Brand score as name=score, repeatable
        #[arg(long = "brand")]
        brands: Vec<String>,
    },
    /// Fetch recommendations for a visitor and show one page
    Recommend {
        #[arg(long)]
        visitor: Option<PathBuf>,
        /// Query a running server instead of the content API directly
        #[arg(long)]
        server: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long = "per-page")]
        per_page: Option<usize>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_env();
    let per_page = match &cli.command {
        Commands::Recommend { per_page, .. } => *per_page,
        _ => None,
    };
    config.apply_overrides(ConfigOverrides {
        api_base_url: cli.api_url.clone(),
        deals_per_page: per_page,
    });

    match &cli.command {
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, addr).await?;
        }
        Commands::Resolve { visitor } => {
            let raw = read_visitor_record(visitor.as_deref())?;
            let signals = resolve_visitor(raw.as_deref());
            print_signals(&signals, cli.output)?;
        }
        Commands::Track {
            visitor,
            category,
            value,
            strength,
        } => {
            let raw = if visitor.exists() {
                read_visitor_record(Some(visitor.as_path()))?
            } else {
                None
            };
            let updated = record_enrichment(raw.as_deref(), category, value, *strength);
            fs::write(visitor, &updated)
                .with_context(|| format!("failed writing visitor record: {}", visitor.display()))?;
            print_signals(&resolve_visitor(Some(updated.as_str())), cli.output)?;
        }
        Commands::OrderBy { audience, brands } => {
            let audience = AudienceType::from_str(audience)?;
            let enrichments = brands
                .iter()
                .map(String::as_str)
                .map(parse_brand_arg)
                .collect::<Result<Vec<_>>>()?;
            println!("{}", build_order_by_clause(audience, &enrichments));
        }
        Commands::Recommend {
            visitor,
            server,
            page,
            ..
        } => {
            let raw = read_visitor_record(visitor.as_deref())?;
            let source: Box<dyn RecommendationSource> = match server {
                Some(url) => Box::new(HttpRecommendationSource::new(url)),
                None => Box::new(DirectRecommendationSource::new(config.content.clone())),
            };

            let mut controller = DisplayController::new(config.display.deals_per_page);
            controller.resolve(raw.as_deref());
            controller.load(source.as_ref()).await;
            if let Some(FetchOutcome::Failed(reason)) = controller.outcome() {
                warn!("showing empty recommendations: {reason}");
            }
            controller.go_to_page(*page);
            let view = controller
                .page()
                .ok_or_else(|| anyhow!("recommendations were not loaded"))?;
            print_page(&view, cli.output)?;
        }
        Commands::Config { init, show } => {
            handle_config_command(*init, *show, &config, &config_path)?;
        }
    }

    Ok(())
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &Path,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

/// Reads the stored visitor record; a missing path means no record.
fn read_visitor_record(path: Option<&Path>) -> Result<Option<String>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading visitor record: {}", path.display()))?;
    Ok(Some(raw))
}

fn parse_brand_arg(raw: &str) -> Result<BrandEnrichment> {
    let (name, score) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("brand must be name=score, got {raw}"))?;
    let score: f64 = score
        .trim()
        .parse()
        .with_context(|| format!("invalid score for brand {name}"))?;
    Ok(BrandEnrichment::brand(name.trim(), score))
}

fn print_signals(signals: &VisitorSignals, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_signals_table(signals)),
        OutputFormat::Json => println!("{}", render_json(signals)?),
        OutputFormat::Csv => {
            warn!("CSV output for resolve not implemented, using JSON");
            println!("{}", render_json(signals)?);
        }
    }
    Ok(())
}

fn print_page(page: &RecommendationsPage, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_page_table(page)),
        OutputFormat::Json => println!("{}", render_json(page)?),
        OutputFormat::Csv => print!("{}", page_to_csv(page)?),
    }
    Ok(())
}
