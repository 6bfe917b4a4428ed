use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use comparables_core::{
    clean_for_display, describe, dvf_url, map_center, marker_label, median_by_rooms, median_price,
    ComparableOptions, ComparableSet, CsvSource, Metric, PreparationOptions, PropertyRecord,
    RecordSource, Session, SkippedRow, SourceLocation, TransactionFilter, DEFAULT_TOP_K,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "comparables", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Local path or URL of a DVF CSV extract, gzipped or plain.
    #[arg(long, env = "COMPARABLES_SOURCE")]
    source: Option<String>,

    /// Year of the public DVF extract, used when no source is given.
    #[arg(long, env = "COMPARABLES_YEAR", default_value = "2022")]
    year: u16,

    /// Department of the public DVF extract, used when no source is given.
    #[arg(long, env = "COMPARABLES_DEPARTMENT", default_value = "75")]
    department: String,
}

#[derive(Subcommand)]
enum Command {
    /// List held-out properties that can be priced.
    Queries {
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Estimate a property's price from its most similar past sales.
    Estimate {
        /// Held-out property id; defaults to the first selectable one.
        #[arg(long)]
        query: Option<String>,
        /// Number of comparables to keep.
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,
        /// Print the comparable set as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Summary statistics of the transactions.
    Stats {
        /// Exclude non-sale transactions.
        #[arg(long, default_value_t = false)]
        only_sales: bool,
        /// Case-insensitive street name pattern.
        #[arg(long)]
        street: Option<String>,
        /// Quantity charted per room count.
        #[arg(long, value_enum, default_value_t = MetricArg::Price)]
        metric: MetricArg,
    },
    /// Map center and marker labels of the cleaned sales.
    Map {
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Price,
    Surface,
}

impl From<MetricArg> for Metric {
    fn from(value: MetricArg) -> Self {
        match value {
            MetricArg::Price => Metric::Price,
            MetricArg::Surface => Metric::Surface,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let identifier = cli
        .source
        .clone()
        .unwrap_or_else(|| dvf_url(cli.year, &cli.department));
    let location = SourceLocation::parse(&identifier)
        .with_context(|| format!("invalid source `{identifier}`"))?;
    let source = CsvSource::new(location);

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        source = %source.describe(),
        "comparables boot"
    );

    match cli.command {
        Command::Queries { limit } => {
            let session = open_session(&source).await?;
            for id in session.query_ids(limit) {
                println!("{id}");
            }
        }
        Command::Estimate { query, top_k, json } => {
            let mut session = open_session(&source).await?;
            let query_id = match query {
                Some(id) => id,
                None => session
                    .query_ids(1)
                    .first()
                    .map(|id| id.to_string())
                    .context("no held-out property is available to price")?,
            };

            let set = session
                .estimate(&query_id, &ComparableOptions { top_k })
                .with_context(|| format!("unable to price property {query_id}"))?
                .clone();
            info!(
                session = %session.id(),
                query = %query_id,
                comparables = set.len(),
                "comparables ranked"
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&set)?);
            } else if let Some(record) = session.query(&query_id) {
                print_query(record);
                print_comparable_set(&set);
            }
        }
        Command::Stats {
            only_sales,
            street,
            metric,
        } => {
            let records = load_records(&source).await?;
            let filter = TransactionFilter {
                only_sales,
                street_pattern: street,
            };
            let filtered = filter.apply(&records)?;

            if let Some(median) = median_price(&records) {
                println!("Median price: {median:.0} €");
            }
            println!("Number of rows: {}", filtered.len());

            println!(
                "{:<28} {:>8} {:>14} {:>12} {:>12} {:>12} {:>12} {:>14}",
                "column", "count", "mean", "min", "25%", "50%", "75%", "max"
            );
            for row in describe(&filtered) {
                println!(
                    "{:<28} {:>8} {:>14.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>14.2}",
                    row.column, row.count, row.mean, row.min, row.q25, row.median, row.q75, row.max
                );
            }

            let metric = Metric::from(metric);
            println!("median {} per room count:", metric.column());
            for bar in median_by_rooms(&filtered, metric) {
                println!("  {:>3} rooms: {:.0}", bar.rooms, bar.median);
            }
        }
        Command::Map { limit } => {
            let cleaned = clean_for_display(load_records(&source).await?);
            info!(markers = cleaned.len(), "cleaned sales for map");

            match map_center(&cleaned) {
                Some(center) => println!(
                    "center: lat={:.5} lon={:.5}",
                    center.latitude, center.longitude
                ),
                None => println!("no located transactions"),
            }

            for record in cleaned.iter().take(limit) {
                println!("[{}]\n{}\n", record.id, marker_label(record));
            }
            if cleaned.len() > limit {
                println!("... output truncated to first {limit} marker(s)");
            }
        }
    }

    Ok(())
}

async fn load_records(source: &CsvSource) -> anyhow::Result<Vec<PropertyRecord>> {
    let report = source
        .load()
        .await
        .with_context(|| format!("failed to load {}", source.describe()))?;
    log_skipped(&report.skipped_rows);
    info!(records = report.records.len(), "transactions loaded");
    Ok(report.records)
}

async fn open_session(source: &CsvSource) -> anyhow::Result<Session> {
    let (session, skipped) = Session::open(source, &PreparationOptions::default())
        .await
        .with_context(|| format!("failed to prepare {}", source.describe()))?;
    log_skipped(&skipped);
    info!(
        session = %session.id(),
        pool = session.pool().len(),
        held_out = session.held_out().len(),
        "session ready"
    );
    Ok(session)
}

fn log_skipped(skipped: &[SkippedRow]) {
    if skipped.is_empty() {
        return;
    }
    warn!("skipped_rows={}", skipped.len());
    for row in skipped.iter().take(10) {
        warn!(line = row.line, reason = %row.reason, "skipped row");
    }
}

fn print_query(record: &PropertyRecord) {
    println!("{}", record.address);

    let surface = record.surface.unwrap_or_default();
    let rooms = record.rooms.unwrap_or_default();
    let plural = if rooms > 1 { "s" } else { "" };
    println!(
        "{surface:.0} m² | {rooms} room{plural} | {}",
        record.property_type.as_deref().unwrap_or("unknown type")
    );
}

fn print_comparable_set(set: &ComparableSet) {
    println!("asking price: {}", format_price(set.asking_price));
    println!("estimated sale price: {}", format_price(set.estimated_price));
    println!("the estimation is based on the following comparables:");

    for comparable in &set.comparables {
        println!("----");
        println!(
            "{} | {}",
            comparable.address.street_line(),
            comparable.address.municipality.as_deref().unwrap_or("")
        );
        println!(
            "  similarity={:.3} ({}%) surface={} rooms={} distance_m={} price={}",
            comparable.similarity,
            comparable.similarity_percent(),
            comparable.surface,
            comparable.rooms,
            comparable.distance_meters,
            format_price(comparable.price)
        );
    }
    println!("----");
}

fn format_price(price: Option<f64>) -> String {
    price
        .map(|value| format!("{value:.2} €"))
        .unwrap_or_else(|| "n/a".to_string())
}
