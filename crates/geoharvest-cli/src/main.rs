use std::fs::File;
use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use geoharvest_client::{CswClient, GeogratisClient};
use geoharvest_core::config::{HttpConfig, load_harvester_config};
use geoharvest_core::convert::SourceConverter;
use geoharvest_core::crosswalk::Crosswalk;
use geoharvest_core::export::{DumpMode, DumpService};
use geoharvest_core::model::SourceKind;
use geoharvest_core::pipeline::{ConvertMode, ConvertService};
use geoharvest_core::scan::{CswScanMode, CswScanService, FeedScanService, ScanMode};
use geoharvest_core::stats::{ConvertStats, ScanStats};
use geoharvest_db::{PackageRepository, RecordRepository, SettingsRepository, init_schema};

mod config;

use config::{Command, Config, SourceArg};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = Config::parse();
    let harvester_config = load_harvester_config(config.config.clone())?;

    info!("Connecting to database...");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    init_schema(&pool).await?;

    let records = RecordRepository::new(pool.clone());
    let packages = PackageRepository::new(pool.clone());
    let settings = SettingsRepository::new(pool);

    let http = HttpConfig::default();
    let delay = harvester_config.scan.request_delay();

    match config.command {
        Command::Scan {
            source,
            since,
            monitor,
            start_index,
        } => match source {
            SourceArg::Gr => {
                let feed = GeogratisClient::new(&harvester_config.geogratis, &http, delay)?;
                let mode = match (since, monitor, start_index) {
                    (Some(date), _, _) => ScanMode::Since(parse_date(&date)?),
                    (None, true, _) => ScanMode::Monitor,
                    (None, false, Some(index)) => ScanMode::StartIndex(index),
                    (None, false, None) => ScanMode::Full,
                };

                let service = FeedScanService::new(feed, records, settings);
                let stats = service.run(mode).await?;
                print_scan_summary(SourceKind::Geogratis, &stats);
            }
            SourceArg::Ec => {
                if start_index.is_some() {
                    anyhow::bail!("--start-index only applies to the gr source");
                }
                let catalog = CswClient::new(&harvester_config.csw, &http, delay)?;
                let mode = match (since, monitor) {
                    (Some(date), _) => CswScanMode::Since(parse_date(&date)?),
                    (None, true) => CswScanMode::Monitor,
                    (None, false) => CswScanMode::All,
                };

                let service = CswScanService::new(catalog, records, settings);
                let stats = service.run(mode).await?;
                print_scan_summary(SourceKind::EcCsw, &stats);
            }
        },
        Command::Convert {
            source,
            since,
            monitor,
        } => {
            let source = SourceKind::from(source);
            let mode = match (since, monitor) {
                (Some(date), _) => ConvertMode::Since(parse_date(&date)?),
                (None, true) => ConvertMode::Monitor,
                (None, false) => ConvertMode::All,
            };

            let crosswalk = Arc::new(Crosswalk::load()?);
            let converter = SourceConverter::for_source(crosswalk, source);
            let service = ConvertService::new(records, packages, settings)
                .with_page_size(harvester_config.scan.convert_page_size);

            let stats = service.run(&converter, source, mode).await?;
            print_convert_summary(source, &stats);
        }
        Command::Dump {
            source,
            since,
            monitor,
            file,
        } => {
            let source = SourceKind::from(source);
            let mode = match (since, monitor) {
                (Some(timestamp), _) => DumpMode::Since(timestamp),
                (None, true) => DumpMode::Monitor,
                (None, false) => DumpMode::All,
            };

            let service = DumpService::new(packages, settings);
            let mut out: Box<dyn Write> = match &file {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(std::io::stdout().lock()),
            };

            let written = service.run(source, mode, &mut out).await?;
            info!("Dumped {} package updates", written);
        }
    }

    Ok(())
}

/// Parses a YYYY-MM-DD argument, failing the run on anything else.
fn parse_date(value: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{value}', expected YYYY-MM-DD"))
}

fn print_scan_summary(source: SourceKind, stats: &ScanStats) {
    info!("");
    info!("=================================================");
    info!("Scan complete: {}", source);
    info!("=================================================");
    info!("  + Created:           {}", stats.created);
    info!("  ~ Replaced:          {}", stats.replaced);
    info!("  * Frozen (deleted):  {}", stats.frozen);
    info!("  x Failed:            {}", stats.failed);
    info!("-------------------------------------------------");
    info!("  Total processed:     {}", stats.total());
    info!("  Successful:          {}", stats.successful());
    info!("=================================================");
}

fn print_convert_summary(source: SourceKind, stats: &ConvertStats) {
    info!("");
    info!("=================================================");
    info!("Conversion complete: {}", source);
    info!("=================================================");
    info!("  + Published:         {}", stats.published);
    info!("  = Skipped:           {}", stats.skipped);
    info!("  ! Rejected:          {}", stats.rejected);
    info!("  x Failed:            {}", stats.failed);
    info!("-------------------------------------------------");
    info!("  Total processed:     {}", stats.total());
    info!("=================================================");
}
