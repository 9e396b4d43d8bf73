use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use normals_scraper::config::{split_stations, Config};
use normals_scraper::fetcher::NormalsFetcher;
use normals_scraper::normals::{NormalsDailyParser, OutOfRangePolicy};
use normals_scraper::output_writer::JsonWriter;
use normals_scraper::services::NormalsImportService;
use normals_scraper::utils::{extract_station_id, parse_station_list};

#[derive(Parser)]
#[command(name = "normals-scraper")]
#[command(about = "Convert NOAA 1981-2010 station normals reports into JSON files", long_about = None)]
struct Cli {
    /// Mode: 'fetch' (download reports) or 'file' (decode a local report)
    #[arg(long, default_value = "fetch")]
    mode: String,

    /// Comma separated GHCN station IDs (e.g., "USW00014922")
    #[arg(long)]
    stations: Option<String>,

    /// Path to file containing station IDs (one per line)
    #[arg(long)]
    station_list: Option<PathBuf>,

    /// Local normals report (for 'file' mode)
    #[arg(long)]
    file: Option<PathBuf>,

    /// Station ID used to name output files in 'file' mode (defaults to the report's GHCN ID).
    /// Must contain an 11-character GHCN ID
    #[arg(long)]
    station_id: Option<String>,

    /// Directory to write JSON files to
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Number of stations fetched in parallel
    #[arg(long)]
    parallel: Option<usize>,

    /// Handling of slots below -1000 other than -9999: 'drop' or 'null'
    #[arg(long)]
    out_of_range: Option<OutOfRangePolicy>,

    /// Report URL template, `{station}` is replaced by the station ID
    #[arg(long)]
    url_template: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,normals_scraper=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    // Load .env file if it exists (ignore errors if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = apply_cli(Config::from_env(), &cli)?;
    info!("Starting normals scraper with config: {:?}", config);

    let fetcher = NormalsFetcher::with_timeout(
        config.url_template.clone(),
        Duration::from_secs(config.request_timeout_secs),
    );
    let writer = JsonWriter::new(config.data_dir.clone(), config.pretty_json);
    let parser = NormalsDailyParser::new(config.out_of_range);
    let service = NormalsImportService::new(fetcher, writer, parser);

    match cli.mode.as_str() {
        "fetch" => fetch_stations(&service, &config).await,
        "file" => {
            let file = cli.file.ok_or("--file is required for file mode")?;
            import_file(&service, file, cli.station_id).await
        }
        _ => Err(format!("Invalid mode '{}'. Valid modes: fetch, file", cli.mode).into()),
    }
}

/// Overlay command line arguments on the environment configuration
fn apply_cli(mut config: Config, cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    if let Some(stations) = &cli.stations {
        config.stations = split_stations(stations);
    }
    if let Some(path) = &cli.station_list {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read station list {path:?}: {e}"))?;
        config.stations = parse_station_list(&text)
            .into_iter()
            .filter_map(|entry| entry.map_err(|e| warn!("Skipping {e}")).ok())
            .collect();
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if cli.pretty {
        config.pretty_json = true;
    }
    if let Some(parallel) = cli.parallel {
        config.parallel = parallel;
    }
    if let Some(policy) = cli.out_of_range {
        config.out_of_range = policy;
    }
    if let Some(template) = &cli.url_template {
        config.url_template = template.clone();
    }
    Ok(config)
}

async fn fetch_stations(
    service: &NormalsImportService,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let station_ids: Vec<String> = config
        .stations
        .iter()
        .filter_map(|s| match extract_station_id(s) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Skipping station '{}': {}", s, e);
                None
            }
        })
        .collect();

    if station_ids.is_empty() {
        return Err("No valid station IDs to fetch".into());
    }

    let pb = ProgressBar::new(station_ids.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} stations ({msg})")
            .unwrap()
            .progress_chars("##-"),
    );

    let summary = service
        .import_stations(station_ids, config.parallel, &pb)
        .await;

    pb.finish_with_message(format!(
        "Complete: {} successful, {} failed",
        summary.imported.len(),
        summary.failed.len()
    ));

    println!("\n============================================================");
    println!("Normals Import Summary");
    println!("============================================================");
    for imported in &summary.imported {
        println!(
            "  {}: {}, {}",
            imported.station_id,
            imported.station_file.display(),
            imported.daily_file.display()
        );
    }
    if !summary.failed.is_empty() {
        println!("\nFailed Stations:");
        for (station_id, error) in &summary.failed {
            println!("  {station_id}: {error}");
        }
    }
    println!("============================================================");

    Ok(())
}

async fn import_file(
    service: &NormalsImportService,
    file: PathBuf,
    station_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Decoding local normals report: {file:?}");
    let text = tokio::fs::read_to_string(&file).await.map_err(|e| {
        error!("Failed to read {file:?}: {e}");
        format!("Failed to read {file:?}: {e}")
    })?;

    let normals = service.decode_report(&text)?;
    info!(
        "Decoded {} with {} daily sections",
        normals.metadata.name,
        normals.daily.len()
    );

    // Output file names only ever come from a well-formed GHCN id
    let requested = station_id.as_deref().unwrap_or(&normals.metadata.ghcn_daily_id);
    let station_id = extract_station_id(requested)
        .map_err(|e| format!("Invalid station ID '{requested}': {e}"))?;

    let imported = service.write_normals(&station_id, &normals).await?;
    println!(
        "Wrote {} and {}",
        imported.station_file.display(),
        imported.daily_file.display()
    );
    Ok(())
}
