use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use roadview::{
    annotation_records, check_coverage_batch, coverage_by_city, covered_locations,
    download_images_batch, read_coverage, read_downloads, read_locations, write_annotations,
    write_coverage, write_downloads, ClientConfig, DirectFetcher, DownloadOptions, PanoClient,
    PanoFetcher, StreetViewClient, DEFAULT_ZOOM, MAX_ZOOM,
};

#[derive(Debug, Parser)]
#[command(name = "roadview")]
#[command(about = "Street-level imagery acquisition tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check imagery coverage for sampled locations
    Coverage {
        /// Input locations CSV
        #[arg(short, long, default_value = "data/samples/locations.csv")]
        input: PathBuf,
        /// Output coverage CSV
        #[arg(short, long, default_value = "data/coverage/coverage.csv")]
        output: PathBuf,
        /// Seconds between API calls
        #[arg(long, default_value_t = 0.1)]
        rate_limit: f64,
        /// API key for the metadata endpoint
        #[arg(long, env = "GOOGLE_STREETVIEW_API_KEY", hide_env_values = true)]
        api_key: String,
    },
    /// Download images for locations with coverage
    Download {
        /// Input coverage CSV (from the coverage command)
        #[arg(short, long, default_value = "data/coverage/coverage.csv")]
        input: PathBuf,
        /// Directory to save images into
        #[arg(short, long, default_value = "data/images")]
        output_dir: PathBuf,
        /// Camera headings in degrees
        #[arg(long, value_delimiter = ',', default_value = "0,90,180,270")]
        headings: Vec<u16>,
        /// Camera pitch (-90 to 90)
        #[arg(long, default_value_t = 0)]
        pitch: i16,
        /// Field of view in degrees
        #[arg(long, default_value_t = 90)]
        fov: u16,
        /// Image size for direct mode, as WIDTHxHEIGHT
        #[arg(long, default_value = "640x640", value_parser = parse_size)]
        size: (u32, u32),
        /// Seconds between API calls (direct mode)
        #[arg(long, default_value_t = 0.1)]
        rate_limit: f64,
        /// Refetch locations even when their images already exist
        #[arg(long)]
        no_skip_existing: bool,
        /// Use the keyless high-resolution panorama path
        #[arg(long)]
        hires: bool,
        /// Panorama zoom level for hi-res mode (0-5)
        #[arg(long, default_value_t = DEFAULT_ZOOM, value_parser = clap::value_parser!(u8).range(..=MAX_ZOOM as i64))]
        zoom: u8,
        /// API key for the paid image endpoint (direct mode only)
        #[arg(long, env = "GOOGLE_STREETVIEW_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },
    /// Build an annotation manifest from download results
    Annotate {
        /// Input download results CSV (from the download command)
        #[arg(short, long, default_value = "data/images/download_results.csv")]
        input: PathBuf,
        /// Output annotation CSV
        #[arg(short, long, default_value = "data/annotation.csv")]
        output: PathBuf,
    },
}

/// Parse an image size given as `WIDTHxHEIGHT`, e.g. `640x640`.
fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let width: u32 = w.parse().map_err(|_| format!("bad width '{w}'"))?;
    let height: u32 = h.parse().map_err(|_| format!("bad height '{h}'"))?;
    if width == 0 || height == 0 {
        return Err("width and height must be positive".to_string());
    }
    Ok((width, height))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadview=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Coverage {
            input,
            output,
            rate_limit,
            api_key,
        } => run_coverage(input, output, rate_limit, api_key).await,
        Commands::Download {
            input,
            output_dir,
            headings,
            pitch,
            fov,
            size,
            rate_limit,
            no_skip_existing,
            hires,
            zoom,
            api_key,
        } => {
            let options = DownloadOptions::new(&output_dir)
                .headings(headings)
                .pitch(pitch)
                .skip_existing(!no_skip_existing);
            run_download(
                input, output_dir, options, fov, size, rate_limit, hires, zoom, api_key,
            )
            .await
        }
        Commands::Annotate { input, output } => run_annotate(input, output),
    }
}

async fn run_coverage(
    input: PathBuf,
    output: PathBuf,
    rate_limit: f64,
    api_key: String,
) -> anyhow::Result<()> {
    let locations = read_locations(&input)
        .with_context(|| format!("reading locations from {}", input.display()))?;
    tracing::info!(count = locations.len(), "checking coverage");

    let config = ClientConfig::new(api_key).rate_limit(Duration::from_secs_f64(rate_limit));
    let mut client = StreetViewClient::new(config)?;

    let records = check_coverage_batch(&mut client, &locations).await;
    write_coverage(&output, &records)
        .with_context(|| format!("writing coverage to {}", output.display()))?;

    for stats in coverage_by_city(&records) {
        let pct = if stats.total > 0 {
            stats.covered as f64 / stats.total as f64 * 100.0
        } else {
            0.0
        };
        tracing::info!(
            city = %stats.city,
            covered = stats.covered,
            total = stats.total,
            "coverage {pct:.1}%"
        );
    }
    tracing::info!(output = %output.display(), "coverage report written");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_download(
    input: PathBuf,
    output_dir: PathBuf,
    options: DownloadOptions,
    fov: u16,
    size: (u32, u32),
    rate_limit: f64,
    hires: bool,
    zoom: u8,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let coverage = read_coverage(&input)
        .with_context(|| format!("reading coverage from {}", input.display()))?;
    let locations = covered_locations(&coverage);
    tracing::info!(
        count = locations.len(),
        images = locations.len() * options.headings.len(),
        hires,
        "downloading images"
    );

    let records = if hires {
        let mut fetcher = PanoFetcher::new(PanoClient::new()).zoom(zoom).fov(fov);
        download_images_batch(&mut fetcher, &locations, &options).await?
    } else {
        let Some(api_key) = api_key else {
            bail!("direct mode needs an API key; set GOOGLE_STREETVIEW_API_KEY or pass --api-key (or use --hires)");
        };
        let config = ClientConfig::new(api_key).rate_limit(Duration::from_secs_f64(rate_limit));
        let client = StreetViewClient::new(config)?;
        let mut fetcher = DirectFetcher::new(client).fov(fov).size(size.0, size.1);
        download_images_batch(&mut fetcher, &locations, &options).await?
    };

    let successful = records.iter().filter(|r| r.success).count();
    tracing::info!(successful, total = records.len(), "download finished");

    let results_path = output_dir.join("download_results.csv");
    write_downloads(&results_path, &records)
        .with_context(|| format!("writing results to {}", results_path.display()))?;
    tracing::info!(output = %results_path.display(), "download report written");
    Ok(())
}

fn run_annotate(input: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let records = read_downloads(&input)
        .with_context(|| format!("reading download results from {}", input.display()))?;
    let rows = annotation_records(&records);
    tracing::info!(
        annotations = rows.len(),
        downloads = records.len(),
        "building annotation manifest"
    );

    write_annotations(&output, &rows)
        .with_context(|| format!("writing annotations to {}", output.display()))?;
    tracing::info!(output = %output.display(), "annotation manifest written");
    Ok(())
}
