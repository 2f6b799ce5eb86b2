//! WebCrawler main entry point
//!
//! This is the command-line interface for the polite, resilient site crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use webcrawler::config::load_config_with_hash;
use webcrawler::output::{print_anti_detection_stats, print_summary, save_results};
use webcrawler::resilience::{load_proxy_file, DelayStrategy};
use webcrawler::{CrawlConfig, Crawler, PageResult};

/// Number of sample pages printed after a crawl
const SAMPLE_SIZE: usize = 3;

/// WebCrawler: a polite, resilient recursive site crawler
///
/// Crawls a site breadth-first from a seed URL within a depth and page
/// budget, pacing requests and optionally rotating user agents, headers,
/// sessions and proxies. Results are written as JSON.
#[derive(Parser, Debug)]
#[command(name = "webcrawler")]
#[command(version)]
#[command(about = "A polite, resilient recursive site crawler", long_about = None)]
struct Cli {
    /// Seed URL (overrides the one in the config file)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum link depth from the seed
    #[arg(long)]
    max_depth: Option<u32>,

    /// Maximum number of pages to crawl
    #[arg(long)]
    max_pages: Option<u32>,

    /// Base delay between requests in seconds
    #[arg(long)]
    delay: Option<f64>,

    /// Follow links to other domains
    #[arg(long)]
    cross_domain: bool,

    /// Ignore robots.txt
    #[arg(long)]
    ignore_robots: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<f64>,

    /// Enable the anti-detection preset
    #[arg(long)]
    anti_detection: bool,

    #[arg(long)]
    user_agent_rotation: bool,

    #[arg(long)]
    header_randomization: bool,

    /// Delay strategy: fixed, random, exponential or adaptive
    #[arg(long)]
    delay_strategy: Option<DelayStrategy>,

    #[arg(long)]
    min_delay: Option<f64>,

    #[arg(long)]
    max_delay: Option<f64>,

    /// Requests per session before it is replaced
    #[arg(long, value_name = "N")]
    session_rotation: Option<u32>,

    /// Route requests through the configured proxies
    #[arg(long)]
    proxy_rotation: bool,

    /// File with one proxy address per line
    #[arg(long, value_name = "FILE")]
    proxy_file: Option<PathBuf>,

    /// Comma-separated proxy addresses
    #[arg(long, value_delimiter = ',')]
    proxy_list: Vec<String>,

    /// Skip probing proxies before the crawl
    #[arg(long)]
    no_validate_proxies: bool,

    /// User agent used when rotation is disabled
    #[arg(long)]
    user_agent: Option<String>,

    /// Status-level retries per request
    #[arg(long)]
    max_retries: Option<u32>,

    /// Disable TLS certificate verification
    #[arg(long)]
    no_ssl_verify: bool,

    /// Seed for random rotation and jitter
    #[arg(long)]
    seed: Option<u64>,

    /// Path of the JSON results file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Print anti-detection statistics and proxy health
    #[arg(long)]
    stats: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = build_config(&cli)?;
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.results_path));

    let mut crawler = Crawler::new(config).context("Failed to initialize crawler")?;

    let interrupt = crawler.interrupt();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing current page");
            interrupt.trigger();
        }
    });

    let results = crawler.crawl().await?;

    print_summary(&crawler.summary());
    if cli.stats {
        print_anti_detection_stats(&crawler.anti_detection_stats());
    }

    save_results(&output_path, &results)
        .with_context(|| format!("Failed to save results to {}", output_path.display()))?;
    println!("Results saved to: {}\n", output_path.display());

    print_samples(&results);

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("webcrawler=info,warn"),
            1 => EnvFilter::new("webcrawler=debug,info"),
            2 => EnvFilter::new("webcrawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the config file (if any) and applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<CrawlConfig> {
    let mut config = match (&cli.config, &cli.url) {
        (Some(path), _) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        (None, Some(url)) => CrawlConfig::new(url.as_str()),
        (None, None) => bail!("A seed URL or a --config file is required"),
    };

    if let Some(url) = &cli.url {
        config.crawler.seed_url = url.clone();
    }

    let crawler = &mut config.crawler;
    if let Some(depth) = cli.max_depth {
        crawler.max_depth = depth;
    }
    if let Some(pages) = cli.max_pages {
        crawler.max_pages = pages;
    }
    if let Some(delay) = cli.delay {
        crawler.delay = delay;
    }
    if cli.cross_domain {
        crawler.same_domain_only = false;
    }
    if cli.ignore_robots {
        crawler.respect_robots_txt = false;
    }
    if let Some(ua) = &cli.user_agent {
        crawler.user_agent = ua.clone();
    }
    if cli.seed.is_some() {
        crawler.seed = cli.seed;
    }

    let anti = &mut config.anti_detection;
    anti.enabled |= cli.anti_detection;
    anti.user_agent_rotation |= cli.user_agent_rotation;
    anti.header_randomization |= cli.header_randomization;
    if let Some(strategy) = cli.delay_strategy {
        anti.delay_strategy = strategy;
    }
    if let Some(min) = cli.min_delay {
        anti.min_delay = min;
    }
    if let Some(max) = cli.max_delay {
        anti.max_delay = max;
    }
    if let Some(interval) = cli.session_rotation {
        anti.session_rotation_interval = interval;
    }

    let proxy = &mut config.proxy;
    proxy.enabled |= cli.proxy_rotation;
    if let Some(path) = &cli.proxy_file {
        let loaded = load_proxy_file(path)
            .with_context(|| format!("Failed to read proxy file {}", path.display()))?;
        tracing::info!("Loaded {} proxies from {}", loaded.len(), path.display());
        proxy.proxies.extend(loaded.iter().map(ToString::to_string));
    }
    proxy
        .proxies
        .extend(cli.proxy_list.iter().map(|p| p.trim().to_string()).filter(|p| !p.is_empty()));
    if cli.no_validate_proxies {
        proxy.validate = false;
    }

    let request = &mut config.request;
    if let Some(timeout) = cli.timeout {
        request.timeout = timeout;
    }
    if let Some(retries) = cli.max_retries {
        request.max_retries = retries;
    }
    if cli.no_ssl_verify {
        request.verify_ssl = false;
    }

    if let Some(output) = &cli.output {
        config.output.results_path = output.display().to_string();
    }

    Ok(config)
}

/// Prints a few successful and failed pages
fn print_samples(results: &[PageResult]) {
    let successes: Vec<&PageResult> = results.iter().filter(|r| r.is_success()).collect();
    if !successes.is_empty() {
        println!("Sample successful pages:");
        for page in successes.iter().take(SAMPLE_SIZE) {
            let title = if page.title.is_empty() { "(no title)" } else { page.title.as_str() };
            println!("  - {} [{}] ({} links)", page.url, title, page.links.len());
        }
        println!();
    }

    let failures: Vec<&PageResult> = results.iter().filter(|r| r.is_failure()).collect();
    if !failures.is_empty() {
        println!("Sample failed pages:");
        for page in failures.iter().take(SAMPLE_SIZE) {
            println!(
                "  - {}: {}",
                page.url,
                page.error.as_deref().unwrap_or_default()
            );
        }
        println!();
    }
}
