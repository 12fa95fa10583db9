use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use url_sheriff::{SheriffConfig, UrlSheriff};

#[derive(Parser)]
#[command(name = "url-sheriff")]
#[command(about = "Check URLs for SSRF before fetching them")]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hostname to allow without IP or DNS checks
    #[arg(long = "allow", value_name = "HOST")]
    allow: Vec<String>,

    /// Hostname regex to allow without IP or DNS checks
    #[arg(long = "allow-pattern", value_name = "REGEX")]
    allow_pattern: Vec<String>,

    /// Permitted URL scheme (repeatable, default: all)
    #[arg(long = "scheme", value_name = "SCHEME")]
    schemes: Vec<String>,

    /// DNS server to query instead of the system resolver
    #[arg(long = "dns-server", value_name = "IP")]
    dns_servers: Vec<String>,

    /// URLs to check
    #[arg(required = true)]
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let sheriff = UrlSheriff::new(build_config(&cli)?)?;

    let mut all_safe = true;
    for url in &cli.urls {
        match sheriff.check_url(url).await {
            Ok(_) => println!("safe {}", url),
            Err(e) => {
                all_safe = false;
                println!("unsafe {}: {}", url, e);
            }
        }
    }

    Ok(if all_safe {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_config(cli: &Cli) -> anyhow::Result<SheriffConfig> {
    let mut config = match &cli.config {
        Some(path) => SheriffConfig::load_from_path(path)?,
        None => SheriffConfig::default(),
    };

    for host in &cli.allow {
        config = config.allow(host.as_str());
    }
    for pattern in &cli.allow_pattern {
        config = config.allow_pattern(pattern)?;
    }
    if !cli.schemes.is_empty() {
        config.allowed_schemes = cli.schemes.clone();
    }
    if !cli.dns_servers.is_empty() {
        config.resolver_servers = Some(cli.dns_servers.clone());
    }

    Ok(config)
}
