use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use reqcache::cache::{CacheStore, MemoryStore, NoopStore, RequestCache};
use reqcache::config::Config;
use reqcache::http::{Headers, ReqwestClient};
use reqcache::logging::{self, LogTarget};

#[derive(Parser, Debug)]
#[command(name = "reqcache")]
#[command(about = "Fetch URLs through an in-memory response cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/reqcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log to stderr instead of the log file
  #[arg(long)]
  log_stderr: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// GET a URL through the cache
  Get {
    url: String,

    /// Request header, as 'Name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// JSON payload sent with the request
    #[arg(short, long)]
    body: Option<String>,

    /// Issue the same request this many times
    #[arg(short, long, default_value_t = 1)]
    repeat: u32,

    /// Pause between repeated requests
    #[arg(long, default_value_t = 0)]
    interval_ms: u64,
  },
}

/// A parsed `get` invocation.
struct GetRequest {
  url: String,
  headers: Option<Headers>,
  body: Option<Value>,
  repeat: u32,
  interval: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let target = if args.log_stderr {
    LogTarget::Stderr
  } else {
    LogTarget::default_file()?
  };
  let _guard = logging::init(&config.log, target)?;

  let Command::Get {
    url,
    headers,
    body,
    repeat,
    interval_ms,
  } = args.command;

  let request = GetRequest {
    url,
    headers: parse_headers(&headers)?,
    body: body
      .map(|b| serde_json::from_str(&b).map_err(|e| eyre!("--body is not valid JSON: {}", e)))
      .transpose()?,
    repeat,
    interval: Duration::from_millis(interval_ms),
  };

  let client = ReqwestClient::new(&config.http)?;
  let ttl = config.cache.ttl()?;

  if config.cache.enabled {
    let cache = RequestCache::new(client, MemoryStore::new())
      .with_ttl(ttl)
      .with_single_flight(config.cache.single_flight);
    run_get(&cache, &request).await
  } else {
    run_get(&RequestCache::new(client, NoopStore), &request).await
  }
}

async fn run_get<S: CacheStore<Value>>(
  cache: &RequestCache<ReqwestClient, S>,
  request: &GetRequest,
) -> Result<()> {
  for i in 0..request.repeat {
    if i > 0 && !request.interval.is_zero() {
      tokio::time::sleep(request.interval).await;
    }

    let result = cache
      .fetch_with_source(&request.url, request.headers.as_ref(), request.body.as_ref())
      .await?;

    eprintln!("[{}] {}", i + 1, result.source.as_str());
    println!("{}", serde_json::to_string_pretty(&result.data)?);
  }

  Ok(())
}

fn parse_headers(lines: &[String]) -> Result<Option<Headers>> {
  if lines.is_empty() {
    return Ok(None);
  }

  let mut headers = Headers::new();
  for line in lines {
    let (name, value) = Headers::parse_line(line)
      .ok_or_else(|| eyre!("Invalid header '{}', expected 'Name: value'", line))?;
    headers.insert(name, value);
  }
  Ok(Some(headers))
}
