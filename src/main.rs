mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "weblog")]
#[command(about = "A terminal client for browsing and writing short blog posts")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/weblog/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the blog service
  #[arg(short, long)]
  url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // The terminal belongs to the TUI; logs go to a file
  let _log_guard = init_logging()?;

  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line beats the environment beats the config file
  if let Some(url) = args.url.or_else(config::Config::api_url_override) {
    config.api.url = url;
  }

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}

fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let dir = dirs::data_dir()
    .unwrap_or_else(|| PathBuf::from("."))
    .join("weblog");
  std::fs::create_dir_all(&dir)?;

  let file = tracing_appender::rolling::daily(dir, "weblog.log");
  let (writer, guard) = tracing_appender::non_blocking(file);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}
