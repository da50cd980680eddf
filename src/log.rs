use std::{
  path::PathBuf,
  sync::{LazyLock, Mutex},
};

use color_eyre::eyre::Result;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
  EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt,
};

pub static LOG_ENV: LazyLock<String> =
  LazyLock::new(|| format!("{}_LOGLEVEL", env!("CARGO_CRATE_NAME").to_uppercase()));

/// `RUST_LOG` wins over `PTBOX_LOGLEVEL`. Without either only warnings and errors
/// of ptbox itself are shown.
fn env_filter() -> EnvFilter {
  EnvFilter::try_from_default_env()
    .or_else(|_| EnvFilter::try_from_env(LOG_ENV.as_str()))
    .unwrap_or_else(|_| EnvFilter::new(default_directive()))
}

fn default_directive() -> String {
  format!(
    "{}=warn,ptbox_backend_ptrace=warn",
    env!("CARGO_CRATE_NAME")
  )
}

pub fn initialize_logging(log_file: Option<PathBuf>) -> Result<()> {
  let layer = tracing_subscriber::fmt::layer()
    .with_file(true)
    .with_line_number(true)
    .with_target(false);
  let layer = match log_file {
    Some(path) => {
      let file = std::fs::File::create(path)?;
      layer
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_filter(env_filter())
        .boxed()
    }
    None => layer
      .with_writer(std::io::stderr)
      .with_filter(env_filter())
      .boxed(),
  };
  tracing_subscriber::registry()
    .with(layer)
    .with(ErrorLayer::default())
    .try_init()?;
  Ok(())
}
