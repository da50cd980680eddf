use std::{
  io::{BufWriter, Write, stderr, stdout},
  path::PathBuf,
};

use clap::Parser;

use self::options::Color;

pub mod options;
pub mod theme;

pub type Output = dyn Write;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Cli {
  #[arg(long, default_value_t = Color::Auto, help = "Control whether colored output is enabled")]
  pub color: Color,
  #[arg(
    short,
    long,
    help = "Also dump the raw registers x0-x8 at every syscall stop"
  )]
  pub verbose: bool,
  #[arg(
    short,
    long,
    help = "Output, stderr by default. A single hyphen '-' represents stdout."
  )]
  pub output: Option<PathBuf>,
  #[arg(long, help = "Write ptbox's own log to this file instead of stderr")]
  pub log_file: Option<PathBuf>,
  #[arg(last = true, required = true, help = "command to be executed")]
  pub cmd: Vec<String>,
}

impl Cli {
  pub fn get_output(path: Option<PathBuf>, color: Color) -> std::io::Result<Box<Output>> {
    Ok(match path {
      None => Box::new(stderr()),
      Some(ref x) if x.as_os_str() == "-" => Box::new(stdout()),
      Some(path) => {
        let file = std::fs::OpenOptions::new()
          .create(true)
          .truncate(true)
          .write(true)
          .open(path)?;
        if color != Color::Always {
          // Disable color by default when output is file
          owo_colors::control::set_should_colorize(false);
        }
        Box::new(BufWriter::new(file))
      }
    })
  }
}
