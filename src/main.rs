mod cli;
mod log;
mod tracer;

use std::{io::Write, process};

use clap::Parser;
use cli::{Cli, options::Color};

fn main() -> color_eyre::Result<()> {
  let mut cli = Cli::parse();
  if cli.color == Color::Auto && std::env::var_os("NO_COLOR").is_some() {
    // Respect NO_COLOR if --color=auto
    cli.color = Color::Never;
  }
  match cli.color {
    Color::Always => owo_colors::control::set_should_colorize(true),
    Color::Never => owo_colors::control::set_should_colorize(false),
    Color::Auto => {}
  }
  color_eyre::install()?;
  log::initialize_logging(cli.log_file.clone())?;
  tracing::debug!("Commandline args: {:?}", cli);
  let mut output = Cli::get_output(cli.output.clone(), cli.color)?;
  let code = tracer::run(&cli.cmd, &mut output, cli.verbose)?;
  output.flush()?;
  drop(output);
  process::exit(code);
}
