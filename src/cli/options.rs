use clap::ValueEnum;
use strum::Display;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Color {
  Auto,
  Always,
  Never,
}
