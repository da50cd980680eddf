use std::sync::LazyLock;

use owo_colors::Style;

pub struct Theme {
  pub tid: Style,
  pub syscall: Style,
  pub args: Style,
  pub error: Style,
  pub exec: Style,
  pub regs: Style,
}

impl Default for Theme {
  fn default() -> Self {
    Self {
      tid: Style::new().bright_yellow(),
      syscall: Style::new().bold(),
      args: Style::new(),
      error: Style::new().bright_red(),
      exec: Style::new().bright_green().bold(),
      regs: Style::new().bright_black(),
    }
  }
}

pub static THEME: LazyLock<Theme> = LazyLock::new(Default::default);
