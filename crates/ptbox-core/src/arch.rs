use cfg_if::cfg_if;
use snafu::Snafu;
use strum::{Display, EnumString};

/// CPU architecture of a tracee, which decides the register layout and syscall ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Arch {
  #[strum(to_string = "aarch64", serialize = "arm64")]
  Aarch64,
  #[strum(serialize = "x86_64")]
  X86_64,
  #[strum(serialize = "riscv64")]
  Riscv64,
  #[strum(serialize = "unknown")]
  Unknown,
}

impl Arch {
  /// The architecture this binary was built for.
  ///
  /// Tracees always share the tracer's architecture because ptbox never traces
  /// compat-mode processes.
  pub fn detect() -> Self {
    cfg_if! {
      if #[cfg(target_arch = "aarch64")] {
        Self::Aarch64
      } else if #[cfg(target_arch = "x86_64")] {
        Self::X86_64
      } else if #[cfg(target_arch = "riscv64")] {
        Self::Riscv64
      } else {
        Self::Unknown
      }
    }
  }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum DebuggerError {
  #[snafu(display("No register backend for architecture {arch}"))]
  UnsupportedArch { arch: Arch },
}
