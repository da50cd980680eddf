pub mod arch;
pub mod regset;

use nix::unistd::Pid;
use ptbox_core::{Arch, DebuggerError, SyscallDebugger, arch::UnsupportedArchSnafu};
use snafu::ensure;

pub use arch::{Arm64Capabilities, Arm64Debugger};
pub use regset::{PtraceRegset, Regset, RegsetTransfer};

/// Check that [`debugger_for`] can serve tracees of `arch`, before any tracee exists.
pub fn ensure_supported(arch: Arch) -> Result<(), DebuggerError> {
  ensure!(arch == Arch::Aarch64, UnsupportedArchSnafu { arch });
  Ok(())
}

/// Create the register backend for a tracee of architecture `arch`.
pub fn debugger_for(arch: Arch, tid: Pid) -> Result<Box<dyn SyscallDebugger>, DebuggerError> {
  match arch {
    Arch::Aarch64 => Ok(Box::new(Arm64Debugger::new(tid))),
    arch => UnsupportedArchSnafu { arch }.fail(),
  }
}

/// Create the register backend for a tracee running on the same architecture as us.
pub fn debugger_for_host(tid: Pid) -> Result<Box<dyn SyscallDebugger>, DebuggerError> {
  debugger_for(Arch::detect(), tid)
}
