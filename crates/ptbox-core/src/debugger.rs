//! The contract between the tracer loop and an architecture's register backend.
//!
//! The tracer calls [`SyscallDebugger::pre_syscall`] once every time a traced thread
//! stops, before any policy looks at the registers, and [`SyscallDebugger::post_syscall`]
//! once before resuming it. Between the two hooks every accessor works on an in-memory
//! snapshot of the register file. Writes reach the kernel only through `post_syscall`,
//! and only when something was actually written.

use nix::unistd::Pid;
use strum::Display;

/// Which of the two stops of a system call the tracee is sitting in.
///
/// Tracking this belongs to the tracer's state machine, so the backend takes it as a
/// parameter wherever the distinction matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum SyscallPhase {
  Entry,
  Exit,
}

impl SyscallPhase {
  pub fn is_entry(self) -> bool {
    self == Self::Entry
  }

  /// The phase of the next syscall stop of the same thread.
  pub fn next(self) -> Self {
    match self {
      Self::Entry => Self::Exit,
      Self::Exit => Self::Entry,
    }
  }
}

/// A syscall argument position. Linux passes at most six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SyscallArg {
  Arg0,
  Arg1,
  Arg2,
  Arg3,
  Arg4,
  Arg5,
}

impl SyscallArg {
  pub const ALL: [Self; 6] = [
    Self::Arg0,
    Self::Arg1,
    Self::Arg2,
    Self::Arg3,
    Self::Arg4,
    Self::Arg5,
  ];

  pub fn from_index(idx: usize) -> Option<Self> {
    Self::ALL.get(idx).copied()
  }

  pub fn index(self) -> usize {
    self as usize
  }
}

/// Register access for one traced thread.
///
/// Implementations bind to exactly one thread for their whole life. All methods that
/// talk to the kernel must only be called while that thread is in a ptrace-stop.
///
/// OS-level failures are never returned from these methods. A failed transfer usually
/// means the thread died under us, and the tracer still has to finish handling the
/// current stop, so implementations log the failure and keep serving the last snapshot.
pub trait SyscallDebugger: Send {
  fn tid(&self) -> Pid;

  /// Fetch a fresh register snapshot and mark it clean.
  fn pre_syscall(&mut self);

  /// Write the snapshot back if and only if it was modified since [`Self::pre_syscall`].
  fn post_syscall(&mut self);

  /// Read a raw general register slot by its architectural number.
  ///
  /// # Panics
  ///
  /// Panics if `reg` is not a general register number of the architecture.
  fn peek_reg(&self, reg: usize) -> u64;

  /// Overwrite a raw general register slot. Deferred until [`Self::post_syscall`].
  ///
  /// # Panics
  ///
  /// Panics if `reg` is not a general register number of the architecture.
  fn poke_reg(&mut self, reg: usize, value: u64);

  fn syscall(&self) -> i32;

  /// Change the syscall about to be executed. Only meaningful at syscall entry.
  fn set_syscall(&mut self, id: i32);

  fn result(&self) -> i64;

  fn set_result(&mut self, value: i64);

  fn arg(&self, arg: SyscallArg) -> u64;

  /// Overwrite a syscall argument.
  ///
  /// `phase` only matters for arguments that share a register with the return value.
  fn set_arg(&mut self, phase: SyscallPhase, arg: SyscallArg, value: u64);

  fn arg0(&self) -> u64 {
    self.arg(SyscallArg::Arg0)
  }

  fn set_arg0(&mut self, phase: SyscallPhase, value: u64) {
    self.set_arg(phase, SyscallArg::Arg0, value)
  }

  /// Whether `syscall` terminates the calling thread or its whole thread group.
  fn is_exit(&self, syscall: i32) -> bool;

  fn getpid_syscall(&self) -> i32;

  /// The syscall number under which policies should treat an exec.
  ///
  /// This is not necessarily the architecture's real execve number. Backends for
  /// architectures that lose the syscall number across a successful exec report the
  /// value that is left behind instead.
  fn execve_syscall(&self) -> i32;
}
