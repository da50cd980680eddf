use nix::unistd::Pid;
use ptbox_core::{SyscallArg, SyscallDebugger, SyscallPhase};
use tracing::{trace, warn};

use crate::regset::{NoteType, PtraceRegset, Regset, RegsetTransfer};


pub const NT_PRSTATUS: NoteType = 1;
/// Only accepted by arm64 kernels.
pub const NT_ARM_SYSTEM_CALL: NoteType = 0x404;

pub const X0: usize = 0;
pub const X1: usize = 1;
pub const X2: usize = 2;
pub const X3: usize = 3;
pub const X4: usize = 4;
pub const X5: usize = 5;
pub const X8: usize = 8;

/// Argument registers, indexed by argument position. x0 doubles as the return value.
pub const ARG_REGS: [usize; 6] = [X0, X1, X2, X3, X4, X5];

pub const SYS_EXIT: i32 = 93;
pub const SYS_EXIT_GROUP: i32 = 94;
pub const SYS_GETPID: i32 = 172;
pub const SYS_EXECVE: i32 = 221;

/// What x8 holds when a successful execve returns.
///
/// There is no `orig_x8` on arm64 and the new image starts with every general register
/// cleared, so the syscall-exit stop of an execve reports syscall 0. Policies treat 0
/// as execve.
pub const EXECVE_PLACEHOLDER: i32 = 0;

/// `struct user_pt_regs` from `arch/arm64/include/uapi/asm/ptrace.h`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserPtRegs {
  pub regs: [u64; 31],
  pub sp: u64,
  pub pc: u64,
  pub pstate: u64,
}

unsafe impl Regset for UserPtRegs {
  const NOTE: NoteType = NT_PRSTATUS;
}

/// The syscall number the kernel is about to dispatch, separate from x8.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmSystemCall(pub i32);

unsafe impl Regset for ArmSystemCall {
  const NOTE: NoteType = NT_ARM_SYSTEM_CALL;
}

/// Kernel features the backend may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arm64Capabilities {
  /// The kernel accepts `NT_ARM_SYSTEM_CALL`, so the pending syscall can be replaced.
  ///
  /// Without it, [`Arm64Debugger::set_syscall`] can only rewrite x8, which the kernel
  /// has already consumed by the time the tracer sees the entry stop.
  pub syscall_regset: bool,
  /// Writing x0 at a syscall-exit stop does not clobber anything the kernel still needs.
  pub unconditional_arg0: bool,
}

impl Default for Arm64Capabilities {
  fn default() -> Self {
    Self {
      syscall_regset: true,
      unconditional_arg0: false,
    }
  }
}

/// Register backend for arm64 tracees.
///
/// The general registers are read once per stop in [`SyscallDebugger::pre_syscall`] and
/// only written back by [`SyscallDebugger::post_syscall`] when something changed, which
/// keeps the common read-only stop at a single ptrace request.
#[derive(Debug)]
pub struct Arm64Debugger<T: RegsetTransfer = PtraceRegset> {
  tid: Pid,
  transfer: T,
  caps: Arm64Capabilities,
  regs: UserPtRegs,
  dirty: bool,
}

impl Arm64Debugger {
  pub fn new(tid: Pid) -> Self {
    Self::with_transfer(tid, PtraceRegset, Arm64Capabilities::default())
  }
}

impl<T: RegsetTransfer> Arm64Debugger<T> {
  pub fn with_transfer(tid: Pid, transfer: T, caps: Arm64Capabilities) -> Self {
    Self {
      tid,
      transfer,
      caps,
      regs: UserPtRegs::default(),
      dirty: false,
    }
  }

  pub fn capabilities(&self) -> Arm64Capabilities {
    self.caps
  }

  /// The snapshot taken by the last `pre_syscall`, including unflushed writes.
  pub fn regs(&self) -> &UserPtRegs {
    &self.regs
  }

  pub fn is_dirty(&self) -> bool {
    self.dirty
  }

  pub fn transfer(&self) -> &T {
    &self.transfer
  }

  /// Ask the kernel which syscall it will run for the current entry stop.
  ///
  /// Unlike x8 this reflects a previous [`SyscallDebugger::set_syscall`].
  pub fn pending_syscall(&mut self) -> Option<i32> {
    match self.transfer.get_regset::<ArmSystemCall>(self.tid) {
      Ok(ArmSystemCall(nr)) => Some(nr),
      Err(errno) => {
        warn!(
          "PTRACE_GETREGSET(NT_ARM_SYSTEM_CALL) failed for {}: {errno}",
          self.tid
        );
        None
      }
    }
  }
}

impl<T: RegsetTransfer + Send> SyscallDebugger for Arm64Debugger<T> {
  fn tid(&self) -> Pid {
    self.tid
  }

  fn pre_syscall(&mut self) {
    match self.transfer.get_regset::<UserPtRegs>(self.tid) {
      Ok(regs) => self.regs = regs,
      Err(errno) => warn!("PTRACE_GETREGSET failed for {}: {errno}", self.tid),
    }
    self.dirty = false;
  }

  fn post_syscall(&mut self) {
    if !self.dirty {
      return;
    }
    self.dirty = false;
    if let Err(errno) = self.transfer.set_regset(self.tid, &self.regs) {
      warn!("PTRACE_SETREGSET failed for {}: {errno}", self.tid);
    }
  }

  fn peek_reg(&self, reg: usize) -> u64 {
    self.regs.regs[reg]
  }

  fn poke_reg(&mut self, reg: usize, value: u64) {
    self.regs.regs[reg] = value;
    self.dirty = true;
  }

  fn syscall(&self) -> i32 {
    self.peek_reg(X8) as i32
  }

  // The kernel reads the syscall number out of x8 before the entry stop and
  // never looks at it again, so x8 in the snapshot is deliberately left alone.
  fn set_syscall(&mut self, id: i32) {
    if self.caps.syscall_regset {
      if let Err(errno) = self.transfer.set_regset(self.tid, &ArmSystemCall(id)) {
        warn!(
          "PTRACE_SETREGSET(NT_ARM_SYSTEM_CALL) failed for {}: {errno}",
          self.tid
        );
      }
    } else {
      self.poke_reg(X8, i64::from(id) as u64);
    }
  }

  fn result(&self) -> i64 {
    self.peek_reg(X0) as i64
  }

  fn set_result(&mut self, value: i64) {
    self.poke_reg(X0, value as u64);
  }

  fn arg(&self, arg: SyscallArg) -> u64 {
    self.peek_reg(ARG_REGS[arg.index()])
  }

  fn set_arg(&mut self, phase: SyscallPhase, arg: SyscallArg, value: u64) {
    // x0 already holds the return value at syscall exit.
    if arg == SyscallArg::Arg0 && !phase.is_entry() && !self.caps.unconditional_arg0 {
      trace!("ignoring arg0 write at syscall exit of {}", self.tid);
      return;
    }
    self.poke_reg(ARG_REGS[arg.index()], value);
  }

  fn is_exit(&self, syscall: i32) -> bool {
    matches!(syscall, SYS_EXIT | SYS_EXIT_GROUP)
  }

  fn getpid_syscall(&self) -> i32 {
    SYS_GETPID
  }

  fn execve_syscall(&self) -> i32 {
    EXECVE_PLACEHOLDER
  }
}
