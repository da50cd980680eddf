use std::{ffi::CString, io::Write};

use color_eyre::eyre::{Context, bail};
use nix::{
  sys::{
    ptrace,
    signal::{Signal, raise},
    wait::{WaitPidFlag, WaitStatus, waitpid},
  },
  unistd::{ForkResult, Pid, execvp, fork},
};
use owo_colors::OwoColorize;
use ptbox_backend_ptrace::{debugger_for_host, ensure_supported};
use ptbox_core::{Arch, SyscallArg, SyscallDebugger, SyscallPhase};
use tracing::{debug, trace};

use crate::cli::{Output, theme::THEME};

/// What we saw at a syscall-entry stop, kept until the matching exit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRecord {
  pub nr: i32,
  pub args: [u64; 6],
}

impl SyscallRecord {
  pub fn capture(debugger: &dyn SyscallDebugger) -> Self {
    Self {
      nr: debugger.syscall(),
      args: SyscallArg::ALL.map(|arg| debugger.arg(arg)),
    }
  }
}

/// How a syscall stop ended, as far as printing goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// The thread is gone, there is no exit stop.
  NoReturn,
  Returned(i64),
  /// A successful exec. The new image starts with cleared registers.
  Exec,
}

/// Decide how the syscall that entered as `entry_nr` ended.
///
/// A successful exec leaves the syscall register holding `placeholder`. A syscall that
/// already entered with that number (`io_setup` on arm64) just returned.
pub fn outcome(entry_nr: i32, exit_nr: i32, result: i64, placeholder: i32) -> Outcome {
  if exit_nr == placeholder && entry_nr != placeholder {
    Outcome::Exec
  } else {
    Outcome::Returned(result)
  }
}

pub fn syscall_name(debugger: &dyn SyscallDebugger, nr: i32) -> &'static str {
  if nr == debugger.getpid_syscall() {
    "getpid"
  } else if debugger.is_exit(nr) {
    "exit"
  } else {
    "syscall"
  }
}

pub fn format_stop(tid: Pid, name: &str, record: &SyscallRecord, outcome: Outcome) -> String {
  let args = record
    .args
    .iter()
    .map(|arg| format!("{arg:#x}"))
    .collect::<Vec<_>>()
    .join(", ");
  let result = match outcome {
    Outcome::NoReturn => "?".to_string(),
    Outcome::Returned(ret) if (-4095..0).contains(&ret) => {
      ret.style(THEME.error).to_string()
    }
    Outcome::Returned(ret) => ret.to_string(),
    Outcome::Exec => format!("0 {}", "[exec]".style(THEME.exec)),
  };
  format!(
    "[{}] {}({}) = {result}",
    tid.style(THEME.tid),
    format!("{name}#{}", record.nr).style(THEME.syscall),
    args.style(THEME.args),
  )
}

pub fn format_regs(debugger: &dyn SyscallDebugger) -> String {
  (0..=8)
    .map(|reg| format!("x{reg}={:#x}", debugger.peek_reg(reg)))
    .collect::<Vec<_>>()
    .join(" ")
}

/// Run `cmd` under ptrace and print every syscall it makes. Returns its exit code.
pub fn run(cmd: &[String], out: &mut Output, verbose: bool) -> color_eyre::Result<i32> {
  ensure_supported(Arch::detect())?;
  let args = cmd
    .iter()
    .map(|arg| CString::new(arg.as_str()))
    .collect::<Result<Vec<_>, _>>()
    .context("command contains a nul byte")?;
  let Some(program) = args.first() else {
    bail!("no command to run");
  };
  trace!("run: {:?}", args);

  let child = match unsafe { fork() }.context("failed to fork tracee")? {
    ForkResult::Child => {
      if ptrace::traceme().is_err() || raise(Signal::SIGSTOP).is_err() {
        unsafe { nix::libc::_exit(127) }
      }
      if let Err(errno) = execvp(program, &args) {
        eprintln!("ptbox: failed to execute {program:?}: {errno}");
      }
      unsafe { nix::libc::_exit(127) }
    }
    ForkResult::Parent { child } => child,
  };

  waitpid(child, Some(WaitPidFlag::WSTOPPED)).context("tracee didn't stop")?;
  ptrace::setoptions(
    child,
    ptrace::Options::PTRACE_O_TRACESYSGOOD
      | ptrace::Options::PTRACE_O_TRACEEXEC
      | ptrace::Options::PTRACE_O_EXITKILL,
  )?;
  let debugger = debugger_for_host(child)?;
  trace_syscalls(child, debugger, out, verbose)
}

fn trace_syscalls(
  child: Pid,
  mut debugger: Box<dyn SyscallDebugger>,
  out: &mut Output,
  verbose: bool,
) -> color_eyre::Result<i32> {
  let mut phase = SyscallPhase::Entry;
  let mut entry = None;
  let mut signal = None;
  loop {
    ptrace::syscall(child, signal.take())?;
    match waitpid(child, None)? {
      WaitStatus::PtraceSyscall(tid) => {
        debugger.pre_syscall();
        match phase {
          SyscallPhase::Entry => {
            let record = SyscallRecord::capture(&*debugger);
            if debugger.is_exit(record.nr) {
              let name = syscall_name(&*debugger, record.nr);
              writeln!(out, "{}", format_stop(tid, name, &record, Outcome::NoReturn))?;
            }
            entry = Some(record);
          }
          SyscallPhase::Exit => {
            if let Some(record) = entry.take() {
              let outcome = outcome(
                record.nr,
                debugger.syscall(),
                debugger.result(),
                debugger.execve_syscall(),
              );
              let name = syscall_name(&*debugger, record.nr);
              writeln!(out, "{}", format_stop(tid, name, &record, outcome))?;
            }
          }
        }
        if verbose {
          writeln!(out, "  {} {}", phase, format_regs(&*debugger).style(THEME.regs))?;
        }
        debugger.post_syscall();
        phase = phase.next();
      }
      WaitStatus::PtraceEvent(pid, _, event) => trace!("ptrace event {event} of {pid}"),
      WaitStatus::Stopped(pid, sig) => {
        debug!("{pid} stopped by {sig}, delivering it");
        signal = Some(sig);
      }
      WaitStatus::Exited(pid, code) => {
        debug!("{pid} exited with {code}");
        return Ok(code);
      }
      WaitStatus::Signaled(pid, sig, _) => {
        debug!("{pid} killed by {sig}");
        return Ok(128 + sig as i32);
      }
      other => trace!("ignoring wait status {other:?}"),
    }
  }
}
