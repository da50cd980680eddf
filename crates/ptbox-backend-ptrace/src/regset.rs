//! Register set transfer through `PTRACE_GETREGSET` and `PTRACE_SETREGSET`.
//!
//! `nix` only wraps `PTRACE_GETREGS`/`PTRACE_SETREGS`, which don't exist on aarch64 and
//! can't address note types other than the general registers, so we go through libc.

use std::ffi::{c_int, c_void};

use nix::{errno::Errno, unistd::Pid};

#[cfg(test)]
pub(crate) mod stub;

/// ELF note type selecting which register set a regset request transfers.
///
/// See https://github.com/torvalds/linux/blob/v6.9/include/uapi/linux/elf.h
pub type NoteType = c_int;

/// A register set record as laid out by the kernel.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` or `#[repr(transparent)]`, contain no padding and
/// accept every bit pattern, because the kernel fills them byte by byte.
pub unsafe trait Regset: Copy + Default {
  const NOTE: NoteType;

  fn as_bytes(&self) -> &[u8] {
    unsafe { std::slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>()) }
  }

  fn as_bytes_mut(&mut self) -> &mut [u8] {
    unsafe { std::slice::from_raw_parts_mut((self as *mut Self).cast::<u8>(), size_of::<Self>()) }
  }
}

/// The kernel side of register access for stopped tracees.
///
/// Every call is a single synchronous request. Nothing is retried: a failure most often
/// means the tracee is gone and its tid may already have been reused.
pub trait RegsetTransfer {
  fn get_regset<R: Regset>(&mut self, tid: Pid) -> Result<R, Errno>;

  fn set_regset<R: Regset>(&mut self, tid: Pid, value: &R) -> Result<(), Errno>;
}

/// [`RegsetTransfer`] backed by the real `ptrace(2)` syscall.
#[derive(Debug, Clone, Copy, Default)]
pub struct PtraceRegset;

impl PtraceRegset {
  fn request<R: Regset>(
    request: RegsetRequest,
    tid: Pid,
    buf: *mut c_void,
  ) -> Result<(), Errno> {
    let mut iovec = nix::libc::iovec {
      iov_base: buf,
      iov_len: size_of::<R>(),
    };
    let request = match request {
      RegsetRequest::Get => nix::libc::PTRACE_GETREGSET,
      RegsetRequest::Set => nix::libc::PTRACE_SETREGSET,
    };
    Errno::result(unsafe {
      nix::libc::ptrace(
        request,
        nix::libc::pid_t::from(tid.as_raw()),
        R::NOTE as usize as *mut c_void,
        &raw mut iovec,
      )
    })?;
    // The kernel shrinks iov_len to what it actually transferred.
    // A short transfer leaves part of the record stale.
    if iovec.iov_len < size_of::<R>() {
      return Err(Errno::EINVAL);
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Copy)]
enum RegsetRequest {
  Get,
  Set,
}

impl RegsetTransfer for PtraceRegset {
  fn get_regset<R: Regset>(&mut self, tid: Pid) -> Result<R, Errno> {
    let mut value = R::default();
    Self::request::<R>(
      RegsetRequest::Get,
      tid,
      value.as_bytes_mut().as_mut_ptr().cast(),
    )?;
    Ok(value)
  }

  fn set_regset<R: Regset>(&mut self, tid: Pid, value: &R) -> Result<(), Errno> {
    // PTRACE_SETREGSET only reads from the buffer.
    let mut value = *value;
    Self::request::<R>(
      RegsetRequest::Set,
      tid,
      value.as_bytes_mut().as_mut_ptr().cast(),
    )
  }
}

#[cfg(test)]
mod test {
  use super::Regset;

  #[repr(C)]
  #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
  struct Pair {
    lo: u32,
    hi: u32,
  }

  unsafe impl Regset for Pair {
    const NOTE: super::NoteType = 0x7f;
  }

  #[test]
  fn regset_bytes_cover_whole_record() {
    let mut pair = Pair { lo: 1, hi: 2 };
    assert_eq!(pair.as_bytes().len(), 8);
    pair.as_bytes_mut().copy_from_slice(&[0xff; 8]);
    assert_eq!(
      pair,
      Pair {
        lo: u32::MAX,
        hi: u32::MAX
      }
    );
  }

  #[test]
  fn regset_bytes_follow_native_layout() {
    let pair = Pair { lo: 0x0403_0201, hi: 0 };
    assert_eq!(&pair.as_bytes()[..4], &0x0403_0201u32.to_ne_bytes());
  }

  #[cfg(all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")))]
  mod kernel {
    use nix::{
      errno::Errno,
      libc,
      sys::{
        ptrace,
        signal::{Signal, kill, raise},
        wait::{WaitStatus, waitpid},
      },
      unistd::{ForkResult, Pid, fork},
    };
    use rusty_fork::rusty_fork_test;

    use super::super::{NoteType, PtraceRegset, Regset, RegsetTransfer};

    const NT_PRSTATUS: NoteType = 1;

    #[cfg(target_arch = "x86_64")]
    const GENERAL_WORDS: usize = 27;
    #[cfg(target_arch = "aarch64")]
    const GENERAL_WORDS: usize = 34;

    /// The host's general registers, as plain words.
    #[repr(C)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct GeneralRegs([u64; GENERAL_WORDS]);

    impl Default for GeneralRegs {
      fn default() -> Self {
        Self([0; GENERAL_WORDS])
      }
    }

    unsafe impl Regset for GeneralRegs {
      const NOTE: NoteType = NT_PRSTATUS;
    }

    /// Bigger than any general register set the kernel hands out.
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    struct Oversized([u64; 64]);

    impl Default for Oversized {
      fn default() -> Self {
        Self([0; 64])
      }
    }

    unsafe impl Regset for Oversized {
      const NOTE: NoteType = NT_PRSTATUS;
    }

    fn stopped_tracee() -> Pid {
      match unsafe { fork() }.expect("fork failed") {
        ForkResult::Child => {
          if ptrace::traceme().is_ok() {
            let _ = raise(Signal::SIGSTOP);
          }
          unsafe { libc::_exit(0) }
        }
        ForkResult::Parent { child } => {
          assert_eq!(
            waitpid(child, None).unwrap(),
            WaitStatus::Stopped(child, Signal::SIGSTOP)
          );
          child
        }
      }
    }

    fn reap(child: Pid) {
      kill(child, Signal::SIGKILL).unwrap();
      let _ = waitpid(child, None);
    }

    rusty_fork_test! {
      #[test]
      fn short_transfer_is_rejected() {
        let child = stopped_tracee();
        let result = PtraceRegset.get_regset::<Oversized>(child);
        reap(child);
        assert_eq!(result.unwrap_err(), Errno::EINVAL);
      }

      #[test]
      fn general_registers_survive_a_write_back() {
        let child = stopped_tracee();
        let mut transfer = PtraceRegset;
        let regs = transfer.get_regset::<GeneralRegs>(child).unwrap();
        assert_ne!(regs, GeneralRegs::default());
        transfer.set_regset(child, &regs).unwrap();
        let again = transfer.get_regset::<GeneralRegs>(child).unwrap();
        reap(child);
        assert_eq!(again, regs);
      }

      #[test]
      fn gone_tracee_is_an_error() {
        let child = stopped_tracee();
        reap(child);
        assert_eq!(
          PtraceRegset.get_regset::<GeneralRegs>(child).unwrap_err(),
          Errno::ESRCH
        );
      }
    }
  }
}
