pub mod arch;
pub mod debugger;

pub use arch::{Arch, DebuggerError};
pub use debugger::{SyscallArg, SyscallDebugger, SyscallPhase};
