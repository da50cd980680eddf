//! In-memory [`RegsetTransfer`] that records every request.

use hashbrown::HashMap;
use nix::{errno::Errno, unistd::Pid};

use super::{NoteType, Regset, RegsetTransfer};

#[derive(Debug, Default)]
pub(crate) struct StubRegset {
  records: HashMap<NoteType, Vec<u8>>,
  pub reads: Vec<NoteType>,
  pub writes: Vec<NoteType>,
  pub fail_reads: Option<Errno>,
  pub fail_writes: Option<Errno>,
}

impl StubRegset {
  pub fn with<R: Regset>(mut self, value: R) -> Self {
    self.put(value);
    self
  }

  pub fn put<R: Regset>(&mut self, value: R) {
    self.records.insert(R::NOTE, value.as_bytes().to_vec());
  }

  pub fn get<R: Regset>(&self) -> Option<R> {
    let bytes = self.records.get(&R::NOTE)?;
    let mut value = R::default();
    value.as_bytes_mut().copy_from_slice(bytes);
    Some(value)
  }

  pub fn writes_of<R: Regset>(&self) -> usize {
    self.writes.iter().filter(|&&note| note == R::NOTE).count()
  }
}

impl RegsetTransfer for StubRegset {
  fn get_regset<R: Regset>(&mut self, _tid: Pid) -> Result<R, Errno> {
    self.reads.push(R::NOTE);
    if let Some(errno) = self.fail_reads {
      return Err(errno);
    }
    self.get().ok_or(Errno::EINVAL)
  }

  fn set_regset<R: Regset>(&mut self, _tid: Pid, value: &R) -> Result<(), Errno> {
    self.writes.push(R::NOTE);
    if let Some(errno) = self.fail_writes {
      return Err(errno);
    }
    self.put(*value);
    Ok(())
  }
}
