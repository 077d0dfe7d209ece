//! Tracking of what execution touched, for UIs that only redraw what changed.
//!
//! The simulator's [`AccessObserver`] (in [`Simulator::observer`]) is cleared at the start
//! of every execution call and then records:
//! - every memory access made by an instruction (or through [`Simulator::read_mem`] and [`Simulator::write_mem`]),
//! - every register whose value changed,
//! - whether the screen was drawn to or cleared.
//!
//! Instruction fetches are not recorded.
//!
//! [`Simulator::observer`]: crate::sim::Simulator::observer
//! [`Simulator::read_mem`]: crate::sim::Simulator::read_mem
//! [`Simulator::write_mem`]: crate::sim::Simulator::write_mem

use std::collections::BTreeMap;

use crate::ast::Reg;

use super::mem::RegFile;

/// The kinds of access which have occurred at a memory location.
///
/// ```
/// # use chip8_ensemble::sim::observer::AccessSet;
/// let set = AccessSet::READ | AccessSet::write(0x12, 0x12);
/// assert!(set.read());
/// assert!(set.written());
/// assert!(!set.modified());
///
/// assert!(AccessSet::write(0, 1).modified());
/// ```
#[derive(Default, Clone, Copy, PartialEq, Eq, Debug)]
pub struct AccessSet {
    read: bool,
    written: bool,
    modified: bool,
}
impl AccessSet {
    /// A single read.
    pub const READ: Self = Self { read: true, written: false, modified: false };
    /// A single write which did not change the data.
    pub const WRITTEN: Self = Self { read: false, written: true, modified: false };

    /// A write which replaced `old` with `new`.
    pub fn write(old: u8, new: u8) -> Self {
        Self { read: false, written: true, modified: old != new }
    }

    /// True if any access has occurred.
    pub fn accessed(&self) -> bool {
        self.read || self.written
    }
    /// True if a read has occurred.
    pub fn read(&self) -> bool {
        self.read
    }
    /// True if a write has occurred, whether or not it changed the data.
    pub fn written(&self) -> bool {
        self.written
    }
    /// True if a write has changed the data.
    pub fn modified(&self) -> bool {
        self.modified
    }
}
impl std::ops::BitOr for AccessSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            read: self.read || rhs.read,
            written: self.written || rhs.written,
            modified: self.modified || rhs.modified,
        }
    }
}
impl std::ops::BitOrAssign for AccessSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Records the memory, registers, and screen touched during execution.
#[derive(Debug, Default)]
pub struct AccessObserver {
    mem: BTreeMap<u16, AccessSet>,
    changed_regs: u16,
    display: bool,
}
impl AccessObserver {
    /// Creates an observer with nothing recorded.
    pub fn new() -> Self {
        Default::default()
    }

    /// Forgets everything recorded.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Gets the accesses to the given memory location.
    pub fn get_mem_accesses(&self, addr: u16) -> AccessSet {
        self.mem.get(&addr).copied().unwrap_or_default()
    }

    /// Adds an access to the given memory location.
    pub fn update_mem_accesses(&mut self, addr: u16, set: AccessSet) {
        *self.mem.entry(addr).or_default() |= set;
    }

    /// Takes every recorded memory access (in address order), leaving none behind.
    pub fn take_mem_accesses(&mut self) -> impl Iterator<Item=(u16, AccessSet)> {
        std::mem::take(&mut self.mem).into_iter()
    }

    /// Records every register which differs between two states of the register file.
    pub fn update_regs(&mut self, before: &RegFile, after: &RegFile) {
        let changed = std::iter::zip(before.as_array(), after.as_array())
            .enumerate()
            .filter(|(_, (b, a))| b != a)
            .fold(0u16, |mask, (i, _)| mask | (1u16 << i));
        self.changed_regs |= changed;
    }

    /// Whether the given register changed.
    pub fn reg_changed(&self, reg: Reg) -> bool {
        self.changed_regs & (1u16 << reg.reg_no()) != 0
    }

    /// Records that the screen was drawn to or cleared.
    pub fn touch_display(&mut self) {
        self.display = true;
    }

    /// Whether the screen was drawn to or cleared.
    pub fn display_touched(&self) -> bool {
        self.display
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::reg_consts::{V0, V1, VF};
    use crate::sim::mem::RegFile;

    use super::{AccessObserver, AccessSet};

    #[test]
    fn test_mem_accesses() {
        let mut obs = AccessObserver::new();
        obs.update_mem_accesses(0x301, AccessSet::READ);
        obs.update_mem_accesses(0x300, AccessSet::write(1, 2));
        obs.update_mem_accesses(0x300, AccessSet::READ);

        let set = obs.get_mem_accesses(0x300);
        assert!(set.read() && set.modified());
        assert!(!obs.get_mem_accesses(0x302).accessed());

        let addrs: Vec<_> = obs.take_mem_accesses().map(|(a, _)| a).collect();
        assert_eq!(addrs, [0x300, 0x301]);
        assert!(!obs.get_mem_accesses(0x300).accessed());
    }

    #[test]
    fn test_regs_and_display() {
        let mut obs = AccessObserver::new();
        let before = RegFile::new();
        let mut after = before;
        after[V1] = 3;
        after[VF] = 1;
        obs.update_regs(&before, &after);

        assert!(obs.reg_changed(V1) && obs.reg_changed(VF));
        assert!(!obs.reg_changed(V0));

        assert!(!obs.display_touched());
        obs.touch_display();
        assert!(obs.display_touched());

        obs.clear();
        assert!(!obs.reg_changed(V1) && !obs.display_touched());
    }
}
