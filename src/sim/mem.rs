//! Memory handling for the simulator.
//!
//! This module consists of:
//! - [`Mem`]: The memory.
//! - [`RegFile`]: The register file.

use crate::ast::Reg;
use crate::isa::MEM_SIZE;

use super::SimErr;

/// The simulator's memory.
///
/// This is a flat array of [`MEM_SIZE`] bytes, held in the heap.
///
/// Memory can be accessed with:
/// - indexing (`mem[addr]`), which panics if the address is out of bounds
/// - [`Mem::get`] and [`Mem::set`], which raise [`SimErr::MemOutOfBounds`] instead
/// - [`Mem::slice`] and [`Mem::slice_mut`] for multi-byte accesses
///
/// Note that accesses through these methods are not tracked by the simulator's observer.
/// For that, use [`Simulator::read_mem`] and [`Simulator::write_mem`].
///
/// [`Simulator::read_mem`]: super::Simulator::read_mem
/// [`Simulator::write_mem`]: super::Simulator::write_mem
pub struct Mem(Box<[u8; MEM_SIZE]>);

impl Mem {
    /// Creates a new zeroed memory array.
    pub fn new() -> Self {
        Self(Box::new([0; MEM_SIZE]))
    }

    /// Zeroes the memory array.
    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    /// Gets the byte at the given address.
    pub fn get(&self, addr: usize) -> Result<u8, SimErr> {
        self.0.get(addr).copied()
            .ok_or(SimErr::MemOutOfBounds(addr))
    }

    /// Sets the byte at the given address.
    pub fn set(&mut self, addr: usize, data: u8) -> Result<(), SimErr> {
        let cell = self.0.get_mut(addr)
            .ok_or(SimErr::MemOutOfBounds(addr))?;
        *cell = data;
        Ok(())
    }

    /// Reads the big-endian word at the given address.
    ///
    /// This returns `None` if either byte of the word is out of bounds.
    pub fn read_word(&self, addr: u16) -> Option<u16> {
        let addr = usize::from(addr);
        match self.0.get(addr..addr + 2)? {
            &[hi, lo] => Some(u16::from_be_bytes([hi, lo])),
            _ => None
        }
    }

    /// Gets `len` bytes starting at `addr`.
    ///
    /// If any of the bytes are out of bounds, this errors with the first such address.
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8], SimErr> {
        let end = bounds_check(addr, len)?;
        Ok(&self.0[addr..end])
    }

    /// Mutably gets `len` bytes starting at `addr`.
    ///
    /// If any of the bytes are out of bounds, this errors with the first such address.
    pub fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], SimErr> {
        let end = bounds_check(addr, len)?;
        Ok(&mut self.0[addr..end])
    }

    /// Copies data into memory, starting at the given address.
    pub fn load(&mut self, addr: u16, data: &[u8]) -> Result<(), SimErr> {
        self.slice_mut(usize::from(addr), data.len())?
            .copy_from_slice(data);
        Ok(())
    }

    /// Gets a reference to the whole memory array.
    pub fn as_slice(&self) -> &[u8] {
        &*self.0
    }

    /// Gets a mutable reference to the whole memory array.
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        &mut *self.0
    }
}

/// Computes the end of the range `addr..addr + len`, checking it fits in memory.
fn bounds_check(addr: usize, len: usize) -> Result<usize, SimErr> {
    match addr.checked_add(len) {
        Some(end) if end <= MEM_SIZE => Ok(end),
        _ => Err(SimErr::MemOutOfBounds(addr.max(MEM_SIZE)))
    }
}

impl std::ops::Index<u16> for Mem {
    type Output = u8;

    fn index(&self, index: u16) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<u16> for Mem {
    fn index_mut(&mut self, index: u16) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}
impl Default for Mem {
    fn default() -> Self {
        Self::new()
    }
}
impl std::fmt::Debug for Mem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.0.iter().filter(|&&b| b != 0).count();
        f.debug_struct("Mem")
            .field("len", &self.0.len())
            .field("nonzero", &used)
            .finish()
    }
}

/// The register file.
///
/// This holds the 16 general purpose registers (`V0` to `VF`).
///
/// It can be indexed with a [`Reg`]:
///
/// ```
/// use chip8_ensemble::ast::reg_consts::V3;
/// use chip8_ensemble::sim::mem::RegFile;
///
/// let mut reg = RegFile::new();
/// reg[V3] = 0x2A;
/// assert_eq!(reg[V3], 0x2A);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegFile([u8; 16]);
impl RegFile {
    /// Creates a register file with every register zeroed.
    pub fn new() -> Self {
        Self([0; 16])
    }

    /// Gets the registers as an array.
    pub fn as_array(&self) -> &[u8; 16] {
        &self.0
    }

    /// Mutably gets the registers as an array.
    pub fn as_array_mut(&mut self) -> &mut [u8; 16] {
        &mut self.0
    }
}
impl std::ops::Index<Reg> for RegFile {
    type Output = u8;

    fn index(&self, index: Reg) -> &Self::Output {
        &self.0[usize::from(index)]
    }
}
impl std::ops::IndexMut<Reg> for RegFile {
    fn index_mut(&mut self, index: Reg) -> &mut Self::Output {
        &mut self.0[usize::from(index)]
    }
}

#[cfg(test)]
mod tests {
    use crate::isa::MEM_SIZE;
    use crate::sim::SimErr;

    use super::Mem;

    #[test]
    fn test_mem_bounds() {
        let mut mem = Mem::new();
        mem.set(0xFFF, 0x12).unwrap();
        assert_eq!(mem.get(0xFFF), Ok(0x12));
        assert_eq!(mem.get(MEM_SIZE), Err(SimErr::MemOutOfBounds(MEM_SIZE)));
        assert_eq!(mem.set(MEM_SIZE + 3, 0), Err(SimErr::MemOutOfBounds(MEM_SIZE + 3)));

        assert_eq!(mem.slice(0xFFD, 3).unwrap(), &[0, 0, 0x12]);
        assert_eq!(mem.slice(0xFFE, 3), Err(SimErr::MemOutOfBounds(MEM_SIZE)));
        assert_eq!(mem.slice(usize::MAX, 2), Err(SimErr::MemOutOfBounds(usize::MAX)));
    }

    #[test]
    fn test_read_word() {
        let mut mem = Mem::new();
        mem.load(0x200, &[0x63, 0x2A]).unwrap();
        assert_eq!(mem.read_word(0x200), Some(0x632A));
        assert_eq!(mem.read_word(0x201), Some(0x2A00));
        assert_eq!(mem.read_word(0xFFE), Some(0));
        assert_eq!(mem.read_word(0xFFF), None);

        assert!(mem.load(0xFFF, &[1, 2]).is_err());
        mem.clear();
        assert_eq!(mem[0x200], 0);
    }
}
