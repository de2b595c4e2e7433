//! The block allocator: one big reservation handed out as fixed-size blocks
//! in stack order.

use crate::error::{AllocatorInfo, OutOfMemory};
use crate::memory::{page_size, RawMemory};
use crate::util::Address;

/// A contiguous chunk of memory handed out by a block allocator.
///
/// Plain value with no ownership logic; lifetime discipline is entirely the
/// allocator's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBlock {
    pub memory: Address,
    pub size: usize,
}

impl MemoryBlock {
    pub const fn new(memory: Address, size: usize) -> Self {
        Self { memory, size }
    }

    /// Whether `address` lies inside the block.
    pub fn contains(&self, address: Address) -> bool {
        self.memory <= address && address < self.memory + self.size
    }
}

/// A block allocator that reserves all its address space up front and
/// commits it block by block.
///
/// Blocks come back in strict last-in-first-out order; the arena layered on
/// top guarantees that ordering, it is not checked here beyond a debug
/// assertion. Meant for big blocks, not small allocations: every block costs
/// a commit or decommit call.
pub struct VirtualBlockAllocator {
    begin: Address,
    cur: Address,
    end: Address,
    block_size: usize,
}

impl VirtualBlockAllocator {
    /// Reserves `block_size * no_blocks` bytes of address space as a single
    /// reservation.
    ///
    /// `block_size` must be a non-zero multiple of the page size and
    /// `no_blocks` must be bigger than one.
    pub fn new(block_size: usize, no_blocks: usize) -> Result<Self, OutOfMemory> {
        debug_assert!(block_size > 0 && block_size % page_size() == 0);
        debug_assert!(no_blocks > 1);
        let total = block_size.checked_mul(no_blocks).ok_or_else(|| {
            OutOfMemory::new(Self::unbound_info(), usize::MAX)
        })?;
        let begin = RawMemory::reserve(total / page_size())
            .map_err(|_| OutOfMemory::new(Self::unbound_info(), total))?;
        Ok(Self {
            begin,
            cur: begin,
            end: begin + total,
            block_size,
        })
    }

    // Constructor failures happen before an instance address exists.
    const fn unbound_info() -> AllocatorInfo {
        AllocatorInfo::new("VirtualBlockAllocator", Address::ZERO)
    }

    fn info(&self) -> AllocatorInfo {
        AllocatorInfo::new("VirtualBlockAllocator", Address::from(self))
    }

    /// Commits the next block and hands it out.
    ///
    /// Fails without touching the OS once the capacity is exhausted, and
    /// without advancing state if the commit itself fails.
    pub fn allocate_block(&mut self) -> Result<MemoryBlock, OutOfMemory> {
        if self.cur == self.end {
            return Err(OutOfMemory::new(self.info(), self.block_size));
        }
        let memory = RawMemory::commit(self.cur, self.block_size / page_size())
            .map_err(|_| OutOfMemory::new(self.info(), self.block_size))?;
        self.cur += self.block_size;
        Ok(MemoryBlock::new(memory, self.block_size))
    }

    /// Decommits the most recently allocated block; the next
    /// [`allocate_block`](Self::allocate_block) call returns it again.
    ///
    /// `block` must be the current top block. Handing back any other block
    /// is undefined behavior; debug builds assert the ordering.
    pub fn deallocate_block(&mut self, block: MemoryBlock) {
        debug_assert_eq!(block.size, self.block_size);
        debug_assert!(
            !self.cur.is_zero() && self.cur != self.begin
                && block.memory == self.cur - self.block_size,
            "blocks must be deallocated in reverse allocation order"
        );
        RawMemory::decommit(block.memory, self.block_size / page_size());
        self.cur -= self.block_size;
    }

    /// The size of every block handed out, the `block_size` given to the
    /// constructor.
    pub fn next_block_size(&self) -> usize {
        self.block_size
    }

    /// How many more blocks can be committed before the capacity runs out.
    pub fn capacity_left(&self) -> usize {
        if self.block_size == 0 {
            // empty state after take()
            return 0;
        }
        (self.end - self.cur) / self.block_size
    }

    /// Transfers ownership of the reservation out of `self`, leaving it in
    /// an empty state whose destructor is a no-op.
    ///
    /// Blocks already handed out stay valid, they reference raw memory and
    /// not this object. `std::mem::swap` likewise exchanges two allocators'
    /// reservations without invalidating outstanding blocks.
    pub fn take(&mut self) -> Self {
        std::mem::replace(
            self,
            Self {
                begin: Address::ZERO,
                cur: Address::ZERO,
                end: Address::ZERO,
                block_size: 0,
            },
        )
    }
}

impl Drop for VirtualBlockAllocator {
    fn drop(&mut self) {
        if self.begin.is_zero() {
            return;
        }
        // One release covers the whole reservation; blocks still committed
        // at this point are discarded with it.
        RawMemory::release(self.begin, (self.end - self.begin) / page_size());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_allocator(no_blocks: usize) -> VirtualBlockAllocator {
        VirtualBlockAllocator::new(page_size(), no_blocks).unwrap()
    }

    #[test]
    fn capacity_counts_down_and_back_up() {
        let mut alloc = block_allocator(4);
        assert_eq!(alloc.next_block_size(), page_size());
        assert_eq!(alloc.capacity_left(), 4);
        let mut blocks = Vec::new();
        for i in 0..4 {
            let block = alloc.allocate_block().unwrap();
            assert_eq!(block.size, page_size());
            assert_eq!(alloc.capacity_left(), 3 - i);
            blocks.push(block);
        }
        assert!(alloc.allocate_block().is_err());
        assert_eq!(alloc.capacity_left(), 0);
        while let Some(block) = blocks.pop() {
            alloc.deallocate_block(block);
        }
        assert_eq!(alloc.capacity_left(), 4);
    }

    #[test]
    fn blocks_are_adjacent_and_writable() {
        let mut alloc = block_allocator(3);
        let b1 = alloc.allocate_block().unwrap();
        let b2 = alloc.allocate_block().unwrap();
        assert_eq!(b2.memory, b1.memory + b1.size);
        assert!(b1.contains(b1.memory));
        assert!(b1.contains(b1.memory + (b1.size - 1)));
        assert!(!b1.contains(b2.memory));
        unsafe {
            b1.memory.as_mut_ptr::<u8>().write(7);
            (b2.memory + (b2.size - 1)).as_mut_ptr::<u8>().write(9);
        }
        alloc.deallocate_block(b2);
        alloc.deallocate_block(b1);
    }

    #[test]
    fn lifo_reuse_returns_the_same_address() {
        let mut alloc = block_allocator(4);
        let b1 = alloc.allocate_block().unwrap();
        let b2 = alloc.allocate_block().unwrap();
        let b3 = alloc.allocate_block().unwrap();
        assert!(b1.memory < b2.memory && b2.memory < b3.memory);
        alloc.deallocate_block(b3);
        let again = alloc.allocate_block().unwrap();
        assert_eq!(again.memory, b3.memory);
        alloc.deallocate_block(again);
        alloc.deallocate_block(b2);
        alloc.deallocate_block(b1);
    }

    #[test]
    fn take_moves_ownership_and_empties_the_source() {
        let mut a = block_allocator(4);
        let block = a.allocate_block().unwrap();
        let b = a.take();
        assert_eq!(a.capacity_left(), 0);
        assert_eq!(a.next_block_size(), 0);
        assert_eq!(b.capacity_left(), 3);
        assert_eq!(b.next_block_size(), page_size());
        // the outstanding block still references live memory
        unsafe { block.memory.as_mut_ptr::<u8>().write(1) };
        drop(a);
        unsafe { assert_eq!(block.memory.as_ptr::<u8>().read(), 1) };
    }

    #[test]
    fn swap_exchanges_reservations() {
        let mut a = VirtualBlockAllocator::new(page_size(), 2).unwrap();
        let mut b = VirtualBlockAllocator::new(2 * page_size(), 3).unwrap();
        std::mem::swap(&mut a, &mut b);
        assert_eq!(a.next_block_size(), 2 * page_size());
        assert_eq!(a.capacity_left(), 3);
        assert_eq!(b.next_block_size(), page_size());
        assert_eq!(b.capacity_left(), 2);
    }

    #[test]
    fn exhaustion_reports_block_size_and_instance() {
        let mut alloc = VirtualBlockAllocator::new(page_size(), 2).unwrap();
        let b1 = alloc.allocate_block().unwrap();
        let b2 = alloc.allocate_block().unwrap();
        let err = alloc.allocate_block().unwrap_err();
        assert_eq!(err.requested_size(), page_size());
        assert_eq!(err.info().name(), "VirtualBlockAllocator");
        assert_eq!(err.info().allocator(), Address::from(&alloc));
        alloc.deallocate_block(b2);
        alloc.deallocate_block(b1);
    }

    #[test]
    fn dropping_with_committed_blocks_is_fine() {
        let mut alloc = block_allocator(4);
        let _b1 = alloc.allocate_block().unwrap();
        let _b2 = alloc.allocate_block().unwrap();
        // no explicit deallocation; Drop releases the whole reservation
    }
}
