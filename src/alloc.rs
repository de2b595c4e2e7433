//! The stateless node allocator.

use crate::error::{AllocatorInfo, OutOfMemory};
use crate::memory::{page_size, RawMemory};
use crate::util::Address;

/// Guard pages placed on each side of a node allocation.
const FENCE_PAGES: usize = if cfg!(feature = "fence") { 1 } else { 0 };

/// The raw-allocator capability: node-granular allocation out of page-backed
/// memory.
///
/// `IS_STATEFUL == false` marks implementations that carry no instance
/// state; any two default-constructed instances are interchangeable, and
/// composition layers may specialize for the zero-sized case.
pub trait RawAllocator {
    const IS_STATEFUL: bool;

    /// Allocates a node of at least `size` bytes aligned to `alignment`.
    fn allocate_node(&mut self, size: usize, alignment: usize) -> Result<Address, OutOfMemory>;

    /// Deallocates a node.
    ///
    /// Must be called with the identical `(size, alignment)` pair the node
    /// was allocated with.
    fn deallocate_node(&mut self, node: Address, size: usize, alignment: usize);

    /// The biggest size `allocate_node` can be asked for.
    fn max_node_size(&self) -> usize;

    /// The biggest alignment `allocate_node` can satisfy.
    fn max_alignment(&self) -> usize;
}

/// A stateless [`RawAllocator`] sitting directly on the virtual memory
/// primitives. It never prereserves: every node is its own reservation,
/// committed in full right away.
///
/// With the `fence` feature enabled, one page before and one page after each
/// node stay reserved but uncommitted, so an access past either end of the
/// node faults immediately instead of touching adjacent memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VirtualMemoryAllocator;

impl VirtualMemoryAllocator {
    fn info() -> AllocatorInfo {
        AllocatorInfo::new("VirtualMemoryAllocator", Address::ZERO)
    }

    /// Pages needed to hold `size` contiguous bytes, guard pages excluded.
    fn node_pages(size: usize) -> usize {
        size.div_ceil(page_size()).max(1)
    }
}

impl RawAllocator for VirtualMemoryAllocator {
    const IS_STATEFUL: bool = false;

    /// The returned node is aligned to the page size, which covers every
    /// alignment request up to [`max_alignment`](RawAllocator::max_alignment).
    fn allocate_node(&mut self, size: usize, alignment: usize) -> Result<Address, OutOfMemory> {
        debug_assert!(
            alignment <= page_size(),
            "alignment above the page size cannot be satisfied"
        );
        let pages = Self::node_pages(size);
        let reserved = RawMemory::reserve(pages + 2 * FENCE_PAGES)
            .map_err(|_| OutOfMemory::new(Self::info(), size))?;
        let node = reserved + FENCE_PAGES * page_size();
        match RawMemory::commit(node, pages) {
            Ok(node) => Ok(node),
            Err(_) => {
                RawMemory::release(reserved, pages + 2 * FENCE_PAGES);
                Err(OutOfMemory::new(Self::info(), size))
            }
        }
    }

    fn deallocate_node(&mut self, node: Address, size: usize, _alignment: usize) {
        let pages = Self::node_pages(size);
        RawMemory::decommit(node, pages);
        RawMemory::release(node - FENCE_PAGES * page_size(), pages + 2 * FENCE_PAGES);
    }

    fn max_node_size(&self) -> usize {
        usize::MAX
    }

    fn max_alignment(&self) -> usize {
        page_size()
    }
}
