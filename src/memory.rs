//! The virtual memory primitives everything else is built on.
//!
//! A *reservation* is a range of address space that is valid but
//! inaccessible; *committing* a sub-range backs it with physical memory on
//! demand. Both are identified purely by their `(address, no_pages)` pair —
//! no handle object exists, so callers must remember the exact pair to undo
//! the operation later.

use crate::util::Address;
use errno::{errno, Errno};
use spin::Lazy;
use std::fmt;
use std::ptr;

static PAGE_SIZE: Lazy<usize> = Lazy::new(|| {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    debug_assert!(size > 0);
    size as usize
});

/// The virtual memory page size of the process, queried once and cached.
///
/// All reservation and commit sizes are whole multiples of this. It is a
/// power of two, usually 4KiB.
pub fn page_size() -> usize {
    *PAGE_SIZE
}

/// An address-space call was rejected by the OS.
#[derive(Debug, Clone, Copy)]
pub struct MemoryMapError {
    errno: Errno,
}

impl MemoryMapError {
    fn last() -> Self {
        Self { errno: errno() }
    }

    /// The raw OS error code captured at the failure site.
    pub fn os_error(&self) -> i32 {
        self.errno.0
    }
}

impl fmt::Display for MemoryMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "address-space operation failed: {}", self.errno)
    }
}

impl std::error::Error for MemoryMapError {}

pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// Reserves `no_pages` contiguous pages of address space.
    ///
    /// The range is address-valid but must not be accessed until committed.
    /// Fails if the OS cannot find a free range (address-space exhaustion,
    /// quota limits).
    pub fn reserve(no_pages: usize) -> Result<Address, MemoryMapError> {
        debug_assert!(no_pages > 0);
        let bytes = match no_pages.checked_mul(page_size()) {
            Some(bytes) => bytes,
            None => return Err(MemoryMapError {
                errno: Errno(libc::ENOMEM),
            }),
        };
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                bytes,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            let err = MemoryMapError::last();
            log::debug!("reserving {} pages failed: {}", no_pages, err);
            return Err(err);
        }
        let start = Address::from(ptr);
        #[cfg(feature = "leak_check")]
        crate::leak::register(start, no_pages);
        Ok(start)
    }

    /// Returns a reserved range to the OS.
    ///
    /// `(start, no_pages)` must exactly match a prior successful
    /// [`reserve`](Self::reserve); a partial or mismatched release is
    /// undefined behavior.
    pub fn release(start: Address, no_pages: usize) {
        debug_assert!(!start.is_zero());
        #[cfg(feature = "leak_check")]
        crate::leak::unregister(start, no_pages);
        let result = unsafe { libc::munmap(start.as_mut_ptr(), no_pages * page_size()) };
        debug_assert_eq!(result, 0, "munmap rejected a live reservation");
    }

    /// Makes `no_pages` pages starting at `start` accessible, backed with
    /// physical memory on first touch.
    ///
    /// The range must lie within a reservation and not be committed yet.
    /// Fails under memory pressure.
    pub fn commit(start: Address, no_pages: usize) -> Result<Address, MemoryMapError> {
        debug_assert!(!start.is_zero() && start.is_aligned_to(page_size()));
        let result = unsafe {
            libc::mprotect(
                start.as_mut_ptr(),
                no_pages * page_size(),
                libc::PROT_READ | libc::PROT_WRITE,
            )
        };
        if result != 0 {
            let err = MemoryMapError::last();
            log::debug!("committing {} pages at {:?} failed: {}", no_pages, start, err);
            return Err(err);
        }
        Ok(start)
    }

    /// Puts committed pages back into the reserved state, dropping their
    /// physical backing while keeping the address range.
    ///
    /// `(start, no_pages)` must exactly match a prior
    /// [`commit`](Self::commit).
    pub fn decommit(start: Address, no_pages: usize) {
        debug_assert!(!start.is_zero() && start.is_aligned_to(page_size()));
        let bytes = no_pages * page_size();
        unsafe {
            #[cfg(target_os = "linux")]
            libc::madvise(start.as_mut_ptr(), bytes, libc::MADV_DONTNEED);
            #[cfg(target_os = "macos")]
            libc::madvise(start.as_mut_ptr(), bytes, libc::MADV_FREE);
            libc::mprotect(start.as_mut_ptr(), bytes, libc::PROT_NONE);
        }
    }
}
