use crate::util::Address;
use std::error::Error;
use std::fmt;

/// Identifies the allocator an error originated from, by type name and
/// instance address.
///
/// Stateless allocators (and constructors that fail before an instance
/// exists) report [`Address::ZERO`] as the instance address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorInfo {
    name: &'static str,
    allocator: Address,
}

impl AllocatorInfo {
    pub const fn new(name: &'static str, allocator: Address) -> Self {
        Self { name, allocator }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn allocator(&self) -> Address {
        self.allocator
    }
}

impl fmt::Display for AllocatorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.allocator.is_zero() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} at {:?}", self.name, self.allocator)
        }
    }
}

/// The OS could not reserve or commit the requested memory, or an allocator
/// ran out of capacity.
///
/// `requested` is the size the caller asked for, before any rounding to page
/// granularity, so the report matches what the caller actually did.
#[derive(Debug, Clone, Copy)]
pub struct OutOfMemory {
    info: AllocatorInfo,
    requested: usize,
}

impl OutOfMemory {
    pub(crate) fn new(info: AllocatorInfo, requested: usize) -> Self {
        log::debug!("{} failed to serve {} bytes", info, requested);
        Self { info, requested }
    }

    /// The allocator the request was made against.
    pub const fn info(&self) -> AllocatorInfo {
        self.info
    }

    /// The originally requested size in bytes.
    pub const fn requested_size(&self) -> usize {
        self.requested
    }
}

impl fmt::Display for OutOfMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "out of memory: {} failed to serve {} bytes",
            self.info, self.requested
        )
    }
}

impl Error for OutOfMemory {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_name_and_requested_size() {
        let err = OutOfMemory::new(AllocatorInfo::new("TestAllocator", Address::ZERO), 12345);
        assert_eq!(err.requested_size(), 12345);
        assert_eq!(err.info().name(), "TestAllocator");
        let message = err.to_string();
        assert!(message.contains("TestAllocator"));
        assert!(message.contains("12345"));
    }
}
