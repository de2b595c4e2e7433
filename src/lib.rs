//! Virtual-memory-backed allocation.
//!
//! This crate manages raw OS address space directly instead of going through
//! a general-purpose heap. [`RawMemory`] wraps the four primitive calls
//! (reserve, release, commit, decommit) at page granularity;
//! [`VirtualMemoryAllocator`] turns arbitrary byte requests into
//! reserve+commit pairs; [`VirtualBlockAllocator`] reserves one large region
//! up front and commits fixed-size blocks out of it in stack order, as a
//! backend for arena-style consumers.
//!
//! Nothing here is internally synchronized except the page-size cache and
//! the optional leak registry; allocator instances must be confined to one
//! thread or serialized externally.

#[cfg(not(unix))]
compile_error!("vmem only supports unix-like targets");

pub mod util;

mod alloc;
mod block;
mod error;
#[cfg(feature = "leak_check")]
pub mod leak;
pub mod memory;

pub use alloc::{RawAllocator, VirtualMemoryAllocator};
pub use block::{MemoryBlock, VirtualBlockAllocator};
pub use error::{AllocatorInfo, OutOfMemory};
pub use memory::{page_size, MemoryMapError, RawMemory};
pub use util::Address;
