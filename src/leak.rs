//! Process-wide bookkeeping of live reservations.
//!
//! Every successful reserve is recorded here and removed again on release.
//! Anything still present at process teardown is a reservation whose owner
//! was destroyed without releasing it, or never destroyed at all.

use crate::util::Address;
use ctor::dtor;
use spin::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Reservation {
    start: Address,
    no_pages: usize,
}

static LIVE: Mutex<Vec<Reservation>> = Mutex::new(Vec::new());

pub(crate) fn register(start: Address, no_pages: usize) {
    LIVE.lock().push(Reservation { start, no_pages });
}

pub(crate) fn unregister(start: Address, no_pages: usize) {
    let mut live = LIVE.lock();
    let index = live.iter().position(|r| *r == Reservation { start, no_pages });
    debug_assert!(
        index.is_some(),
        "released an unknown reservation: {} pages at {:?}",
        no_pages,
        start
    );
    if let Some(index) = index {
        live.swap_remove(index);
    }
}

/// The number of reservations currently live in the process.
///
/// Hosts that want to verify cleanliness before the teardown hook runs can
/// assert this is zero once every allocator is gone.
pub fn live_reservations() -> usize {
    LIVE.lock().len()
}

#[cfg(test)]
pub(crate) fn is_registered(start: Address) -> bool {
    LIVE.lock().iter().any(|r| r.start == start)
}

#[dtor]
fn verify_at_teardown() {
    let live = LIVE.lock();
    if live.is_empty() {
        return;
    }
    for r in live.iter() {
        eprintln!(
            "vmem: leaked reservation of {} pages at {:?}",
            r.no_pages, r.start
        );
    }
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RawMemory;

    #[test]
    fn reservations_are_tracked_until_release() {
        let start = RawMemory::reserve(2).unwrap();
        assert!(is_registered(start));
        RawMemory::release(start, 2);
        assert!(!is_registered(start));
    }
}
