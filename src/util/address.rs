use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A raw, untyped memory address.
///
/// Thin wrapper over `usize` so address arithmetic and alignment checks do
/// not go through raw-pointer casts everywhere.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(usize);

impl Address {
    pub const ZERO: Self = Self(0);

    #[inline(always)]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub const fn align_up(&self, align: usize) -> Address {
        debug_assert!(align.is_power_of_two());
        let mask = align - 1;
        Self((self.0 + mask) & !mask)
    }

    #[inline(always)]
    pub const fn align_down(&self, align: usize) -> Address {
        debug_assert!(align.is_power_of_two());
        let mask = align - 1;
        Self(self.0 & !mask)
    }

    #[inline(always)]
    pub const fn is_aligned_to(&self, align: usize) -> bool {
        debug_assert!(align.is_power_of_two());
        (self.0 & (align - 1)) == 0
    }

    #[inline(always)]
    pub const fn from_usize(v: usize) -> Self {
        Self(v)
    }

    #[inline(always)]
    pub const fn as_usize(&self) -> usize {
        self.0
    }

    #[inline(always)]
    pub const fn as_ptr<T>(&self) -> *const T {
        self.0 as _
    }

    #[inline(always)]
    pub const fn as_mut_ptr<T>(&self) -> *mut T {
        self.0 as _
    }
}

impl From<usize> for Address {
    #[inline(always)]
    fn from(value: usize) -> Self {
        Self(value)
    }
}

impl<T> From<*const T> for Address {
    #[inline(always)]
    fn from(value: *const T) -> Self {
        Self(value as usize)
    }
}

impl<T> From<*mut T> for Address {
    #[inline(always)]
    fn from(value: *mut T) -> Self {
        Self(value as usize)
    }
}

impl<T> From<&T> for Address {
    #[inline(always)]
    fn from(value: &T) -> Self {
        Self(value as *const T as usize)
    }
}

impl From<Address> for usize {
    #[inline(always)]
    fn from(value: Address) -> usize {
        value.0
    }
}

impl Add<usize> for Address {
    type Output = Self;

    #[inline(always)]
    fn add(self, other: usize) -> Self::Output {
        Self(self.0 + other)
    }
}

impl AddAssign<usize> for Address {
    #[inline(always)]
    fn add_assign(&mut self, other: usize) {
        *self = *self + other;
    }
}

impl Sub<usize> for Address {
    type Output = Self;

    #[inline(always)]
    fn sub(self, other: usize) -> Self::Output {
        Self(self.0 - other)
    }
}

impl SubAssign<usize> for Address {
    #[inline(always)]
    fn sub_assign(&mut self, other: usize) {
        *self = *self - other;
    }
}

impl Sub<Self> for Address {
    type Output = usize;

    #[inline(always)]
    fn sub(self, other: Self) -> Self::Output {
        debug_assert!(self.0 >= other.0);
        self.0 - other.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_ptr::<u8>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        let a = Address::from_usize(0x1001);
        assert_eq!(a.align_up(0x1000), Address::from_usize(0x2000));
        assert_eq!(a.align_down(0x1000), Address::from_usize(0x1000));
        assert!(!a.is_aligned_to(0x1000));
        assert!(a.align_up(0x1000).is_aligned_to(0x1000));
        assert_eq!(a.align_down(1), a);
    }

    #[test]
    fn arithmetic() {
        let a = Address::from_usize(0x4000);
        assert_eq!(a + 0x10usize, Address::from_usize(0x4010));
        assert_eq!(a - 0x10usize, Address::from_usize(0x3ff0));
        assert_eq!((a + 0x10usize) - a, 0x10);
        assert!(Address::ZERO.is_zero());
        assert!(!a.is_zero());
    }
}
