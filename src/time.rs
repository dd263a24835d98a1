//! Radio clock ticks

use crate::config::radio::TICKS_PER_SEC;
use core::fmt;
use core::ops::Add;

/// Monotonic radio-clock timestamp or span, in ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Ticks = Ticks(0);

    pub const fn from_secs(secs: u32) -> Self {
        Self(secs as u64 * TICKS_PER_SEC)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Self(ms * TICKS_PER_SEC / 1000)
    }

    pub const fn from_micros(us: u64) -> Self {
        Self(us * TICKS_PER_SEC / 1_000_000)
    }

    pub const fn as_millis(self) -> u64 {
        self.0 * 1000 / TICKS_PER_SEC
    }

    /// Span from `earlier` to `self`, zero if `earlier` is later
    pub const fn saturating_since(self, earlier: Ticks) -> Ticks {
        Ticks(self.0.saturating_sub(earlier.0))
    }
}

impl Add for Ticks {
    type Output = Ticks;

    fn add(self, rhs: Ticks) -> Ticks {
        Ticks(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_conversion() {
        assert_eq!(Ticks::from_secs(10).0, 10 * TICKS_PER_SEC);
        assert_eq!(Ticks::from_secs(2).as_millis(), 2000);
        assert_eq!(Ticks::from_millis(1000), Ticks::from_secs(1));
    }

    #[test]
    fn test_saturating_since() {
        let a = Ticks(100);
        let b = Ticks(40);
        assert_eq!(a.saturating_since(b), Ticks(60));
        assert_eq!(b.saturating_since(a), Ticks::ZERO);
    }
}
