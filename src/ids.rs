//! Time-derived identifiers.

use chrono::Utc;

/// Hands out millisecond timestamps as ids, bumping by one whenever the clock
/// has not advanced past the last id issued.
#[derive(Debug, Default, Clone)]
pub struct IdClock {
    last: i64,
}

impl IdClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> i64 {
        self.next_at(Utc::now().timestamp_millis())
    }

    pub fn next_at(&mut self, now_millis: i64) -> i64 {
        let id = now_millis.max(self.last + 1);
        self.last = id;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_tick_ids_are_unique() {
        let mut clock = IdClock::new();
        let a = clock.next_at(1_700_000_000_000);
        let b = clock.next_at(1_700_000_000_000);
        let c = clock.next_at(1_700_000_000_000);
        assert_eq!(a, 1_700_000_000_000);
        assert_eq!(b, a + 1);
        assert_eq!(c, a + 2);
    }

    #[test]
    fn test_clock_going_backwards_still_increases() {
        let mut clock = IdClock::new();
        let a = clock.next_at(5_000);
        let b = clock.next_at(4_000);
        assert!(b > a);
    }

    #[test]
    fn test_real_clock_is_monotonic() {
        let mut clock = IdClock::new();
        let ids: Vec<i64> = (0..100).map(|_| clock.next()).collect();
        assert!(ids.windows(2).all(|w| w[1] > w[0]));
    }
}
