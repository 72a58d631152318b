//! Position in the monitored message stream.

use super::types::Timestamp;

/// Highest message `ts` observed so far. In memory only; a restart starts
/// again from [`Timestamp::BEGINNING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    position: Timestamp,
}

impl Cursor {
    pub fn new() -> Self {
        Self {
            position: Timestamp::BEGINNING,
        }
    }

    /// Current position; the "newer than" argument for the next fetch.
    pub fn position(&self) -> Timestamp {
        self.position
    }

    /// Move forward to `observed` if it is newer. Never regresses.
    ///
    /// Returns `true` if the position changed.
    pub fn advance(&mut self, observed: Timestamp) -> bool {
        if observed > self.position {
            self.position = observed;
            true
        } else {
            false
        }
    }

    /// Whether `ts` is at or behind the current position.
    pub fn has_seen(&self, ts: Timestamp) -> bool {
        ts <= self.position
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn ts(v: rust_decimal::Decimal) -> Timestamp {
        Timestamp::new(v)
    }

    #[test]
    fn starts_at_beginning() {
        assert_eq!(Cursor::new().position(), Timestamp::BEGINNING);
        assert_eq!(Cursor::default(), Cursor::new());
    }

    #[test]
    fn advance_is_monotonic() {
        let mut cursor = Cursor::new();
        assert!(cursor.advance(ts(dec!(5))));
        assert!(!cursor.advance(ts(dec!(3))));
        assert_eq!(cursor.position(), ts(dec!(5)));
        assert!(cursor.advance(ts(dec!(5.000001))));
        assert_eq!(cursor.position(), ts(dec!(5.000001)));
    }

    #[test]
    fn advance_is_idempotent() {
        let mut cursor = Cursor::new();
        cursor.advance(ts(dec!(7)));
        assert!(!cursor.advance(ts(dec!(7))));
        assert!(!cursor.advance(ts(dec!(7.000))));
        assert_eq!(cursor.position(), ts(dec!(7)));
    }

    #[test]
    fn has_seen_includes_position() {
        let mut cursor = Cursor::new();
        cursor.advance(ts(dec!(3)));
        assert!(cursor.has_seen(ts(dec!(2))));
        assert!(cursor.has_seen(ts(dec!(3))));
        assert!(!cursor.has_seen(ts(dec!(3.5))));
    }
}
