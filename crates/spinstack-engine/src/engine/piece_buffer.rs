use std::{collections::VecDeque, fmt, str::FromStr};

use rand::{
    Rng, SeedableRng as _,
    distr::{Distribution, StandardUniform},
    seq::SliceRandom,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::PieceKind;

/// Queue of upcoming pieces plus the hold slot.
///
/// Pieces are drawn with the 7-bag system: each bag holds one of every kind,
/// shuffled, and a new bag is appended whenever 7 or fewer pieces remain, so
/// the preview is always at least 8 pieces long.
///
/// # Example
///
/// ```
/// use spinstack_engine::{PieceBuffer, PieceKind};
///
/// let mut buffer = PieceBuffer::new();
/// let first = buffer.pop_next();
/// let held = buffer.hold(first);
/// assert_eq!(buffer.held_piece(), Some(first));
/// assert_ne!(buffer.next_pieces().count(), 0);
/// # let _ = held;
/// ```
#[derive(Debug, Clone)]
pub struct PieceBuffer {
    rng: Pcg32,
    bag: VecDeque<PieceKind>,
    held: Option<PieceKind>,
}

impl Default for PieceBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// 128-bit seed for the piece sequence.
///
/// Serialized as a 32 character hex string. Two buffers built from the same
/// seed deal the same pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceSeed([u8; 16]);

#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("invalid hex seed '{input}': expected 32 hex characters")]
pub struct ParseSeedError {
    input: String,
}

impl PieceSeed {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl FromStr for PieceSeed {
    type Err = ParseSeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseSeedError {
            input: s.to_owned(),
        };
        if s.len() != 32 {
            return Err(err());
        }
        let num = u128::from_str_radix(s, 16).map_err(|_| err())?;
        Ok(Self(num.to_be_bytes()))
    }
}

impl Serialize for PieceSeed {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl fmt::Display for PieceSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", u128::from_be_bytes(self.0))
    }
}

impl<'de> Deserialize<'de> for PieceSeed {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex_str = String::deserialize(deserializer)?;
        hex_str.parse().map_err(serde::de::Error::custom)
    }
}

impl Distribution<PieceSeed> for StandardUniform {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PieceSeed {
        let mut seed = [0; 16];
        rng.fill(&mut seed);
        PieceSeed(seed)
    }
}

impl PieceBuffer {
    /// Creates a buffer with a random seed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_seed(rand::rng().random())
    }

    #[must_use]
    pub fn with_seed(seed: PieceSeed) -> Self {
        let mut this = Self {
            rng: Pcg32::from_seed(seed.0),
            bag: VecDeque::with_capacity(PieceKind::LEN * 2),
            held: None,
        };
        this.fill_bag();
        this
    }

    fn fill_bag(&mut self) {
        while self.bag.len() <= PieceKind::LEN {
            let mut new_bag = PieceKind::ALL;
            new_bag.shuffle(&mut self.rng);
            self.bag.extend(new_bag);
        }
    }

    /// Draws the next piece and refills the bag if needed.
    ///
    /// # Panics
    ///
    /// Never in practice: the bag holds at least 8 pieces between draws.
    pub fn pop_next(&mut self) -> PieceKind {
        let next = self
            .bag
            .pop_front()
            .expect("piece bag is refilled after every draw");
        self.fill_bag();
        next
    }

    /// Returns an iterator over the upcoming pieces in order.
    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.bag.iter().copied()
    }

    /// Returns what piece would become active if hold were used now.
    #[must_use]
    pub fn peek_hold_result(&self) -> PieceKind {
        self.held
            .or_else(|| self.bag.front().copied())
            .unwrap_or(PieceKind::I)
    }

    /// Stores `current` in the hold slot and returns the piece to play next:
    /// the previously held piece, or the next one from the queue.
    pub fn hold(&mut self, current: PieceKind) -> PieceKind {
        self.held
            .replace(current)
            .unwrap_or_else(|| self.pop_next())
    }

    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_seed() -> PieceSeed {
        PieceSeed::from_bytes([
            0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
            0x77, 0x88,
        ])
    }

    #[test]
    fn test_every_bag_contains_each_kind_once() {
        let mut buffer = PieceBuffer::with_seed(fixed_seed());
        for _ in 0..5 {
            let mut bag: Vec<_> = (0..PieceKind::LEN).map(|_| buffer.pop_next()).collect();
            bag.sort();
            assert_eq!(bag, PieceKind::ALL.to_vec());
        }
    }

    #[test]
    fn test_preview_never_runs_short() {
        let mut buffer = PieceBuffer::with_seed(fixed_seed());
        for _ in 0..30 {
            assert!(buffer.next_pieces().count() > PieceKind::LEN);
            buffer.pop_next();
        }
    }

    #[test]
    fn test_hold_swaps_with_held_piece() {
        let mut buffer = PieceBuffer::with_seed(fixed_seed());
        let first = buffer.pop_next();
        let upcoming = buffer.peek_hold_result();

        let second = buffer.hold(first);
        assert_eq!(second, upcoming);
        assert_eq!(buffer.held_piece(), Some(first));
        assert_eq!(buffer.peek_hold_result(), first);

        let back = buffer.hold(second);
        assert_eq!(back, first);
        assert_eq!(buffer.held_piece(), Some(second));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut buffer1 = PieceBuffer::with_seed(fixed_seed());
        let mut buffer2 = PieceBuffer::with_seed(fixed_seed());
        for _ in 0..20 {
            assert_eq!(buffer1.pop_next(), buffer2.pop_next());
        }
    }

    #[test]
    fn test_seed_known_values() {
        let seed = PieceSeed::from_bytes([
            0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFE, 0xDC, 0xBA, 0x98, 0x76, 0x54,
            0x32, 0x10,
        ]);
        let serialized = serde_json::to_string(&seed).unwrap();
        assert_eq!(serialized, "\"0123456789abcdeffedcba9876543210\"");
        assert_eq!(seed.to_string(), "0123456789abcdeffedcba9876543210");

        let deserialized: PieceSeed = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, seed);

        let upper: PieceSeed = "0123456789ABCDEFFEDCBA9876543210".parse().unwrap();
        assert_eq!(upper, seed);
    }

    #[test]
    fn test_seed_rejects_bad_input() {
        for input in [
            "",
            "0123456789abcdef0123456789abcde",
            "0123456789abcdef0123456789abcdef0",
            "ghijklmnopqrstuvwxyzghijklmnopqr",
        ] {
            let err = input.parse::<PieceSeed>().unwrap_err();
            assert!(err.to_string().contains("invalid hex"));
            let json = format!("\"{input}\"");
            assert!(serde_json::from_str::<PieceSeed>(&json).is_err());
        }
    }
}
