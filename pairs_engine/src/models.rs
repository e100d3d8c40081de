pub(crate) mod ols;
pub mod ou_process;
pub mod pair_stats;
pub mod spread;

use serde::{Deserialize, Serialize};

pub use ou_process::OuParams;
pub use pair_stats::PairStatistics;
pub use spread::SpreadModel;

/// Direction of the single spread position slot.
///
/// LongSpread  = long asset 2, short asset 1 (spread expected to rise)
/// ShortSpread = short asset 2, long asset 1 (spread expected to fall)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Flat,
    LongSpread,
    ShortSpread,
}

impl Direction {
    /// +1 long spread, −1 short spread, 0 flat.
    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Flat => 0,
            Direction::LongSpread => 1,
            Direction::ShortSpread => -1,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Direction::Flat
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Direction::Flat => "Flat",
            Direction::LongSpread => "Long Spread",
            Direction::ShortSpread => "Short Spread",
        };
        f.write_str(s)
    }
}
