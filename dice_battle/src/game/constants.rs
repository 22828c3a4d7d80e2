//! Game-wide defaults.

use super::entities::Stat;

/// Players required before the first round can start.
pub const MIN_PLAYERS: usize = 2;

/// Faces on the dice used for speed, attack and defense rolls.
pub const DEFAULT_DICE_EDGES: u32 = 6;

/// Rounds played before a stalemate is called a draw.
pub const DEFAULT_MAX_ROUNDS: u32 = 50;

/// Speed-tie rerolls allowed within a single round. Past this, ties are
/// broken by join order.
pub const DEFAULT_MAX_ROUND_RESETS: u32 = 32;

/// Stats that an attack can reduce.
pub const DAMAGEABLE_STATS: [Stat; 2] = [Stat::Attack, Stat::Defense];
