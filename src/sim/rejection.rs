//! Policy declines
//!
//! Nothing in the game loop fails; actions are either applied or declined for
//! a reason the player can read in the console.

use thiserror::Error;

use crate::persistence::{Booster, StoreItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Too fast! Inputs must be {floor_ms}ms apart.")]
    RapidFire { floor_ms: u64 },
    #[error("Input '{id}' on cooldown ({cooldown_ms}ms).")]
    OnCooldown { id: String, cooldown_ms: u64 },
    #[error("Input '{id}' hit an empty space. No score.")]
    EmptySpace { id: String },
    #[error("Input '{id}' swallowed by a black hole.")]
    InsideHazard { id: String },
    #[error("Combo attempt too slow.")]
    ComboTooSlow,
    #[error("Combo '{id}' on cooldown.")]
    ComboOnCooldown { id: String },
    #[error("Not enough Crush Keys for {item} (costs {cost}, have {balance}).")]
    InsufficientCurrency {
        item: StoreItem,
        cost: u64,
        balance: u64,
    },
    #[error("No {booster} left.")]
    NotOwned { booster: Booster },
    #[error("Ultimate not ready ({meter}/{threshold}).")]
    UltimateNotReady { meter: u32, threshold: u32 },
    #[error("Session is not running.")]
    SessionInactive,
}
