//! XP curve and level-up transitions.

use log::debug;

use crate::idle::types::{PlayerState, Tone};

pub const BASE_XP: f64 = 100.0;
pub const XP_EXPONENT: f64 = 1.5;

/// XP needed to advance from `level` to `level + 1`.
pub fn xp_required_for_level(level: u32) -> u64 {
    (BASE_XP * (level.max(1) as f64).powf(XP_EXPONENT)).round() as u64
}

pub fn level_up_message(level: u32) -> String {
    format!("You reached level {}!", level)
}

/// Grant XP and apply every level-up it pays for.
///
/// A single offline replay can cross several thresholds, so this loops until
/// the remainder no longer covers the next level. Returns the levels reached,
/// in order.
pub fn apply_xp(state: &mut PlayerState, gained: u64) -> Vec<u32> {
    state.xp = state.xp.saturating_add(gained);
    let mut reached = Vec::new();
    loop {
        let threshold = xp_required_for_level(state.level);
        if state.xp < threshold {
            break;
        }
        state.xp -= threshold;
        state.level += 1;
        reached.push(state.level);
        state.log(Tone::Success, level_up_message(state.level));
    }
    if !reached.is_empty() {
        debug!("level up: now level {} with {} xp", state.level, state.xp);
    }
    reached
}
