//! Abstract action alphabet and legality filter.
//!
//! Ten abstract actions per round. Slots 2-8 are sizing actions whose
//! meaning depends on the street: preflop they raise *to* a multiple of
//! the current bet, postflop they bet a fraction of the pot (on top of any
//! call). Fold, check/call, and all-in occupy fixed slots on both streets.

use super::state::{NlheState, CHIP_EPS};
use crate::cfr::game::ActionMask;

/// Fold. Legal only when facing a bet.
pub const FOLD: u8 = 0;
/// Check when nothing is owed, otherwise call (capped at stack).
pub const CHECK_CALL: u8 = 1;
/// Push the remaining stack.
pub const ALL_IN: u8 = 9;

/// Preflop sizing slots raise to `multiplier * current bet`.
pub const PREFLOP_RAISE_MULT: [f64; 7] = [2.0, 2.5, 3.0, 4.0, 5.0, 7.5, 10.0];

/// Postflop sizing slots bet `fraction * pot` after calling.
pub const POSTFLOP_BET_FRAC: [f64; 7] = [0.33, 0.5, 0.66, 0.75, 1.0, 1.5, 2.0];

/// What applying an abstract action does to the acting player's chips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionEffect {
    /// Give up the hand.
    Fold,
    /// Set the player's round commitment to this total.
    ToTarget(f64),
}

/// Round commitment a sizing slot aims for, before legality filtering.
fn sizing_target(state: &NlheState, player: usize, slot: usize) -> f64 {
    if state.street.is_postflop() {
        let to_call = state.to_call(player);
        let pot_after_call = state.pot() + to_call;
        state.bets[player] + to_call + POSTFLOP_BET_FRAC[slot] * pot_after_call
    } else {
        PREFLOP_RAISE_MULT[slot] * state.max_bet()
    }
}

/// Legal abstract actions for the player to act.
///
/// Deterministic: identical states always produce identical masks. Sizing
/// slots must reach the min-raise and stay strictly below the stack; the
/// boundary case (raising exactly all chips) is expressed as `ALL_IN`,
/// which is always available.
pub fn legal_actions(state: &NlheState) -> ActionMask {
    let player = match state.to_act {
        Some(p) => p,
        None => return ActionMask::EMPTY,
    };

    let mut mask = ActionMask::EMPTY;
    let to_call = state.to_call(player);
    let stack = state.stacks[player];

    mask.insert(CHECK_CALL);
    if to_call > CHIP_EPS {
        mask.insert(FOLD);
    }
    if stack > CHIP_EPS {
        mask.insert(ALL_IN);
    }

    // Sizing slots need chips beyond the call.
    if stack <= to_call + CHIP_EPS {
        return mask;
    }

    let min_raise_total = state.max_bet() + state.last_raise;
    let affordable_total = state.bets[player] + stack;
    for slot in 0..PREFLOP_RAISE_MULT.len() {
        let target = sizing_target(state, player, slot);
        if target + CHIP_EPS >= min_raise_total && target < affordable_total - CHIP_EPS {
            mask.insert(2 + slot as u8);
        }
    }

    mask
}

/// Resolve an abstract action id into its chip effect for the player to
/// act. The id must be legal at this state.
pub fn action_effect(state: &NlheState, action: u8) -> ActionEffect {
    let player = state.to_act.expect("no player to act");
    match action {
        FOLD => ActionEffect::Fold,
        CHECK_CALL => {
            let capped = state.max_bet().min(state.bets[player] + state.stacks[player]);
            ActionEffect::ToTarget(capped.max(state.bets[player]))
        }
        ALL_IN => ActionEffect::ToTarget(state.bets[player] + state.stacks[player]),
        slot @ 2..=8 => ActionEffect::ToTarget(sizing_target(state, player, (slot - 2) as usize)),
        _ => panic!("unknown abstract action {}", action),
    }
}

/// Display label for an abstract action id.
pub fn action_label(action: u8) -> &'static str {
    match action {
        FOLD => "fold",
        CHECK_CALL => "check/call",
        2 => "r2x/b33",
        3 => "r2.5x/b50",
        4 => "r3x/b66",
        5 => "r4x/b75",
        6 => "r5x/b100",
        7 => "r7.5x/b150",
        8 => "r10x/b200",
        ALL_IN => "all-in",
        _ => "?",
    }
}
