//! Head-on collision detection over full-tick position snapshots
//!
//! Detection is a pure function of the before/after snapshots: it flags
//! the net effect of a tick (two oppositely-goaled agents exchanging the
//! two waypoints) even though agents moved one after another within the
//! tick. Penalty application is the caller's concern.

use crate::grid::{Cell, Waypoints};

/// True if agents `i` and `j` performed a head-on swap this tick
///
/// Qualifies only when the goals differ and the realized moves are exact
/// inverses between the episode waypoints: one agent went A→B while the
/// other went B→A, each toward its own goal.
fn is_head_on_swap(
    before_i: Cell,
    after_i: Cell,
    goal_i: Cell,
    before_j: Cell,
    after_j: Cell,
    goal_j: Cell,
    waypoints: &Waypoints,
) -> bool {
    if goal_i == goal_j {
        return false;
    }
    let a = waypoints.a;
    let b = waypoints.b;
    let i_a_to_b = before_i == a && after_i == b && goal_i == b;
    let j_b_to_a = before_j == b && after_j == a && goal_j == a;
    let i_b_to_a = before_i == b && after_i == a && goal_i == a;
    let j_a_to_b = before_j == a && after_j == b && goal_j == b;
    (i_a_to_b && j_b_to_a) || (i_b_to_a && j_a_to_b)
}

/// Find all head-on swaps between the tick's start and end snapshots
///
/// Returns unordered agent pairs as `(i, j)` with `i < j`, each counted
/// exactly once. Pairwise O(n²), fine for the small fixed rosters used
/// here.
pub fn detect_head_on_swaps(
    before: &[Cell],
    after: &[Cell],
    goals: &[Cell],
    waypoints: &Waypoints,
) -> Vec<(usize, usize)> {
    debug_assert_eq!(before.len(), after.len());
    debug_assert_eq!(before.len(), goals.len());

    let mut pairs = Vec::new();
    for i in 0..before.len() {
        for j in (i + 1)..before.len() {
            if is_head_on_swap(
                before[i],
                after[i],
                goals[i],
                before[j],
                after[j],
                goals[j],
                waypoints,
            ) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}
