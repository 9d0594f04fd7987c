//! Interfaces to the externally-owned game representation and host status
//! channel. The engine only ever sees the game through these traits.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Identifies one action by `(player, infoset, action)` indices relative to
/// the active support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionId {
    pub player: usize,
    pub infoset: usize,
    pub action: usize,
}

/// A behavior profile over some support: one probability distribution per
/// information set, stored `(player, infoset, action)`-lexicographically.
///
/// During continuation the stored values are Newton iterates, not
/// necessarily feasible distributions; the derived quantities must evaluate
/// under whatever values are currently stored.
pub trait BehavProfile {
    /// Total number of probability coordinates.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat view of the coordinates, lexicographic in
    /// `(player, infoset, action)`.
    fn values(&self) -> &[f64];

    fn values_mut(&mut self) -> &mut [f64];

    /// Probability currently assigned to `id`.
    fn prob(&self, id: ActionId) -> f64;

    /// Expected continuation value of taking `id` at its information set,
    /// conditional on the information set being reached.
    fn action_value(&self, id: ActionId) -> f64;

    /// Partial derivative of `action_value(id)` with respect to the
    /// probability of `wrt`.
    fn diff_action_value(&self, id: ActionId, wrt: ActionId) -> f64;

    /// Reach probability of the information set under the stored values.
    fn infoset_prob(&self, player: usize, infoset: usize) -> f64;
}

/// The set of actions currently considered active, together with the game
/// structure behind it. Owned by the caller; `remove_action` must produce
/// an independent copy.
pub trait Support: Sized {
    type Profile: BehavProfile;

    fn num_players(&self) -> usize;

    fn num_infosets(&self, player: usize) -> usize;

    fn num_actions(&self, player: usize, infoset: usize) -> usize;

    /// Fresh zero-filled profile of the right length for this support.
    fn new_profile(&self) -> Self::Profile;

    /// Copy of this support with `id` dropped; the receiver is unchanged.
    /// Remaining actions of the information set keep their relative order
    /// and are renumbered contiguously.
    fn remove_action(&self, id: ActionId) -> Self;

    /// Total profile length across all information sets.
    fn profile_len(&self) -> usize {
        let mut len = 0;
        for pl in 0..self.num_players() {
            for iset in 0..self.num_infosets(pl) {
                len += self.num_actions(pl, iset);
            }
        }
        len
    }

    /// All active actions in flat profile order.
    fn action_ids(&self) -> Vec<ActionId> {
        let mut ids = Vec::with_capacity(self.profile_len());
        for player in 0..self.num_players() {
            for infoset in 0..self.num_infosets(player) {
                for action in 0..self.num_actions(player, infoset) {
                    ids.push(ActionId {
                        player,
                        infoset,
                        action,
                    });
                }
            }
        }
        ids
    }

    /// The centroid profile: uniform over every information set.
    fn centroid(&self) -> Self::Profile {
        let mut profile = self.new_profile();
        let mut pos = 0;
        for pl in 0..self.num_players() {
            for iset in 0..self.num_infosets(pl) {
                let n = self.num_actions(pl, iset);
                for _ in 0..n {
                    profile.values_mut()[pos] = 1.0 / n as f64;
                    pos += 1;
                }
            }
        }
        profile
    }
}

/// Host status channel polled by the tracer.
pub trait Status {
    /// Poll for cancellation. An `Err` aborts the trace; the facade
    /// swallows it and keeps whatever has been accumulated.
    fn check(&mut self) -> Result<()>;

    /// Advisory progress callback; `fraction` is in `[0, 1]`.
    fn set_progress(&mut self, fraction: f64, label: &str);
}

/// Status that never cancels and discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStatus;

impl Status for NullStatus {
    fn check(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_progress(&mut self, _fraction: f64, _label: &str) {}
}
