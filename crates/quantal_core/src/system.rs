//! The logit QRE defining system.
//!
//! For an augmented state `x = (profile, lambda)` the residual carries, per
//! information set, one sum-to-one row and one log-ratio row for every
//! action beyond the first. Each log-ratio row is scaled by the product of
//! the two probabilities involved, which clears the logarithmic singularity
//! at the simplex boundary and leaves a polynomially smooth residual.
//!
//! The Jacobian is stored transposed: state coordinates on rows, equations
//! on columns. QR of that matrix exposes the curve tangent as the last row
//! of the orthogonal factor; swapping the convention yields silently wrong
//! tangents.

use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};

use crate::game::{ActionId, BehavProfile, Support};

/// Reach probability below which cross-infoset derivative terms are
/// dropped rather than divided through.
const REACH_TOL: f64 = 1.0e-10;

fn load_profile<P: BehavProfile>(profile: &mut P, point: &DVector<f64>) -> f64 {
    let n = profile.len();
    profile.values_mut().copy_from_slice(&point.as_slice()[..n]);
    point[n]
}

/// Evaluates the residual `F(point)` into `lhs`.
///
/// `point` is the augmented state of length `N + 1`; `lhs` must have
/// length `N`. `profile` is a scratch profile of the support, overwritten
/// with the point's probability coordinates.
pub fn residual<S: Support>(
    support: &S,
    profile: &mut S::Profile,
    point: &DVector<f64>,
    lhs: &mut DVector<f64>,
) -> Result<()> {
    let n = profile.len();
    if point.len() != n + 1 || lhs.len() != n {
        bail!("residual buffer has incorrect dimension");
    }
    let lambda = load_profile(profile, point);

    lhs.fill(0.0);
    let mut row = 0;
    for pl in 0..support.num_players() {
        for iset in 0..support.num_infosets(pl) {
            let first = ActionId {
                player: pl,
                infoset: iset,
                action: 0,
            };
            for act in 0..support.num_actions(pl, iset) {
                lhs[row] += profile.prob(ActionId { action: act, ..first });
            }
            lhs[row] -= 1.0;
            row += 1;

            for act in 1..support.num_actions(pl, iset) {
                let id = ActionId { action: act, ..first };
                let mut value = (profile.prob(id) / profile.prob(first)).ln();
                value -= lambda * (profile.action_value(id) - profile.action_value(first));
                lhs[row] = value * profile.prob(first) * profile.prob(id);
                row += 1;
            }
        }
    }

    if !lhs.iter().all(|v| v.is_finite()) {
        bail!("non-finite residual at lambda = {lambda}");
    }
    Ok(())
}

/// Evaluates the Jacobian of the residual at `point` into `matrix`.
///
/// `matrix` is `(N + 1) × N`: rows follow the augmented state (profile
/// coordinates, then lambda), columns follow the equations in residual
/// order.
pub fn jacobian<S: Support>(
    support: &S,
    profile: &mut S::Profile,
    point: &DVector<f64>,
    matrix: &mut DMatrix<f64>,
) -> Result<()> {
    let n = profile.len();
    if point.len() != n + 1 || matrix.nrows() != n + 1 || matrix.ncols() != n {
        bail!("Jacobian buffer has incorrect dimension");
    }
    let lambda = load_profile(profile, point);
    let lambda_row = n;

    let mut col = 0;
    for pl1 in 0..support.num_players() {
        for iset1 in 0..support.num_infosets(pl1) {
            // Sum-to-one equation: 1 on the information set's own actions.
            let mut row = 0;
            for pl2 in 0..support.num_players() {
                for iset2 in 0..support.num_infosets(pl2) {
                    for _act2 in 0..support.num_actions(pl2, iset2) {
                        matrix[(row, col)] = if pl1 == pl2 && iset1 == iset2 {
                            1.0
                        } else {
                            0.0
                        };
                        row += 1;
                    }
                }
            }
            matrix[(lambda_row, col)] = 0.0;
            col += 1;

            let first = ActionId {
                player: pl1,
                infoset: iset1,
                action: 0,
            };
            for act1 in 1..support.num_actions(pl1, iset1) {
                let id1 = ActionId {
                    action: act1,
                    ..first
                };
                let scale = profile.prob(first) * profile.prob(id1);
                let mut row = 0;
                for pl2 in 0..support.num_players() {
                    for iset2 in 0..support.num_infosets(pl2) {
                        for act2 in 0..support.num_actions(pl2, iset2) {
                            let id2 = ActionId {
                                player: pl2,
                                infoset: iset2,
                                action: act2,
                            };
                            matrix[(row, col)] = if pl1 == pl2 && iset1 == iset2 {
                                if act2 == 0 {
                                    -profile.prob(id1)
                                } else if act2 == act1 {
                                    profile.prob(first)
                                } else {
                                    0.0
                                }
                            } else if profile.infoset_prob(pl1, iset1) < REACH_TOL {
                                // The conditional values behind the value
                                // derivatives divide by this reach
                                // probability; treat the term as vanished
                                // instead of dividing by it.
                                0.0
                            } else {
                                -lambda
                                    * scale
                                    * (profile.diff_action_value(id1, id2)
                                        - profile.diff_action_value(first, id2))
                            };
                            row += 1;
                        }
                    }
                }
                matrix[(lambda_row, col)] =
                    -scale * (profile.action_value(id1) - profile.action_value(first));
                col += 1;
            }
        }
    }

    if !matrix.iter().all(|v| v.is_finite()) {
        bail!("non-finite Jacobian at lambda = {lambda}");
    }
    Ok(())
}
