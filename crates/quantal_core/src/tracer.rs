//! Adaptive predictor–corrector tracing of the logit QRE curve.
//!
//! An Euler step along the curve tangent predicts the next point; Newton
//! iterations with the factorization frozen at the predicted point correct
//! back onto the zero set of the defining system. The tangent is read off
//! as the last row of the orthogonal factor, and a sign change between
//! successive tangents flips the orientation: the curve has folded back.
//! When a probability coordinate reaches the simplex boundary the
//! offending action is dropped from the support and tracing restarts on
//! the reduced problem at the same lambda.

use anyhow::{bail, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::game::{BehavProfile, Status, Support};
use crate::linalg::{newton_step, qr_decomp};
use crate::system::{jacobian, residual};

/// Hard ceiling on accepted plus rejected steps.
const MAX_ITERS: usize = 5000;
/// Newton convergence tolerance on the corrector distance.
const TOL: f64 = 1.0e-4;
/// Largest allowed per-step change factor for the stepsize.
const MAX_DECEL: f64 = 1.1;
/// Reject a corrector whose first distance reaches this.
const MAX_DIST: f64 = 0.4;
/// Reject when successive corrector distances contract slower than this.
const MAX_CONTR: f64 = 0.6;
/// Regularizer in the contraction-rate denominator.
const ETA: f64 = 0.1;
/// Initial stepsize.
const H_START: f64 = 0.03;
/// Give up on a branch once the stepsize falls below this.
const H_MIN: f64 = 1.0e-5;
/// Probability below which a coordinate has hit the simplex boundary.
const BOUNDARY: f64 = 1.0e-10;

/// One accepted point on the traced branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrePoint {
    pub lambda: f64,
    /// Profile coordinates on the support active when the point was
    /// emitted; shorter after a support reduction.
    pub profile: Vec<f64>,
}

/// Traces the branch through `(start, start_lambda)` until lambda leaves
/// `[0, max_lambda)` or a give-up condition is reached, appending accepted
/// points to `solutions`.
///
/// Iteration-cap and stepsize-collapse terminations return `Ok` with the
/// points accumulated so far. Errors are cancellation or numerical domain
/// faults; the facade swallows them and keeps the accumulated prefix.
pub fn trace_path<S: Support, St: Status>(
    support: &S,
    start: &S::Profile,
    start_lambda: f64,
    max_lambda: f64,
    mut omega: f64,
    status: &mut St,
    solutions: &mut Vec<QrePoint>,
) -> Result<()> {
    let n = support.profile_len();
    if start.values().len() != n {
        bail!(
            "start profile length {} does not match support length {n}",
            start.values().len()
        );
    }

    let mut profile = support.new_profile();
    let mut x = DVector::zeros(n + 1);
    x.as_mut_slice()[..n].copy_from_slice(start.values());
    x[n] = start_lambda;

    let mut u = DVector::zeros(n + 1);
    let mut y = DVector::zeros(n);
    let mut t = DVector::zeros(n + 1);
    let mut b = DMatrix::zeros(n + 1, n);
    let mut q = DMatrix::zeros(n + 1, n + 1);

    jacobian(support, &mut profile, &x, &mut b)?;
    qr_decomp(&mut b, &mut q);
    for k in 0..=n {
        t[k] = q[(n, k)];
    }

    for i in 0..n {
        if x[i] < BOUNDARY {
            return reduce_support(support, &x, i, max_lambda, status, solutions);
        }
    }

    solutions.push(QrePoint {
        lambda: x[n],
        profile: x.as_slice()[..n].to_vec(),
    });

    let mut h = H_START;
    let mut niters: usize = 0;

    while x[n] >= 0.0 && x[n] < max_lambda {
        status.check()?;
        if niters > MAX_ITERS {
            debug!(lambda = x[n], "iteration cap reached; abandoning branch");
            return Ok(());
        }
        if niters % 25 == 0 {
            status.set_progress(x[n] / max_lambda, &format!("lambda = {:.6}", x[n]));
        }
        niters += 1;

        if h.abs() <= H_MIN {
            debug!(lambda = x[n], "stepsize collapsed; abandoning branch");
            return Ok(());
        }

        // Predictor: Euler step along the oriented tangent.
        let mut accept = true;
        for k in 0..=n {
            u[k] = x[k] + h * omega * t[k];
            if k < n && u[k] < 0.0 {
                accept = false;
                break;
            }
        }
        if !accept {
            h *= 0.5;
            trace!(h, "predictor left the simplex; halving stepsize");
            continue;
        }

        let mut decel = 1.0 / MAX_DECEL;
        jacobian(support, &mut profile, &u, &mut b)?;
        qr_decomp(&mut b, &mut q);

        // Corrector: Newton iterations against the frozen factorization.
        let mut iter = 1;
        let mut disto = 0.0;
        loop {
            residual(support, &mut profile, &u, &mut y)?;
            let dist = newton_step(&q, &b, &mut u, &mut y);
            if dist >= MAX_DIST || (0..n).any(|i| u[i] < 0.0) {
                accept = false;
                break;
            }
            decel = decel.max((dist / MAX_DIST).sqrt() * MAX_DECEL);
            if iter >= 2 {
                let contr = dist / (disto + TOL * ETA);
                if contr > MAX_CONTR {
                    accept = false;
                    break;
                }
                decel = decel.max((contr / MAX_CONTR).sqrt() * MAX_DECEL);
            }
            if dist <= TOL {
                break;
            }
            disto = dist;
            iter += 1;
        }

        if !accept {
            h /= MAX_DECEL;
            trace!(h, "corrector rejected; reducing stepsize");
            if h.abs() <= H_MIN {
                debug!(lambda = x[n], "stepsize collapsed; abandoning branch");
                return Ok(());
            }
            continue;
        }

        decel = decel.min(MAX_DECEL);
        h = (h / decel).abs();

        for i in 0..n {
            if u[i] < BOUNDARY {
                return reduce_support(support, &u, i, max_lambda, status, solutions);
            }
        }
        x.copy_from(&u);

        solutions.push(QrePoint {
            lambda: x[n],
            profile: x.as_slice()[..n].to_vec(),
        });

        // Fresh tangent; a reversed inner product means a fold was crossed.
        let mut dot = 0.0;
        for k in 0..=n {
            dot += t[k] * q[(n, k)];
        }
        if dot < 0.0 {
            debug!(lambda = x[n], "tangent reversed across a fold; flipping orientation");
            omega = -omega;
        }
        for k in 0..=n {
            t[k] = q[(n, k)];
        }
    }

    Ok(())
}

/// Drops the action at flat position `index` of the profile and restarts
/// tracing on the reduced support from the projected point, sharing the
/// current lambda.
fn reduce_support<S: Support, St: Status>(
    support: &S,
    point: &DVector<f64>,
    index: usize,
    max_lambda: f64,
    status: &mut St,
    solutions: &mut Vec<QrePoint>,
) -> Result<()> {
    let lambda = point[point.len() - 1];
    let dropped = support.action_ids()[index];
    debug!(
        player = dropped.player,
        infoset = dropped.infoset,
        action = dropped.action,
        lambda,
        "probability hit the simplex boundary; reducing support"
    );

    let reduced = support.remove_action(dropped);
    let mut sub_start = reduced.new_profile();
    let values = sub_start.values_mut();
    for (j, value) in values.iter_mut().enumerate() {
        *value = if j < index { point[j] } else { point[j + 1] };
    }

    // The running orientation does not carry over a fold cleanly, so the
    // reduced branch starts with the forward orientation.
    trace_path(
        &reduced, &sub_start, lambda, max_lambda, 1.0, status, solutions,
    )
}
