//! Dense linear-algebra kernel for the path tracer: plane rotations, a
//! row-sweep QR factorization with explicit orthogonal factor, and the
//! Newton corrector step.
//!
//! The matrix handed to [`qr_decomp`] is the transposed Jacobian of the
//! defining system: state coordinates on rows, equations on columns, so it
//! has one more row than column. After reduction the last row of `Q` spans
//! the one-dimensional kernel of the Jacobian and is the curve tangent.
//! None of these routines allocate; all scratch storage is caller-owned.

use nalgebra::{DMatrix, DVector};

/// Plane rotation zeroing `b[(l2, m)]` into `b[(l1, m)]`.
///
/// The rotation is accumulated into every column of `q` and applied to
/// columns `l3..` of `b`; columns left of `l3` are already reduced and
/// must not be touched. If both pivot entries are zero the call leaves
/// both matrices unmodified.
pub fn givens(
    b: &mut DMatrix<f64>,
    q: &mut DMatrix<f64>,
    l1: usize,
    l2: usize,
    m: usize,
    l3: usize,
) {
    let c1 = b[(l1, m)];
    let c2 = b[(l2, m)];
    if c1.abs() + c2.abs() == 0.0 {
        return;
    }

    // |c_max| * sqrt(1 + (c_min/c_max)^2); the naive sqrt(c1^2 + c2^2)
    // overflows on the entries that arise at high lambda.
    let sn = if c2.abs() >= c1.abs() {
        c2.abs() * (1.0 + (c1 / c2) * (c1 / c2)).sqrt()
    } else {
        c1.abs() * (1.0 + (c2 / c1) * (c2 / c1)).sqrt()
    };
    let s1 = c1 / sn;
    let s2 = c2 / sn;

    for k in 0..q.ncols() {
        let sv1 = q[(l1, k)];
        let sv2 = q[(l2, k)];
        q[(l1, k)] = s1 * sv1 + s2 * sv2;
        q[(l2, k)] = -s2 * sv1 + s1 * sv2;
    }

    for k in l3..b.ncols() {
        let sv1 = b[(l1, k)];
        let sv2 = b[(l2, k)];
        b[(l1, k)] = s1 * sv1 + s2 * sv2;
        b[(l2, k)] = -s2 * sv1 + s1 * sv2;
    }

    b[(l1, m)] = sn;
    b[(l2, m)] = 0.0;
}

/// Reduces `b` to upper-triangular form in place, accumulating the applied
/// rotations into `q` so that `qᵀ · b_out = b_in` with `q` orthogonal.
pub fn qr_decomp(b: &mut DMatrix<f64>, q: &mut DMatrix<f64>) {
    q.fill_with_identity();
    for m in 0..b.ncols() {
        for k in (m + 1)..b.nrows() {
            givens(b, q, m, k, m, m + 1);
        }
    }
}

/// One Newton correction reusing a factorization from [`qr_decomp`].
///
/// Solves `bᵀ · z = y` by forward substitution (`b` is upper-triangular,
/// so its transpose is lower-triangular), forms the correction through the
/// leading rows of `q`, subtracts it from `u` in place, and returns the
/// correction's Euclidean norm. `y` is consumed as scratch.
pub fn newton_step(
    q: &DMatrix<f64>,
    b: &DMatrix<f64>,
    u: &mut DVector<f64>,
    y: &mut DVector<f64>,
) -> f64 {
    for k in 0..b.ncols() {
        for l in 0..k {
            y[k] = y[k] - b[(l, k)] * y[l];
        }
        y[k] /= b[(k, k)];
    }

    let mut d = 0.0;
    for k in 0..b.nrows() {
        let mut s = 0.0;
        for l in 0..b.ncols() {
            s += q[(l, k)] * y[l];
        }
        u[k] -= s;
        d += s * s;
    }
    d.sqrt()
}
