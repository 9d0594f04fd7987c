//! The `quantal_core` crate traces a branch of the logistic quantal response
//! equilibrium (QRE) correspondence of an extensive-form game by numerical
//! continuation: adaptive Euler prediction along the curve tangent followed
//! by Newton correction back onto the zero set of the defining system.
//!
//! Key components:
//! - **Game**: `Support`, `BehavProfile`, `Status` — the seams to the
//!   externally-owned game representation and host environment.
//! - **Linalg**: Givens-rotation QR with explicit orthogonal factor and the
//!   Newton corrector step.
//! - **System**: residual and Jacobian of the logit QRE defining equations.
//! - **Tracer**: the adaptive predictor–corrector driver, including
//!   support-reduction restarts at the simplex boundary.
//! - **Logit**: the solver facade.

pub mod game;
pub mod linalg;
pub mod logit;
pub mod system;
pub mod tracer;
