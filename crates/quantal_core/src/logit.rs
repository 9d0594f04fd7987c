//! Solver facade: configure the trace, start at the centroid, swallow
//! aborts, and select the requested slice of the output.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{Status, Support};
use crate::tracer::{trace_path, QrePoint};

fn default_max_lambda() -> f64 {
    30.0
}

fn default_step_size() -> f64 {
    1.0e-4
}

/// Configuration and entry point for computing the principal branch of the
/// logit QRE correspondence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LogitSolver {
    /// Trace until lambda reaches this value.
    #[serde(default = "default_max_lambda")]
    pub max_lambda: f64,
    /// Advisory initial-step hint; the tracer controls its own stepsize.
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    /// Keep every accepted point instead of only the terminal one.
    #[serde(default)]
    pub full_graph: bool,
}

impl Default for LogitSolver {
    fn default() -> Self {
        Self {
            max_lambda: default_max_lambda(),
            step_size: default_step_size(),
            full_graph: false,
        }
    }
}

impl LogitSolver {
    /// Traces the branch starting from the centroid at lambda = 0.
    ///
    /// Returns every accepted point when `full_graph` is set, otherwise
    /// only the last one — the best available approximation of the
    /// largest-lambda equilibrium on the branch. Cancellation and
    /// numerical faults end the trace early and are swallowed; the points
    /// accumulated up to that moment are returned as-is.
    pub fn solve<S: Support, St: Status>(&self, support: &S, status: &mut St) -> Vec<QrePoint> {
        let mut solutions = Vec::new();
        let start = support.centroid();
        if let Err(err) = trace_path(
            support,
            &start,
            0.0,
            self.max_lambda,
            1.0,
            status,
            &mut solutions,
        ) {
            debug!("trace ended early: {err:#}");
        }

        if !self.full_graph && solutions.len() > 1 {
            let keep = solutions.len() - 1;
            solutions.drain(..keep);
        }
        solutions
    }
}
