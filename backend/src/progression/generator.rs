//! Generator matrix of the compartmental chain
//!
//! State evolves as `dX/dt = A X`. Column `j` of `A` holds the flows out of
//! compartment `j`:
//!
//! ```text
//! A[j+1, j] = rate_j              chain to the next compartment
//! A[sink, j] += 1                 infectious compartments feed the sink
//! A[j, j]   = -(rate_j + sink_j)  total outflow
//! ```
//!
//! The crossing edge from the last presymptomatic into the first
//! symptomatic compartment is scaled by the risk-posing fraction `f`. For
//! `f = 1` every column sums to zero; for `f < 1` the crossing column
//! loses `(1 - f) * rate`, the screened individuals leaving the chain.

use nalgebra::{DMatrix, DVector};

use crate::models::compartments::{CompartmentLayout, Phase};
use crate::models::parameters::ResidenceTimes;

/// Rate at which an infectious compartment feeds the risk sink
pub const SINK_RATE: f64 = 1.0;

/// Exit rate of every compartment: sub-compartment count over mean duration
///
/// The sink has no exit (rate 0).
pub fn exit_rates(layout: &CompartmentLayout, residence: &ResidenceTimes) -> DVector<f64> {
    let mut rates = DVector::zeros(layout.n_compartments());
    for phase in Phase::TRANSIENT {
        if let Some(tau) = residence.get(phase) {
            let rate = layout.sub_compartments(phase) as f64 / tau;
            for i in layout.phase_range(phase) {
                rates[i] = rate;
            }
        }
    }
    rates
}

/// Build the N x N generator
pub fn build_generator(
    layout: &CompartmentLayout,
    residence: &ResidenceTimes,
    risk_posing_fraction: f64,
) -> DMatrix<f64> {
    let n = layout.n_compartments();
    let sink = layout.sink();
    let rates = exit_rates(layout, residence);
    let infectious = layout.infectious_range();
    let crossing = layout.last_compartment(Phase::Presymptomatic);

    let mut a = DMatrix::zeros(n, n);
    for j in 0..sink {
        let forward = if j == crossing {
            risk_posing_fraction * rates[j]
        } else {
            rates[j]
        };
        a[(j + 1, j)] += forward;

        let to_sink = if infectious.contains(&j) { SINK_RATE } else { 0.0 };
        a[(sink, j)] += to_sink;
        a[(j, j)] = -(rates[j] + to_sink);
    }
    a
}
