//! Cox-Ross-Rubinstein binomial lattice.
//!
//! Only American puts are rolled back on the tree. European contracts and
//! American calls (whose early exercise is not modeled) are delegated to the
//! closed-form pricer, so both paths agree wherever early exercise cannot matter.
//!
//! Pricing is vectorized over strikes: one lattice geometry (node spots,
//! up-probability, per-step discount) is built per call and shared by every strike.

use super::bs::bs_price;
use super::utils::{ensure_finite, ensure_non_negative, ensure_positive};
use super::{ExerciseStyle, OptionSide};
use crate::error::{MispriceError, MispriceResult};

/// Binomial lattice pricer with a fixed number of time steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticePricer {
    /// Number of tree steps (>= 1)
    pub steps: usize,
}

/// Shared tree parameters for one (T, r, sigma, q, steps) combination.
#[derive(Debug, Clone, Copy)]
struct Geometry {
    u: f64,
    p: f64,
    disc: f64,
}

impl Geometry {
    fn build(t: f64, r: f64, sigma: f64, q: f64, steps: usize) -> MispriceResult<Self> {
        let dt = t / steps as f64;
        let u = (sigma * dt.sqrt()).exp();
        let d = 1.0 / u;
        // With sigma == 0 both children coincide and p drops out.
        let p = if sigma == 0.0 {
            0.5
        } else {
            (((r - q) * dt).exp() - d) / (u - d)
        };
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(MispriceError::invalid_parameter(format!(
                "risk-neutral probability {p:.6} outside [0, 1]; {steps} steps is too coarse"
            )));
        }
        Ok(Self {
            u,
            p,
            disc: (-r * dt).exp(),
        })
    }
}

impl LatticePricer {
    pub fn new(steps: usize) -> Self {
        Self { steps }
    }

    /// Price every strike in `strikes` for one spot, horizon and volatility.
    ///
    /// Returns one price per strike, in input order.
    #[allow(clippy::too_many_arguments)]
    pub fn price(
        &self,
        spot: f64,
        strikes: &[f64],
        t: f64,
        r: f64,
        sigma: f64,
        side: OptionSide,
        exercise_style: ExerciseStyle,
        q: f64,
    ) -> MispriceResult<Vec<f64>> {
        if self.steps == 0 {
            return Err(MispriceError::invalid_parameter(
                "lattice steps must be >= 1",
            ));
        }
        ensure_positive("spot", spot)?;
        ensure_non_negative("volatility", sigma)?;
        for &k in strikes {
            ensure_positive("strike", k)?;
        }

        if exercise_style == ExerciseStyle::European || side == OptionSide::Call {
            return strikes
                .iter()
                .map(|&k| bs_price(spot, k, t, r, sigma, side, q))
                .collect();
        }

        self.price_american(spot, strikes, t, r, sigma, side, q)
    }

    /// Roll American contracts back through the lattice, checking for early
    /// exercise at every node. Only puts are supported.
    #[allow(clippy::too_many_arguments)]
    pub fn price_american(
        &self,
        spot: f64,
        strikes: &[f64],
        t: f64,
        r: f64,
        sigma: f64,
        side: OptionSide,
        q: f64,
    ) -> MispriceResult<Vec<f64>> {
        if side != OptionSide::Put {
            return Err(MispriceError::unsupported(
                "binomial lattice only supports American puts",
            ));
        }
        if self.steps == 0 {
            return Err(MispriceError::invalid_parameter(
                "lattice steps must be >= 1",
            ));
        }
        ensure_positive("spot", spot)?;
        ensure_positive("time to expiry", t)?;
        ensure_non_negative("volatility", sigma)?;
        ensure_non_negative("dividend yield", q)?;
        ensure_finite("risk-free rate", r)?;
        for &k in strikes {
            ensure_positive("strike", k)?;
        }

        let geometry = Geometry::build(t, r, sigma, q, self.steps)?;
        Ok(rollback_puts(spot, strikes, self.steps, geometry, true))
    }
}

/// Backward induction for a strip of puts sharing one tree.
///
/// Node `j` at level `n` has seen `j` up-moves and sits at `spot * u^(2j - n)`.
fn rollback_puts(
    spot: f64,
    strikes: &[f64],
    steps: usize,
    geometry: Geometry,
    early_exercise: bool,
) -> Vec<f64> {
    let Geometry { u, p, disc } = geometry;
    let node_spots = |level: usize| -> Vec<f64> {
        (0..=level)
            .map(|j| spot * u.powi(2 * j as i32 - level as i32))
            .collect()
    };

    let terminal = node_spots(steps);
    let mut values: Vec<Vec<f64>> = strikes
        .iter()
        .map(|&k| terminal.iter().map(|&s| (k - s).max(0.0)).collect())
        .collect();

    for level in (0..steps).rev() {
        let spots = node_spots(level);
        for (row, &k) in values.iter_mut().zip(strikes) {
            for (j, &s) in spots.iter().enumerate() {
                let continuation = disc * (p * row[j + 1] + (1.0 - p) * row[j]);
                row[j] = if early_exercise {
                    continuation.max((k - s).max(0.0))
                } else {
                    continuation
                };
            }
            row.truncate(level + 1);
        }
    }

    values.iter().map(|row| row[0]).collect()
}
