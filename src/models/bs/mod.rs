// Closed-form European pricing under constant volatility with a continuous
// dividend yield. Degenerate horizons and zero volatility collapse to the
// discounted intrinsic value.

use super::utils::{ensure_finite, ensure_non_negative, ensure_positive};
use super::OptionSide;
use crate::error::MispriceResult;

fn norm_cdf(x: f64) -> f64 {
    // 0.5 * [1 + erf(x / sqrt(2))]
    0.5 * (1.0 + libm::erf(x / std::f64::consts::SQRT_2))
}

/// Price of a European option under Black-Scholes assumptions.
///
/// Fails with `InvalidParameter` unless `spot > 0`, `strike > 0`, `t >= 0`,
/// `sigma >= 0` and `q >= 0`.
#[allow(non_snake_case)]
pub fn bs_price(
    S: f64,
    K: f64,
    T: f64,
    r: f64,
    sigma: f64,
    side: OptionSide,
    q: f64,
) -> MispriceResult<f64> {
    ensure_positive("spot", S)?;
    ensure_positive("strike", K)?;
    ensure_non_negative("time to expiry", T)?;
    ensure_non_negative("volatility", sigma)?;
    ensure_non_negative("dividend yield", q)?;
    ensure_finite("risk-free rate", r)?;

    let fwd_spot = S * (-q * T).exp();
    let disc_strike = K * (-r * T).exp();

    if T == 0.0 || sigma == 0.0 {
        return Ok(match side {
            OptionSide::Call => (fwd_spot - disc_strike).max(0.0),
            OptionSide::Put => (disc_strike - fwd_spot).max(0.0),
        });
    }

    let vol_sqrt_t = sigma * T.sqrt();
    let d1 = ((S / K).ln() + (r - q + 0.5 * sigma.powi(2)) * T) / vol_sqrt_t;
    let d2 = d1 - vol_sqrt_t;

    Ok(match side {
        OptionSide::Call => fwd_spot * norm_cdf(d1) - disc_strike * norm_cdf(d2),
        OptionSide::Put => disc_strike * norm_cdf(-d2) - fwd_spot * norm_cdf(-d1),
    })
}

/// Price of a European call option under Black-Scholes assumptions.
#[allow(non_snake_case)]
pub fn bs_call_price(S: f64, K: f64, r: f64, q: f64, T: f64, sigma: f64) -> MispriceResult<f64> {
    bs_price(S, K, T, r, sigma, OptionSide::Call, q)
}

/// Price of a European put option under Black-Scholes assumptions.
#[allow(non_snake_case)]
pub fn bs_put_price(S: f64, K: f64, r: f64, q: f64, T: f64, sigma: f64) -> MispriceResult<f64> {
    bs_price(S, K, T, r, sigma, OptionSide::Put, q)
}
