
use option_misprice::models::bs::{bs_call_price, bs_put_price};
use option_misprice::models::OptionSide;
use option_misprice::{bs_price, ExerciseStyle, LatticePricer, MispriceError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Put-call parity must hold for the closed form across a random grid.
#[test]
fn test_put_call_parity_grid() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..500 {
        let s: f64 = rng.gen_range(20.0..400.0);
        let k: f64 = s * rng.gen_range(0.5..1.5);
        let t: f64 = rng.gen_range(0.01..3.0);
        let r: f64 = rng.gen_range(-0.01..0.08);
        let q: f64 = rng.gen_range(0.0..0.05);
        let sigma: f64 = rng.gen_range(0.05..1.2);

        let call = bs_call_price(s, k, r, q, t, sigma).unwrap();
        let put = bs_put_price(s, k, r, q, t, sigma).unwrap();
        let forward_gap = s * (-q * t).exp() - k * (-r * t).exp();
        assert!(
            (call - put - forward_gap).abs() < 1e-8 * s.max(k),
            "parity broken at S={s} K={k} T={t} r={r} q={q} sigma={sigma}"
        );
    }
}

#[test]
fn test_degenerate_inputs() {
    // Expiry today: intrinsic value, no discounting
    assert_eq!(bs_price(100.0, 90.0, 0.0, 0.05, 0.3, OptionSide::Call, 0.0).unwrap(), 10.0);
    assert_eq!(bs_price(100.0, 90.0, 0.0, 0.05, 0.3, OptionSide::Put, 0.0).unwrap(), 0.0);

    // Zero vol: discounted forward intrinsic
    let put = bs_price(100.0, 110.0, 1.0, 0.05, 0.0, OptionSide::Put, 0.0).unwrap();
    assert!((put - (110.0 * (-0.05f64).exp() - 100.0)).abs() < 1e-12);

    assert!(matches!(
        bs_price(-1.0, 100.0, 1.0, 0.05, 0.2, OptionSide::Call, 0.0),
        Err(MispriceError::InvalidParameter(_))
    ));
}

/// A deep lattice lands close to a much deeper one.
#[test]
fn test_american_put_converges_with_steps() {
    let strikes = [90.0, 100.0, 110.0];
    let coarse = LatticePricer::new(200)
        .price_american(100.0, &strikes, 0.5, 0.04, 0.3, OptionSide::Put, 0.0)
        .unwrap();
    let fine = LatticePricer::new(1000)
        .price_american(100.0, &strikes, 0.5, 0.04, 0.3, OptionSide::Put, 0.0)
        .unwrap();
    for (c, f) in coarse.iter().zip(&fine) {
        assert!((c - f).abs() < 2e-2, "coarse {c} vs fine {f}");
    }
}

/// Early exercise is worth something: American puts never trade below European
/// puts or below intrinsic.
#[test]
fn test_american_put_dominates_european() {
    let mut rng = StdRng::seed_from_u64(11);
    let pricer = LatticePricer::new(150);
    for _ in 0..40 {
        let s: f64 = 100.0;
        let k: f64 = rng.gen_range(70.0..130.0);
        let t: f64 = rng.gen_range(0.05..2.0);
        let r: f64 = rng.gen_range(0.0..0.08);
        let sigma: f64 = rng.gen_range(0.1..0.6);

        let american = pricer
            .price(s, &[k], t, r, sigma, OptionSide::Put, ExerciseStyle::American, 0.0)
            .unwrap()[0];
        let european = bs_price(s, k, t, r, sigma, OptionSide::Put, 0.0).unwrap();

        // Lattice discretization error is well inside this band at 150 steps
        assert!(american >= european - 5e-2, "K={k} T={t}: {american} < {european}");
        assert!(american >= (k - s).max(0.0) - 1e-12);
    }
}

#[test]
fn test_american_call_prices_as_european() {
    let pricer = LatticePricer::new(100);
    let strikes = [95.0, 100.0, 105.0];
    let american = pricer
        .price(100.0, &strikes, 0.4, 0.03, 0.25, OptionSide::Call, ExerciseStyle::American, 0.01)
        .unwrap();
    for (k, price) in strikes.iter().zip(american) {
        let european = bs_price(100.0, *k, 0.4, 0.03, 0.25, OptionSide::Call, 0.01).unwrap();
        assert_eq!(price, european);
    }
}

#[test]
fn test_lattice_rejects_zero_steps() {
    let res = LatticePricer::new(0).price(
        100.0,
        &[100.0],
        0.5,
        0.03,
        0.2,
        OptionSide::Put,
        ExerciseStyle::American,
        0.0,
    );
    assert!(matches!(res, Err(MispriceError::InvalidParameter(_))));
}
