use std::f64::consts::PI;
use crate::types::{BSInputs, Greeks, OptionType};

pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Standard normal CDF (Abramowitz & Stegun 26.2.17, |error| < 7.5e-8).
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.2316419 * x.abs());
    let poly = k * (0.319381530
        + k * (-0.356563782
        + k * (1.781477937
        + k * (-1.821255978
        + k * 1.330274429))));

    let approx = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 {
        approx
    } else {
        1.0 - approx
    }
}

pub fn d1_d2(input: &BSInputs) -> (f64, f64) {
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let v = input.vol;
    let r = input.rate;

    let vol_sqrt_t = v * t.sqrt();
    let d1 = ((s / k).ln() + (r + 0.5 * v * v) * t) / vol_sqrt_t;
    let d2 = d1 - vol_sqrt_t;

    (d1, d2)
}

/// True when the inputs cannot produce finite Greeks: expired, quote-less
/// (zero vol) or non-positive prices. NaN inputs are degenerate too.
pub fn is_degenerate(input: &BSInputs) -> bool {
    !(input.time > 0.0 && input.vol > 0.0 && input.spot > 0.0 && input.strike > 0.0)
}

/// Closed-form Black-Scholes Greeks.
///
/// Degenerate inputs (see [`is_degenerate`]) yield [`Greeks::zero`] rather
/// than NaN or infinity. Gamma and vega do not depend on the option side and
/// are computed once, so they are bit-identical for a call and a put.
pub fn black_scholes_greeks(input: BSInputs) -> Greeks {
    if is_degenerate(&input) {
        return Greeks::zero();
    }

    let (d1, d2) = d1_d2(&input);
    let s = input.spot;
    let k = input.strike;
    let t = input.time;
    let v = input.vol;
    let r = input.rate;

    let pdf = norm_pdf(d1);
    let sqrt_t = t.sqrt();
    let discount = (-r * t).exp();

    let delta = match input.option_type {
        OptionType::Call => norm_cdf(d1),
        OptionType::Put => norm_cdf(d1) - 1.0,
    };

    let gamma = pdf / (s * v * sqrt_t);

    let vega = s * pdf * sqrt_t;

    let decay = -(s * pdf * v) / (2.0 * sqrt_t);
    let theta = match input.option_type {
        OptionType::Call => decay - r * k * discount * norm_cdf(d2),
        OptionType::Put => decay + r * k * discount * norm_cdf(-d2),
    };

    Greeks {
        delta,
        gamma,
        vega,
        theta,
    }
}
