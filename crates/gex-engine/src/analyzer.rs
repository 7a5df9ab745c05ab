//! Curve analysis: walls, zero-gamma crossing and totals.
//!
//! Every function here is pure and treats degenerate inputs (empty curve,
//! one-sided exposure) as `None`, never as an error.

use crate::types::{CurveAnalysis, ExposureCurve};

/// Full analysis of one weighting view.
pub fn analyze(curve: &ExposureCurve, spot: f64) -> CurveAnalysis {
    let total_call_gex: f64 = curve.points().iter().map(|p| p.call_gex).sum();
    let total_put_gex: f64 = curve.points().iter().map(|p| p.put_gex).sum();

    CurveAnalysis {
        zero_gamma: zero_gamma(curve, spot),
        call_wall: call_wall(curve),
        put_wall: put_wall(curve),
        total_call_gex,
        total_put_gex,
        net_gex: total_call_gex + total_put_gex,
    }
}

/// Strike with the largest `call_gex`. Ties resolve to the lowest strike.
pub fn call_wall(curve: &ExposureCurve) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for point in curve.points() {
        match best {
            Some((_, value)) if point.call_gex <= value => {}
            _ => best = Some((point.strike, point.call_gex)),
        }
    }
    best.map(|(strike, _)| strike)
}

/// Strike with the most negative `put_gex`, among strikes with nonzero put
/// exposure. Ties resolve to the lowest strike.
pub fn put_wall(curve: &ExposureCurve) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for point in curve.points().iter().filter(|p| p.put_gex != 0.0) {
        match best {
            Some((_, value)) if point.put_gex >= value => {}
            _ => best = Some((point.strike, point.put_gex)),
        }
    }
    best.map(|(strike, _)| strike)
}

/// A place where net exposure changes sign.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Crossing {
    /// Opposite-signed neighbours at `i` and `i + 1`
    Between(usize),
    /// Net is exactly zero at `i`, with opposite signs on either side of the
    /// run of zeros that starts there
    At(usize),
}

fn crossings(net: &[f64]) -> Vec<(usize, Crossing)> {
    let mut found = Vec::new();
    let mut i = 0;

    while i + 1 < net.len() {
        let (y1, y2) = (net[i], net[i + 1]);

        if y1 * y2 < 0.0 {
            found.push((i, Crossing::Between(i)));
        } else if y1 != 0.0 && y2 == 0.0 {
            let next = (i + 2..net.len()).find(|&j| net[j] != 0.0);
            if let Some(j) = next {
                if y1 * net[j] < 0.0 {
                    found.push((i, Crossing::At(i + 1)));
                }
                i = j;
                continue;
            }
            break;
        }

        i += 1;
    }

    found
}

/// Strike where net exposure crosses zero, nearest to `spot`.
///
/// A crossing is a genuine sign flip between consecutive strikes; touching
/// zero without changing sign does not count. Among several flips the one
/// whose lower strike is closest to spot wins, first one on ties. The strike
/// is linearly interpolated between the bracketing points:
/// `x1 - y1 * (x2 - x1) / (y2 - y1)`.
pub fn zero_gamma(curve: &ExposureCurve, spot: f64) -> Option<f64> {
    let points = curve.points();
    let net: Vec<f64> = curve.net().collect();

    let mut nearest: Option<(f64, Crossing)> = None;
    for (index, crossing) in crossings(&net) {
        let distance = (points[index].strike - spot).abs();
        match nearest {
            Some((best, _)) if distance >= best => {}
            _ => nearest = Some((distance, crossing)),
        }
    }

    match nearest?.1 {
        Crossing::At(i) => Some(points[i].strike),
        Crossing::Between(i) => {
            let (x1, y1) = (points[i].strike, net[i]);
            let (x2, y2) = (points[i + 1].strike, net[i + 1]);
            if y2 == y1 {
                return None;
            }
            Some(x1 - y1 * (x2 - x1) / (y2 - y1))
        }
    }
}
