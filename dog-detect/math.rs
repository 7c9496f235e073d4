//! Small closed-form numerical kernels shared by refinement and orientation.

/// Solve `A x = b` for a symmetric 3x3 `A` given row-major.
///
/// Uses the explicit cofactor inverse so results match the reference
/// implementation bit for bit. Returns `None` when `|det(A)| < 1e-7`.
pub fn solve_symmetric33(a: &[f64; 9], b: &[f64; 3]) -> Option<[f64; 3]> {
    let det = a[0] * a[4] * a[8]
        - a[0] * a[5] * a[5]
        - a[4] * a[2] * a[2]
        - a[8] * a[1] * a[1]
        + 2.0 * a[1] * a[2] * a[5];

    if det.abs() < 0.0000001 {
        return None;
    }

    // adjugate
    let inv = [
        a[4] * a[8] - a[5] * a[7],
        a[2] * a[7] - a[1] * a[8],
        a[1] * a[5] - a[2] * a[4],
        a[5] * a[6] - a[3] * a[8],
        a[0] * a[8] - a[2] * a[6],
        a[2] * a[3] - a[0] * a[5],
        a[3] * a[7] - a[4] * a[6],
        a[1] * a[6] - a[0] * a[7],
        a[0] * a[4] - a[1] * a[3],
    ];

    Some([
        (inv[0] * b[0] + inv[1] * b[1] + inv[2] * b[2]) / det,
        (inv[3] * b[0] + inv[4] * b[1] + inv[5] * b[2]) / det,
        (inv[6] * b[0] + inv[7] * b[1] + inv[8] * b[2]) / det,
    ])
}

/// Coefficients of `y = a*x^2 + b*x + c`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    /// x of the critical point, `None` for a degenerate (linear) fit
    pub fn vertex(&self) -> Option<f64> {
        if self.a != 0.0 {
            Some(-self.b / (2.0 * self.a))
        } else {
            None
        }
    }
}

/// Fit a quadratic through three points.
///
/// Returns `None` if any of the closed-form denominators vanish.
pub fn quadratic_3_points(p1: (f64, f64), p2: (f64, f64), p3: (f64, f64)) -> Option<Quadratic> {
    let d1 = (p3.0 - p2.0) * (p3.0 - p1.0);
    let d2 = (p1.0 - p2.0) * (p3.0 - p1.0);
    let d3 = p1.0 - p2.0;

    if d1 == 0.0 || d2 == 0.0 || d3 == 0.0 {
        return None;
    }

    let x1_sq = p1.0 * p1.0;
    let x2_sq = p2.0 * p2.0;

    let a = ((p3.1 - p2.1) / d1) - ((p1.1 - p2.1) / d2);
    let b = ((p1.1 - p2.1) + (a * (x2_sq - x1_sq))) / d3;
    let c = p1.1 - (a * x1_sq) - (b * p1.0);

    Some(Quadratic { a, b, c })
}

/// Sixth order Taylor polynomial of `exp(x)`, used for Gaussian window
/// weights where `x` stays within `[-1.125, 0]`.
///
/// Relative error (positive x): 0.01% at 1.03, 0.1% at 1.52, 1% at 2.33,
/// 5% at 3.285. Negative arguments of the same magnitude fare worse.
#[inline]
pub fn fast_exp6(x: f64) -> f64 {
    (720.0 + x * (720.0 + x * (360.0 + x * (120.0 + x * (30.0 + x * (6.0 + x)))))) * 0.0013888888
}
