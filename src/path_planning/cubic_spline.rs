// Natural cubic spline
//
// Fits y(x) through knots with strictly increasing x. Coefficients come from
// the tridiagonal system for the second derivatives, solved with nalgebra.

extern crate nalgebra as na;

use crate::common::{PlanningError, PlanningResult};

#[derive(Debug, Clone)]
pub struct CubicSpline {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
    x: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline through the knots `(x[i], y[i])`
    ///
    /// Fails with `GeometryDegenerate` when fewer than two knots are given,
    /// when x is not strictly increasing, or when a value is not finite.
    pub fn new(x: &[f64], y: &[f64]) -> PlanningResult<CubicSpline> {
        let nx = x.len();
        if nx != y.len() {
            return Err(PlanningError::GeometryDegenerate(format!(
                "{} knot abscissae but {} ordinates", nx, y.len()
            )));
        }
        if nx < 2 {
            return Err(PlanningError::GeometryDegenerate(format!(
                "spline needs at least 2 knots, got {}", nx
            )));
        }
        if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
            return Err(PlanningError::GeometryDegenerate("non-finite spline knot".to_string()));
        }
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        if let Some(i) = h.iter().position(|&hi| hi <= f64::EPSILON) {
            return Err(PlanningError::GeometryDegenerate(format!(
                "knot x not strictly increasing at {} ({} -> {})", i, x[i], x[i + 1]
            )));
        }

        let a = y.to_vec();
        let c_na = Self::calc_a(&h)
            .lu()
            .solve(&Self::calc_b(&h, &a))
            .ok_or_else(|| PlanningError::GeometryDegenerate("singular spline system".to_string()))?;
        let c: Vec<f64> = c_na.iter().copied().collect();

        let mut b = Vec::with_capacity(nx - 1);
        let mut d = Vec::with_capacity(nx - 1);
        for i in 0..nx - 1 {
            d.push((c[i + 1] - c[i]) / (3.0 * h[i]));
            b.push((a[i + 1] - a[i]) / h[i] - h[i] * (c[i + 1] + 2.0 * c[i]) / 3.0);
        }

        Ok(CubicSpline { a, b, c, d, x: x.to_vec() })
    }

    /// First and last knot abscissa
    pub fn domain(&self) -> (f64, f64) {
        (self.x[0], self.x[self.x.len() - 1])
    }

    /// Value at `t`; outside the knots the end polynomials are extended
    pub fn calc(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.a[i] + self.b[i] * dx + self.c[i] * dx.powi(2) + self.d[i] * dx.powi(3)
    }

    /// First derivative at `t`
    pub fn calc_d(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        self.b[i] + 2.0 * self.c[i] * dx + 3.0 * self.d[i] * dx.powi(2)
    }

    /// Second derivative at `t`
    pub fn calc_dd(&self, t: f64) -> f64 {
        let i = self.search_index(t);
        let dx = t - self.x[i];
        2.0 * self.c[i] + 6.0 * self.d[i] * dx
    }

    /// Index of the segment holding `t`, clamped to the valid segments
    fn search_index(&self, t: f64) -> usize {
        let segments = self.x.len() - 1;
        self.x.partition_point(|&xi| xi <= t).saturating_sub(1).min(segments - 1)
    }

    fn calc_a(h: &[f64]) -> na::DMatrix<f64> {
        let nx = h.len() + 1;
        let mut a = na::DMatrix::zeros(nx, nx);
        a[(0, 0)] = 1.0;
        for i in 0..nx - 1 {
            if i != nx - 2 {
                a[(i + 1, i + 1)] = 2.0 * (h[i] + h[i + 1]);
            }
            a[(i + 1, i)] = h[i];
            a[(i, i + 1)] = h[i];
        }
        a[(0, 1)] = 0.0;
        a[(nx - 1, nx - 2)] = 0.0;
        a[(nx - 1, nx - 1)] = 1.0;
        a
    }

    fn calc_b(h: &[f64], a: &[f64]) -> na::DVector<f64> {
        let nx = h.len() + 1;
        let mut b = na::DVector::zeros(nx);
        for i in 0..nx.saturating_sub(2) {
            b[i + 1] = 3.0 * (a[i + 2] - a[i + 1]) / h[i + 1] - 3.0 * (a[i + 1] - a[i]) / h[i];
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolates_knots() {
        let x = [0.0, 10.0, 20.5, 30.0, 40.5, 50.0];
        let y = [0.0, -6.0, 5.0, 6.5, 0.0, -4.0];
        let spline = CubicSpline::new(&x, &y).unwrap();
        for (xi, yi) in x.iter().zip(y.iter()) {
            assert!((spline.calc(*xi) - yi).abs() < 1e-9);
        }
        assert_eq!(spline.domain(), (0.0, 50.0));
    }

    #[test]
    fn test_natural_boundary() {
        let spline = CubicSpline::new(&[0.0, 1.0, 3.0, 4.0], &[0.0, 2.0, -1.0, 1.0]).unwrap();
        assert!(spline.calc_dd(0.0).abs() < 1e-9);
        assert!(spline.calc_dd(4.0).abs() < 1e-9);
    }

    #[test]
    fn test_smooth_at_knots() {
        let spline = CubicSpline::new(&[0.0, 30.0, 60.0, 90.0], &[0.0, 1.0, 4.0, 4.0]).unwrap();
        let eps = 1e-7;
        for knot in [30.0, 60.0] {
            assert!((spline.calc_d(knot - eps) - spline.calc_d(knot + eps)).abs() < 1e-5);
            assert!((spline.calc_dd(knot - eps) - spline.calc_dd(knot + eps)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_straight_line_is_exact() {
        let spline = CubicSpline::new(&[-1.0, 0.0, 30.0, 60.0], &[-0.5, 0.0, 15.0, 30.0]).unwrap();
        assert!((spline.calc(45.0) - 22.5).abs() < 1e-9);
        assert!((spline.calc_d(12.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_two_knots() {
        let spline = CubicSpline::new(&[0.0, 2.0], &[1.0, 3.0]).unwrap();
        assert!((spline.calc(1.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_degenerate_knots() {
        assert!(matches!(
            CubicSpline::new(&[0.0, 1.0, 1.0], &[0.0, 1.0, 2.0]),
            Err(PlanningError::GeometryDegenerate(_))
        ));
        assert!(CubicSpline::new(&[0.0, 2.0, 1.0], &[0.0, 1.0, 2.0]).is_err());
        assert!(CubicSpline::new(&[0.0], &[0.0]).is_err());
        assert!(CubicSpline::new(&[0.0, f64::NAN], &[0.0, 1.0]).is_err());
    }
}
