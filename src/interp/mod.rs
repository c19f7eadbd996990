// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Univariate and bivariate interpolators built from sparse metadata grids.

The annotation files sample every quantity (geolocation angles, calibration
LUTs, noise LUTs, antenna patterns) on sparse grids; everything the
denoising pipeline does starts by lifting those samples to arbitrary
coordinates. Three interpolator families cover all uses:

* [`LinearSpline`] - degree-1 univariate, linear extrapolation from the end
  segments.
* [`CubicSpline`] - interpolating cubic spline with not-a-knot end
  conditions, evaluated with the boundary polynomial outside the knots.
* [`Grid2`] - degree-1 rectangular bivariate over sorted axes, linear
  extrapolation beyond the grid.

[`clamped_interp`] is the piecewise-linear table lookup that clamps to the
end values, used where the reference behaviour is a plain table lookup
(azimuth antenna pattern, FM-rate time series).
*/

use ndarray::Array2;

/// Index of the interval of `xs` containing `x`, clamped to valid segments.
///
/// With `n` knots there are `n - 1` segments; out-of-range coordinates map
/// to the first or last segment, which is what makes the evaluators
/// extrapolate from the boundary polynomial.
fn segment_index(xs: &[f64], x: f64) -> usize {
    let n = xs.len();
    if n < 2 {
        return 0;
    }
    match xs.binary_search_by(|probe| probe.partial_cmp(&x).unwrap()) {
        Ok(i) => i.min(n - 2),
        Err(0) => 0,
        Err(i) => (i - 1).min(n - 2),
    }
}

/// Piecewise-linear lookup clamped to the table end values (`np.interp`).
pub fn clamped_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len());
    if xp.is_empty() {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[xp.len() - 1] {
        return fp[fp.len() - 1];
    }
    let i = segment_index(xp, x);
    let t = (x - xp[i]) / (xp[i + 1] - xp[i]);
    fp[i] + t * (fp[i + 1] - fp[i])
}

/// Degree-1 univariate spline with linear extrapolation.
#[derive(Clone, Debug)]
pub struct LinearSpline {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearSpline {
    /// Build from strictly increasing abscissae. A single sample yields a
    /// constant function.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        debug_assert_eq!(x.len(), y.len());
        debug_assert!(x.windows(2).all(|w| w[0] < w[1]));
        Self { x, y }
    }

    pub fn eval(&self, at: f64) -> f64 {
        if self.x.len() == 1 {
            return self.y[0];
        }
        let i = segment_index(&self.x, at);
        let t = (at - self.x[i]) / (self.x[i + 1] - self.x[i]);
        self.y[i] + t * (self.y[i + 1] - self.y[i])
    }

    pub fn eval_many(&self, at: &[f64]) -> Vec<f64> {
        at.iter().map(|&v| self.eval(v)).collect()
    }
}

/// Interpolating cubic spline with not-a-knot end conditions.
///
/// Represented by the knot second derivatives (the "moments" form). With
/// two knots the spline degenerates to a line, with three to the parabola
/// through the samples. Evaluation outside the knots continues the
/// boundary polynomial.
#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    m: Vec<f64>,
}

impl CubicSpline {
    /// Build from strictly increasing abscissae (at least two samples).
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        debug_assert_eq!(x.len(), y.len());
        debug_assert!(x.len() >= 2);
        debug_assert!(x.windows(2).all(|w| w[0] < w[1]));
        let m = Self::solve_moments(&x, &y);
        Self { x, y, m }
    }

    /// Knot second derivatives for the not-a-knot interpolating spline.
    fn solve_moments(x: &[f64], y: &[f64]) -> Vec<f64> {
        let n = x.len();
        if n == 2 {
            return vec![0.0; 2];
        }
        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        if n == 3 {
            // The parabola through three points has a constant second
            // derivative 2a.
            let s0 = (y[1] - y[0]) / h[0];
            let s1 = (y[2] - y[1]) / h[1];
            let a = (s1 - s0) / (x[2] - x[0]);
            return vec![2.0 * a; 3];
        }

        // Interior continuity equations with the boundary moments
        // eliminated through the not-a-knot conditions, solved with the
        // Thomas algorithm for m[1]..m[n-2].
        let k = n - 2;
        let mut sub = vec![0.0; k];
        let mut diag = vec![0.0; k];
        let mut sup = vec![0.0; k];
        let mut rhs = vec![0.0; k];
        for i in 1..=k {
            rhs[i - 1] = 6.0 * ((y[i + 1] - y[i]) / h[i] - (y[i] - y[i - 1]) / h[i - 1]);
            sub[i - 1] = h[i - 1];
            diag[i - 1] = 2.0 * (h[i - 1] + h[i]);
            sup[i - 1] = h[i];
        }
        // m0 = m1 (1 + h0/h1) - m2 (h0/h1)
        let r0 = h[0] / h[1];
        diag[0] += h[0] * (1.0 + r0);
        sup[0] -= h[0] * r0;
        // m[n-1] = m[n-2] (1 + h[n-2]/h[n-3]) - m[n-3] (h[n-2]/h[n-3])
        let r1 = h[n - 2] / h[n - 3];
        diag[k - 1] += h[n - 2] * (1.0 + r1);
        sub[k - 1] -= h[n - 2] * r1;

        for i in 1..k {
            let w = sub[i] / diag[i - 1];
            diag[i] -= w * sup[i - 1];
            rhs[i] -= w * rhs[i - 1];
        }
        let mut interior = vec![0.0; k];
        interior[k - 1] = rhs[k - 1] / diag[k - 1];
        for i in (0..k - 1).rev() {
            interior[i] = (rhs[i] - sup[i] * interior[i + 1]) / diag[i];
        }

        let mut m = vec![0.0; n];
        m[1..=k].copy_from_slice(&interior);
        m[0] = m[1] * (1.0 + r0) - m[2] * r0;
        m[n - 1] = m[n - 2] * (1.0 + r1) - m[n - 3] * r1;
        m
    }

    pub fn eval(&self, at: f64) -> f64 {
        let i = segment_index(&self.x, at);
        let h = self.x[i + 1] - self.x[i];
        let a = (self.x[i + 1] - at) / h;
        let b = (at - self.x[i]) / h;
        a * self.y[i]
            + b * self.y[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    pub fn eval_many(&self, at: &[f64]) -> Vec<f64> {
        at.iter().map(|&v| self.eval(v)).collect()
    }
}

/// Degree-1 rectangular bivariate interpolator with linear extrapolation.
///
/// Rows of `z` follow the `x` axis, columns the `y` axis. Either axis may
/// hold a single sample, in which case the surface is constant along it.
#[derive(Clone, Debug)]
pub struct Grid2 {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Array2<f64>,
}

impl Grid2 {
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Array2<f64>) -> Self {
        debug_assert_eq!(z.nrows(), x.len());
        debug_assert_eq!(z.ncols(), y.len());
        debug_assert!(x.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(y.windows(2).all(|w| w[0] < w[1]));
        Self { x, y, z }
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let (i, tx) = Self::axis_position(&self.x, x);
        let (j, ty) = Self::axis_position(&self.y, y);
        if self.x.len() == 1 && self.y.len() == 1 {
            return self.z[[0, 0]];
        }
        if self.x.len() == 1 {
            return Self::blend(self.z[[0, j]], self.z[[0, j + 1]], ty);
        }
        if self.y.len() == 1 {
            return Self::blend(self.z[[i, 0]], self.z[[i + 1, 0]], tx);
        }
        let row0 = Self::blend(self.z[[i, j]], self.z[[i, j + 1]], ty);
        let row1 = Self::blend(self.z[[i + 1, j]], self.z[[i + 1, j + 1]], ty);
        Self::blend(row0, row1, tx)
    }

    /// Linear blend that ignores the zero-weight sample, so evaluation on a
    /// knot is exact even when the neighbouring cell holds NaN.
    fn blend(a: f64, b: f64, t: f64) -> f64 {
        if t == 0.0 {
            a
        } else if t == 1.0 {
            b
        } else {
            a * (1.0 - t) + b * t
        }
    }

    /// Evaluate on the outer product of two coordinate vectors.
    pub fn eval_grid(&self, x: &[f64], y: &[f64]) -> Array2<f64> {
        let mut out = Array2::zeros((x.len(), y.len()));
        for (r, &xv) in x.iter().enumerate() {
            for (c, &yv) in y.iter().enumerate() {
                out[[r, c]] = self.eval(xv, yv);
            }
        }
        out
    }

    /// Segment index and (possibly out-of-range) barycentric weight along
    /// one axis; the unclamped weight is what produces linear
    /// extrapolation.
    fn axis_position(axis: &[f64], at: f64) -> (usize, f64) {
        if axis.len() < 2 {
            return (0, 0.0);
        }
        let i = segment_index(axis, at);
        let t = (at - axis[i]) / (axis[i + 1] - axis[i]);
        (i, t)
    }
}
