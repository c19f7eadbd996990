// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Helper methods for full-resolution rasters.

Gaussian smoothing, distance-weighted gap filling and the NaN-aware
statistics used by the denoising pipeline and the offline experiments.
*/

use ndarray::Array2;

/// Smoothing width used when filling removed (negative) backscatter pixels.
const FILL_SIGMA: f64 = 3.0;

/// Reflect an out-of-range index into `0..n` (`d c b a | a b c d`).
fn reflect_index(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    i = i.rem_euclid(period);
    if i >= n {
        i = period - i - 1;
    }
    i as usize
}

/// Normalized Gaussian kernel with radius `round(4 sigma)`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as usize;
    let mut kernel: Vec<f64> = (-(radius as isize)..=radius as isize)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

/// Separable Gaussian filter with reflected boundaries.
///
/// NaN samples poison their neighbourhood, which is the behaviour the
/// pipeline relies on outside the swath-bound blocks.
pub fn gaussian_filter(input: &Array2<f64>, sigma: f64) -> Array2<f64> {
    let kernel = gaussian_kernel(sigma);
    let radius = kernel.len() / 2;
    let (rows, cols) = input.dim();

    // rows first
    let mut pass1 = Array2::zeros((rows, cols));
    for c in 0..cols {
        for r in 0..rows {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let rr = reflect_index(r as isize + k as isize - radius as isize, rows);
                acc += w * input[[rr, c]];
            }
            pass1[[r, c]] = acc;
        }
    }
    // then columns
    let mut out = Array2::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (k, w) in kernel.iter().enumerate() {
                let cc = reflect_index(c as isize + k as isize - radius as isize, cols);
                acc += w * pass1[[r, cc]];
            }
            out[[r, c]] = acc;
        }
    }
    out
}

/// Replace masked pixels by a distance-weighted mean of the valid
/// neighbourhood.
///
/// Valid neighbours keep their sign, so a gap surrounded by positive
/// backscatter fills with a positive value. Pixels that are NaN but not
/// masked (outside any swath) stay NaN.
pub fn fill_gaps(input: &Array2<f64>, mask: &Array2<bool>) -> Array2<f64> {
    let (rows, cols) = input.dim();
    let mut zeroed = Array2::zeros((rows, cols));
    let mut weight = Array2::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let valid = input[[r, c]].is_finite() && !mask[[r, c]];
            if valid {
                zeroed[[r, c]] = input[[r, c]];
                weight[[r, c]] = 1.0;
            }
        }
    }
    let smoothed = gaussian_filter(&zeroed, FILL_SIGMA);
    let weights = gaussian_filter(&weight, FILL_SIGMA);

    let mut out = input.clone();
    for r in 0..rows {
        for c in 0..cols {
            if mask[[r, c]] {
                out[[r, c]] = if weights[[r, c]] > 0.0 {
                    smoothed[[r, c]] / weights[[r, c]]
                } else {
                    f64::NAN
                };
            }
        }
    }
    out
}

/// Mean of the finite samples, NaN if there are none.
pub fn nanmean<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += v;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation of the finite samples, NaN if there are
/// none.
pub fn nanstd<'a, I: IntoIterator<Item = &'a f64> + Clone>(values: I) -> f64 {
    let mean = nanmean(values.clone());
    if mean.is_nan() {
        return f64::NAN;
    }
    let mut sum = 0.0;
    let mut count = 0usize;
    for &v in values {
        if v.is_finite() {
            sum += (v - mean) * (v - mean);
            count += 1;
        }
    }
    (sum / count as f64).sqrt()
}

/// Copy `block` into `target` with its upper-left corner at (row, col).
pub fn write_block(target: &mut Array2<f64>, row: usize, col: usize, block: &Array2<f64>) {
    let (brows, bcols) = block.dim();
    for r in 0..brows {
        for c in 0..bcols {
            target[[row + r, col + c]] = block[[r, c]];
        }
    }
}

#[cfg(test)]
mod test;
