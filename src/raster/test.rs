// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use float_cmp::approx_eq;
use ndarray::{array, Array2};

#[test]
fn test_reflect_index() {
    // d c b a | a b c d
    assert_eq!(reflect_index(-1, 4), 0);
    assert_eq!(reflect_index(-2, 4), 1);
    assert_eq!(reflect_index(0, 4), 0);
    assert_eq!(reflect_index(3, 4), 3);
    assert_eq!(reflect_index(4, 4), 3);
    assert_eq!(reflect_index(5, 4), 2);
}

#[test]
fn test_gaussian_kernel_is_normalized() {
    let k = gaussian_kernel(2.0);
    let sum: f64 = k.iter().sum();
    assert!(approx_eq!(f64, sum, 1.0, epsilon = 1e-12));
    assert_eq!(k.len(), 2 * 8 + 1);
}

#[test]
fn test_gaussian_filter_preserves_constants() {
    let input = Array2::from_elem((12, 9), 3.5);
    let out = gaussian_filter(&input, 2.0);
    for v in out.iter() {
        assert!(approx_eq!(f64, *v, 3.5, epsilon = 1e-12));
    }
}

#[test]
fn test_gaussian_filter_reduces_variance() {
    let mut input = Array2::zeros((20, 20));
    for (i, v) in input.iter_mut().enumerate() {
        *v = if i % 2 == 0 { 1.0 } else { -1.0 };
    }
    let out = gaussian_filter(&input, 1.5);
    let var_in = input.iter().map(|v| v * v).sum::<f64>();
    let var_out = out.iter().map(|v| v * v).sum::<f64>();
    assert!(var_out < var_in);
}

#[test]
fn test_fill_gaps_uses_positive_neighbours() {
    let mut input = Array2::from_elem((9, 9), 2.0);
    input[[4, 4]] = -1.0;
    let mask = Array2::from_shape_fn((9, 9), |(r, c)| r == 4 && c == 4);
    let out = fill_gaps(&input, &mask);
    assert!(out[[4, 4]] > 0.0);
    assert!(approx_eq!(f64, out[[0, 0]], 2.0, epsilon = 1e-12));
}

#[test]
fn test_fill_gaps_keeps_unmasked_nan() {
    let mut input = Array2::from_elem((9, 9), 2.0);
    input[[0, 0]] = f64::NAN;
    input[[4, 4]] = -1.0;
    let mask = Array2::from_shape_fn((9, 9), |(r, c)| r == 4 && c == 4);
    let out = fill_gaps(&input, &mask);
    assert!(out[[0, 0]].is_nan());
    assert!(out[[4, 4]].is_finite());
}

#[test]
fn test_nanmean_and_nanstd() {
    let values = [1.0, 3.0, f64::NAN, 5.0];
    assert!(approx_eq!(f64, nanmean(values.iter()), 3.0, epsilon = 1e-12));
    let std = nanstd(values.iter());
    assert!(approx_eq!(f64, std, (8.0f64 / 3.0).sqrt(), epsilon = 1e-12));
    assert!(nanmean([f64::NAN].iter()).is_nan());
}

#[test]
fn test_write_block() {
    let mut target = Array2::from_elem((4, 4), f64::NAN);
    let block = array![[1.0, 2.0], [3.0, 4.0]];
    write_block(&mut target, 1, 2, &block);
    assert_eq!(target[[1, 2]], 1.0);
    assert_eq!(target[[2, 3]], 4.0);
    assert!(target[[0, 0]].is_nan());
}
