// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use crate::aux_cal::AuxCalParams;
use crate::orbit::OrbitStateVector;
use crate::swath::{BoundBlock, SwathId};
use crate::xml_read::parse_azimuth_time;
use float_cmp::approx_eq;
use ndarray::Array2;

#[test]
fn test_focused_burst_length_picks_largest_divisor() {
    // 3300 input lines, at most 3300/1100 = 3 bursts -> 3 bursts
    let t = focused_burst_length(ObsMode::Ew, "EW1", 100.0, 3300).unwrap();
    assert!(approx_eq!(f64, t, 11.0, epsilon = 1e-12));
    // 2900 lines: 2 divides, 2900/2 = 1450 lines per burst
    let t = focused_burst_length(ObsMode::Iw, "IW1", 100.0, 2900).unwrap();
    assert!(approx_eq!(f64, t, 14.5, epsilon = 1e-12));
}

#[test]
fn test_focused_burst_length_rejects_primes() {
    // 3301 is prime: no divisor between 2 and 3
    let result = focused_burst_length(ObsMode::Ew, "EW1", 100.0, 3301);
    assert!(matches!(
        result,
        Err(S1Error::BurstCountUndetermined { .. })
    ));
}

#[test]
fn test_focused_burst_length_rejects_short_swaths() {
    // fewer input lines than one nominal burst
    assert!(focused_burst_length(ObsMode::Ew, "EW1", 100.0, 900).is_err());
}

#[test]
fn test_burst_times_are_midpoint_offsets() {
    // reference times spaced exactly one burst length: no overlap shift
    let starts = vec![-0.5, -0.25, 0.0, 0.25, 0.5];
    let azimuth = vec![-0.4, -0.3, -0.15, 0.1, 0.35];
    let bursts = burst_times(&starts, 0.25, &azimuth).unwrap();
    assert!(approx_eq!(f64, bursts[0], -0.025, epsilon = 1e-12));
    assert!(approx_eq!(f64, bursts[1], 0.075, epsilon = 1e-12));
    assert!(approx_eq!(f64, bursts[2], -0.025, epsilon = 1e-12));
}

#[test]
fn test_burst_times_extend_to_bracket_image() {
    let starts = vec![0.0, 0.25];
    let azimuth = vec![-0.6, 0.0, 0.7];
    let bursts = burst_times(&starts, 0.25, &azimuth).unwrap();
    // all lines land inside some extended burst interval
    for b in &bursts {
        assert!(b.abs() <= 0.125 + 1e-12);
    }
}

#[test]
fn test_burst_times_need_two_references() {
    assert!(matches!(
        burst_times(&[0.0], 0.25, &[0.0]),
        Err(S1Error::InsufficientAntennaPattern(1))
    ));
}

fn scalloping_fixture() -> (
    SwathBounds,
    GeolocationGrid,
    Orbit,
    Vec<AzimuthFmRate>,
    AuxCalParams,
) {
    let t = |s: &str| parse_azimuth_time(s).unwrap();
    let bounds = SwathBounds {
        swath: SwathId::Ew1,
        blocks: vec![BoundBlock {
            azimuth_time: t("2019-01-01T00:00:00.000000"),
            first_azimuth_line: 0,
            first_range_sample: 0,
            last_azimuth_line: 199,
            last_range_sample: 99,
        }],
    };
    // azimuth time is linear in line: t = (line - 100) * 0.005 s
    let lines = vec![0, 100, 200];
    let pixels = vec![0, 50, 100];
    let shape = (3, 3);
    let azimuth_time = Array2::from_shape_fn(shape, |(r, _)| {
        let offset = r as i64 as f64 * 0.5 - 0.5;
        t(&format!(
            "2019-01-01T00:00:{:09.6}",
            10.0 + offset
        ))
    });
    let geolocation = GeolocationGrid {
        lines,
        pixels,
        azimuth_time,
        slant_range_time: Array2::from_elem(shape, 5.0e-3),
        elevation_angle: Array2::from_elem(shape, 30.0),
        incidence_angle: Array2::from_elem(shape, 35.0),
        latitude: Array2::from_elem(shape, 72.0),
        longitude: Array2::from_elem(shape, -5.0),
        height: Array2::zeros(shape),
    };
    let orbit = Orbit {
        state_vectors: (0..5)
            .map(|i| OrbitStateVector {
                time: t(&format!("2019-01-01T00:00:{:02}.000000", i * 5)),
                position: [7_070_000.0, 0.0, 0.0],
                velocity: [0.0, 7500.0, 0.0],
            })
            .collect(),
    };
    let fm_rates = vec![AzimuthFmRate {
        azimuth_time: t("2019-01-01T00:00:10.000000"),
        t0: 5.0e-3,
        coefficients: [-2000.0, 0.0, 0.0],
    }];
    // quadratic azimuth antenna element pattern, 0 dB at boresight
    let increment = 0.01;
    let aux = AuxCalParams {
        absolute_calibration_constant: 1.0,
        noise_calibration_factor: 1.0,
        elevation_angle_increment: 0.05,
        azimuth_angle_increment: increment,
        elevation_pattern_count: 3,
        elevation_pattern: vec![-1.0, 0.0, -1.0],
        azimuth_pattern: (0..11)
            .map(|i| {
                let angle = (i as f64 - 5.0) * increment;
                -800.0 * angle * angle
            })
            .collect(),
    };
    (bounds, geolocation, orbit, fm_rates, aux)
}

#[test]
fn test_scalloping_gain_periodicity() {
    let (bounds, geolocation, orbit, fm_rates, aux) = scalloping_fixture();
    let center = parse_azimuth_time("2019-01-01T00:00:10.000000").unwrap();
    // burst references spaced exactly one burst length (0.25 s)
    let input = ScallopingInput {
        swath_bounds: &bounds,
        geolocation: &geolocation,
        orbit: &orbit,
        fm_rates: &fm_rates,
        burst_reference_times: vec![-0.5, -0.25, 0.0, 0.25, 0.5],
        aux: &aux,
        center,
        number_of_lines: 200,
        azimuth_frequency: 4400.0,
        number_of_input_lines: 2200,
        mode: ObsMode::Ew,
    };
    let gain = scalloping_gain(&input).unwrap();
    assert_eq!(gain.len(), 200);
    // the gain never drops below one for a non-positive dB pattern
    for g in &gain {
        assert!(*g >= 1.0);
    }
    // period = burst length / line spacing = 0.25 / 0.005 = 50 lines
    for line in 20..120 {
        assert!(
            approx_eq!(f64, gain[line], gain[line + 50], epsilon = 1e-6),
            "line {}: {} vs {}",
            line,
            gain[line],
            gain[line + 50]
        );
    }
    // the gain actually varies within a burst
    let max = gain[20..70].iter().cloned().fold(f64::MIN, f64::max);
    let min = gain[20..70].iter().cloned().fold(f64::MAX, f64::min);
    assert!(max / min > 1.01);
}
