// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use crate::orbit::OrbitStateVector;
use crate::xml_read::parse_azimuth_time;
use float_cmp::approx_eq;
use ndarray::Array2;

fn aux_params_db() -> AuxCalParams {
    AuxCalParams {
        absolute_calibration_constant: 1.0,
        noise_calibration_factor: 1.0,
        elevation_angle_increment: 1.0,
        azimuth_angle_increment: 1.0,
        elevation_pattern_count: 5,
        elevation_pattern: vec![-2.0, -1.0, 0.0, -1.0, -2.0],
        azimuth_pattern: vec![-3.0, 0.0, -3.0],
    }
}

fn flat_geolocation(elevation: f64) -> GeolocationGrid {
    let t = |s: &str| parse_azimuth_time(s).unwrap();
    let lines = vec![0, 10, 20];
    let pixels = vec![0, 50, 100];
    let shape = (3, 3);
    let azimuth_time = Array2::from_shape_fn(shape, |(r, _)| {
        t(&format!("2019-01-01T00:00:{:02}.000000", r * 10))
    });
    GeolocationGrid {
        lines,
        pixels,
        azimuth_time,
        slant_range_time: Array2::from_elem(shape, 5.0e-3),
        elevation_angle: Array2::from_elem(shape, elevation),
        incidence_angle: Array2::from_elem(shape, 35.0),
        latitude: Array2::from_elem(shape, 72.0),
        longitude: Array2::from_elem(shape, -5.0),
        height: Array2::zeros(shape),
    }
}

fn circular_orbit() -> Orbit {
    // equatorial, 711.7 km altitude, so the derived roll is exactly 29.45
    let radius = earth_radius(0.0) + 711_700.0;
    let state_vectors = (0..5)
        .map(|i| OrbitStateVector {
            time: parse_azimuth_time(&format!("2019-01-01T00:00:{:02}.000000", i * 10)).unwrap(),
            position: [radius, 0.0, 0.0],
            velocity: [0.0, 7500.0, 0.0],
        })
        .collect();
    Orbit { state_vectors }
}

#[test]
fn test_earth_radius_limits() {
    assert!(approx_eq!(f64, earth_radius(0.0), 6_378_137.0, epsilon = 1e-6));
    assert!(approx_eq!(
        f64,
        earth_radius(std::f64::consts::FRAC_PI_2),
        6_356_752.314245179,
        epsilon = 1e-6
    ));
}

#[test]
fn test_roll_from_orbit_reference_altitude() {
    let orbit = circular_orbit();
    let center = orbit.state_vectors[0].time;
    let rolls = roll_from_orbit(&orbit, center, &[0.0, 10.0]);
    for roll in rolls {
        assert!(approx_eq!(f64, roll, 29.45, epsilon = 1e-9));
    }
}

#[test]
fn test_eap_interpolator_db_case() {
    let eap = EapInterpolator::new(&aux_params_db());
    // at the pattern centre the gain is 0 dB -> amplitude 1
    assert!(approx_eq!(f64, eap.eval(0.0), 1.0, epsilon = 1e-9));
    // symmetric pattern
    assert!(approx_eq!(
        f64,
        eap.eval(1.5),
        eap.eval(-1.5),
        epsilon = 1e-9
    ));
}

#[test]
fn test_eap_interpolator_complex_case() {
    let mut params = aux_params_db();
    params.elevation_pattern_count = 3;
    params.elevation_pattern = vec![1.0, 0.0, 2.0, 0.0, 1.0, 0.0];
    let eap = EapInterpolator::new(&params);
    assert!(approx_eq!(f64, eap.eval(0.0), 2.0f64.sqrt(), epsilon = 1e-9));
    assert!(approx_eq!(f64, eap.eval(-1.0), 1.0, epsilon = 1e-9));
}

#[test]
fn test_boresight_with_annotated_roll() {
    let t = |s: &str| parse_azimuth_time(s).unwrap();
    let record = |time: &str| AntennaPatternRecord {
        azimuth_time: t(time),
        slant_range_time: vec![5.0e-3],
        elevation_angle: vec![30.0],
        elevation_pattern: vec![0.0],
        incidence_angle: vec![35.0],
        terrain_height: 0.0,
        roll: Some(10.0),
    };
    let patterns = vec![AntennaPattern {
        swath: SwathId::Ew1,
        records: vec![
            record("2019-01-01T00:00:00.000000"),
            record("2019-01-01T00:00:20.000000"),
        ],
    }];
    let geolocation = flat_geolocation(30.0);
    let orbit = circular_orbit();
    let boresight =
        BoresightInterpolator::new(&geolocation, &patterns, &orbit, t("2019-01-01T00:00:10"));
    assert!(approx_eq!(f64, boresight.eval(10.0, 50.0), 20.0, epsilon = 1e-9));
    let along_line = boresight.eval_at(5.0, &[0.0, 100.0]);
    assert!(approx_eq!(f64, along_line[0], 20.0, epsilon = 1e-9));
    assert!(approx_eq!(f64, along_line[1], 20.0, epsilon = 1e-9));
}

#[test]
fn test_range_spread_loss_is_one_at_reference() {
    let geolocation = flat_geolocation(30.0);
    // reference range equal to the slant range makes the loss exactly 1
    let reference_range = 5.0e-3 * crate::SPEED_OF_LIGHT / 2.0;
    let rsl = range_spread_loss_interpolator(&geolocation, reference_range, 1.5);
    assert!(approx_eq!(f64, rsl.eval(10.0, 50.0), 1.0, epsilon = 1e-12));
}

#[test]
fn test_parse_all_groups_by_swath() {
    let xml = r#"<product><antennaPattern><antennaPatternList>
        <antennaPattern>
            <swath>EW1</swath>
            <azimuthTime>2019-01-01T00:00:00.000000</azimuthTime>
            <slantRangeTime>5.0e-03 5.1e-03</slantRangeTime>
            <elevationAngle>29.0 30.0</elevationAngle>
            <elevationPattern>1.0 2.0 3.0 4.0</elevationPattern>
            <incidenceAngle>33.0 34.0</incidenceAngle>
            <terrainHeight>0.0</terrainHeight>
            <roll>29.1</roll>
        </antennaPattern>
        <antennaPattern>
            <swath>EW2</swath>
            <azimuthTime>2019-01-01T00:00:01.000000</azimuthTime>
            <slantRangeTime>5.2e-03</slantRangeTime>
            <elevationAngle>31.0</elevationAngle>
            <elevationPattern>1.0 2.0</elevationPattern>
            <incidenceAngle>36.0</incidenceAngle>
            <terrainHeight>0.0</terrainHeight>
        </antennaPattern>
        <antennaPattern>
            <swath>EW1</swath>
            <azimuthTime>2019-01-01T00:00:02.000000</azimuthTime>
            <slantRangeTime>5.0e-03</slantRangeTime>
            <elevationAngle>29.5</elevationAngle>
            <elevationPattern>1.5</elevationPattern>
            <incidenceAngle>33.5</incidenceAngle>
            <terrainHeight>0.0</terrainHeight>
            <roll>29.2</roll>
        </antennaPattern>
    </antennaPatternList></antennaPattern></product>"#;
    let doc = roxmltree::Document::parse(xml).unwrap();
    let patterns = AntennaPattern::parse_all(doc.root_element(), "annotation.xml").unwrap();
    assert_eq!(patterns.len(), 2);
    assert_eq!(patterns[0].swath, SwathId::Ew1);
    assert_eq!(patterns[0].records.len(), 2);
    assert_eq!(patterns[0].records[0].roll, Some(29.1));
    assert_eq!(patterns[1].records[0].roll, None);
    assert_eq!(patterns[1].records[0].elevation_angle, vec![31.0]);
}
