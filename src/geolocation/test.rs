// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use crate::xml_read::parse_azimuth_time;
use float_cmp::approx_eq;

fn point(line: i32, pixel: i32, seconds: u32, elevation: f64) -> String {
    format!(
        r#"<geolocationGridPoint>
            <azimuthTime>2019-01-01T00:00:{seconds:02}.000000</azimuthTime>
            <slantRangeTime>0.00{pixel}5</slantRangeTime>
            <line>{line}</line><pixel>{pixel}</pixel>
            <latitude>71.5</latitude><longitude>-10.25</longitude><height>12.0</height>
            <incidenceAngle>30.0</incidenceAngle>
            <elevationAngle>{elevation}</elevationAngle>
        </geolocationGridPoint>"#
    )
}

fn grid_xml() -> String {
    let mut xml = String::from("<product><geolocationGrid>");
    for (i, line) in [0, 10].iter().enumerate() {
        for pixel in [0, 5, 9] {
            xml.push_str(&point(*line, pixel, i as u32, 20.0 + pixel as f64));
        }
    }
    xml.push_str("</geolocationGrid></product>");
    xml
}

#[test]
fn test_parse_builds_sorted_axes() {
    let xml = grid_xml();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let grid = GeolocationGrid::parse(doc.root_element(), "annotation.xml").unwrap();
    assert_eq!(grid.lines, vec![0, 10]);
    assert_eq!(grid.pixels, vec![0, 5, 9]);
    assert_eq!(grid.elevation_angle[[0, 1]], 25.0);
    assert_eq!(grid.latitude[[1, 2]], 71.5);
}

#[test]
fn test_relative_azimuth_time() {
    let xml = grid_xml();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let grid = GeolocationGrid::parse(doc.root_element(), "annotation.xml").unwrap();
    let center = parse_azimuth_time("2019-01-01T00:00:00.500000").unwrap();
    let rel = grid.relative_azimuth_time(center);
    assert!(approx_eq!(f64, rel[[0, 0]], -0.5, epsilon = 1e-9));
    assert!(approx_eq!(f64, rel[[1, 0]], 0.5, epsilon = 1e-9));
}

#[test]
fn test_interpolator_matches_grid_points() {
    let xml = grid_xml();
    let doc = roxmltree::Document::parse(&xml).unwrap();
    let grid = GeolocationGrid::parse(doc.root_element(), "annotation.xml").unwrap();
    let interp = grid.interpolator(&grid.elevation_angle);
    assert!(approx_eq!(f64, interp.eval(0.0, 5.0), 25.0, epsilon = 1e-12));
    // linear in pixel between samples
    assert!(approx_eq!(f64, interp.eval(5.0, 2.5), 22.5, epsilon = 1e-12));
}

#[test]
fn test_missing_grid_is_malformed() {
    let doc = roxmltree::Document::parse("<product/>").unwrap();
    assert!(GeolocationGrid::parse(doc.root_element(), "annotation.xml").is_err());
}
