// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for antenna pattern metadata

The annotation antenna patterns provide, per subswath, an azimuth time
series of elevation profiles plus (on newer IPF versions) the platform
roll angle. For older products the roll is reconstructed from the orbit
altitude. The interpolators built here (elevation antenna pattern,
boresight angle, range spreading loss) drive both the noise LUT shift fit
and the total-gain noise model.
*/

use chrono::NaiveDateTime;
use roxmltree::Node;

use crate::aux_cal::AuxCalParams;
use crate::geolocation::GeolocationGrid;
use crate::interp::{CubicSpline, Grid2, LinearSpline};
use crate::orbit::Orbit;
use crate::swath::SwathId;
use crate::xml_read::{self, XmlError};
use crate::{SPEED_OF_LIGHT, WGS84_SEMI_MAJOR_AXIS, WGS84_SEMI_MINOR_AXIS};

/// One antenna pattern record: an elevation profile at one azimuth time.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaPatternRecord {
    /// Zero-Doppler azimuth time of the record
    pub azimuth_time: NaiveDateTime,
    /// Two-way slant range time axis, seconds
    pub slant_range_time: Vec<f64>,
    /// Elevation angle axis, degrees
    pub elevation_angle: Vec<f64>,
    /// Two-way elevation antenna pattern, dB
    pub elevation_pattern: Vec<f64>,
    /// Incidence angle axis, degrees
    pub incidence_angle: Vec<f64>,
    /// Terrain height used during processing, metres
    pub terrain_height: f64,
    /// Platform roll angle, degrees (absent on older IPF versions)
    pub roll: Option<f64>,
}

/// The antenna pattern time series of one subswath.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaPattern {
    /// Which subswath the records belong to
    pub swath: SwathId,
    /// Records in azimuth order
    pub records: Vec<AntennaPatternRecord>,
}

impl AntennaPattern {
    /// Parse the `antennaPatternList` of an annotation document, grouped by
    /// subswath in range order.
    pub fn parse_all(annotation: Node, filename: &str) -> Result<Vec<AntennaPattern>, XmlError> {
        let list = xml_read::req(annotation, "antennaPatternList", filename)?;
        let mut patterns: Vec<AntennaPattern> = vec![];
        for node in xml_read::find_all(list, "antennaPattern") {
            let name = xml_read::req_text(node, "swath", filename)?;
            let swath = SwathId::from_name(name).ok_or_else(|| XmlError::Parse {
                value: name.to_string(),
                element: "swath".to_string(),
                filename: filename.to_string(),
            })?;
            let roll = match xml_read::find(node, "roll") {
                Some(_) => Some(xml_read::req_parse(node, "roll", filename)?),
                None => None,
            };
            let record = AntennaPatternRecord {
                azimuth_time: xml_read::req_time(node, "azimuthTime", filename)?,
                slant_range_time: xml_read::req_list(node, "slantRangeTime", filename)?,
                elevation_angle: xml_read::req_list(node, "elevationAngle", filename)?,
                elevation_pattern: xml_read::req_list(node, "elevationPattern", filename)?,
                incidence_angle: xml_read::req_list(node, "incidenceAngle", filename)?,
                terrain_height: xml_read::req_parse(node, "terrainHeight", filename)?,
                roll,
            };
            match patterns.iter_mut().find(|p| p.swath == swath) {
                Some(pattern) => pattern.records.push(record),
                None => patterns.push(AntennaPattern {
                    swath,
                    records: vec![record],
                }),
            }
        }
        if patterns.is_empty() {
            return Err(XmlError::MissingElement {
                name: "antennaPattern".to_string(),
                filename: filename.to_string(),
            });
        }
        patterns.sort_by_key(|p| p.swath);
        Ok(patterns)
    }

    /// Record azimuth times as seconds relative to the scene centre.
    pub fn relative_azimuth_times(&self, center: NaiveDateTime) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| xml_read::seconds_since(r.azimuth_time, center))
            .collect()
    }

    /// Roll angle per record: annotated when present, otherwise derived
    /// from the orbit altitude.
    pub fn rolls(&self, orbit: &Orbit, center: NaiveDateTime) -> Vec<f64> {
        if self.records.iter().all(|r| r.roll.is_some()) {
            return self.records.iter().map(|r| r.roll.unwrap()).collect();
        }
        roll_from_orbit(orbit, center, &self.relative_azimuth_times(center))
    }
}

/// Local earth radius at a geodetic latitude, WGS-84.
pub fn earth_radius(latitude: f64) -> f64 {
    let (a, b) = (WGS84_SEMI_MAJOR_AXIS, WGS84_SEMI_MINOR_AXIS);
    let (cos, sin) = (latitude.cos(), latitude.sin());
    (((a * a * cos).powi(2) + (b * b * sin).powi(2)) / ((a * cos).powi(2) + (b * sin).powi(2)))
        .sqrt()
}

/// Roll angle from the orbit altitude: `29.45 - 0.0566 (h_km - 711.7)`.
pub fn roll_from_orbit(orbit: &Orbit, center: NaiveDateTime, times: &[f64]) -> Vec<f64> {
    orbit
        .positions(center, times)
        .iter()
        .map(|p| {
            let latitude = p[2].atan2((p[0] * p[0] + p[1] * p[1]).sqrt());
            let radius = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            let altitude = radius - earth_radius(latitude);
            29.45 - 0.0566 * (altitude / 1000.0 - 711.7)
        })
        .collect()
}

/// Elevation antenna pattern amplitude vs boresight-relative angle.
///
/// The AUX_CAL samples are either gains in dB or interleaved complex
/// pairs; both reduce to an amplitude whose square root is interpolated
/// with a cubic spline over the centred angle axis.
#[derive(Debug, Clone)]
pub struct EapInterpolator {
    spline: CubicSpline,
}

impl EapInterpolator {
    pub fn new(params: &AuxCalParams) -> Self {
        let values = &params.elevation_pattern;
        let amplitude: Vec<f64> = if params.elevation_pattern_count == values.len() {
            // given in dB
            values.iter().map(|v| 10f64.powf(v / 10.0)).collect()
        } else {
            values
                .chunks_exact(2)
                .map(|pair| (pair[0] * pair[0] + pair[1] * pair[1]).sqrt())
                .collect()
        };
        let n = amplitude.len();
        let half = (n / 2) as f64;
        let angles: Vec<f64> = (0..n)
            .map(|i| (i as f64 - half) * params.elevation_angle_increment)
            .collect();
        let sqrt_amplitude: Vec<f64> = amplitude.iter().map(|a| a.sqrt()).collect();
        EapInterpolator {
            spline: CubicSpline::new(angles, sqrt_amplitude),
        }
    }

    pub fn eval(&self, angle: f64) -> f64 {
        self.spline.eval(angle)
    }

    pub fn eval_many(&self, angles: &[f64]) -> Vec<f64> {
        self.spline.eval_many(angles)
    }
}

/// Boresight angle (elevation angle minus roll) over the image grid.
#[derive(Debug, Clone)]
pub struct BoresightInterpolator {
    grid: Grid2,
}

impl BoresightInterpolator {
    /// Merge the roll time series of every subswath, interpolate it onto
    /// the geolocation grid and subtract it from the elevation angle.
    pub fn new(
        geolocation: &GeolocationGrid,
        patterns: &[AntennaPattern],
        orbit: &Orbit,
        center: NaiveDateTime,
    ) -> Self {
        let mut samples: Vec<(f64, f64)> = vec![];
        for pattern in patterns {
            let times = pattern.relative_azimuth_times(center);
            let rolls = pattern.rolls(orbit, center);
            samples.extend(times.into_iter().zip(rolls));
        }
        samples.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
        samples.dedup_by(|a, b| a.0 == b.0);
        let roll_spline = LinearSpline::new(
            samples.iter().map(|s| s.0).collect(),
            samples.iter().map(|s| s.1).collect(),
        );

        let relative_time = geolocation.relative_azimuth_time(center);
        let mut boresight = geolocation.elevation_angle.clone();
        for (b, t) in boresight.iter_mut().zip(relative_time.iter()) {
            *b -= roll_spline.eval(*t);
        }
        BoresightInterpolator {
            grid: geolocation.interpolator(&boresight),
        }
    }

    pub fn eval(&self, line: f64, pixel: f64) -> f64 {
        self.grid.eval(line, pixel)
    }

    /// Boresight angles along one line for many pixels.
    pub fn eval_at(&self, line: f64, pixels: &[f64]) -> Vec<f64> {
        pixels.iter().map(|&p| self.grid.eval(line, p)).collect()
    }
}

/// Range spreading loss `(2 R_ref / (tau c))^power` over the image grid.
pub fn range_spread_loss_interpolator(
    geolocation: &GeolocationGrid,
    reference_range: f64,
    power: f64,
) -> Grid2 {
    let rsl = geolocation
        .slant_range_time
        .map(|&tau| (reference_range / tau / SPEED_OF_LIGHT * 2.0).powf(power));
    geolocation.interpolator(&rsl)
}

#[cfg(test)]
mod test;
