// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for orbit state vector metadata
*/

use chrono::NaiveDateTime;
use roxmltree::Node;

use crate::xml_read::{self, XmlError};

/// One orbit state vector from the annotation orbit list.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitStateVector {
    /// UTC time of the state vector
    pub time: NaiveDateTime,
    /// ECEF position in metres
    pub position: [f64; 3],
    /// ECEF velocity in metres per second
    pub velocity: [f64; 3],
}

/// The annotation orbit list with cubic interpolation over the four state
/// vectors nearest a target time.
#[derive(Debug, Clone)]
pub struct Orbit {
    /// State vectors in annotation order
    pub state_vectors: Vec<OrbitStateVector>,
}

impl Orbit {
    /// Parse the `orbitList` of an annotation document.
    pub fn parse(annotation: Node, filename: &str) -> Result<Self, XmlError> {
        let list = xml_read::req(annotation, "orbitList", filename)?;
        let mut state_vectors = vec![];
        for node in xml_read::find_all(list, "orbit") {
            let position = xml_read::req(node, "position", filename)?;
            let velocity = xml_read::req(node, "velocity", filename)?;
            state_vectors.push(OrbitStateVector {
                time: xml_read::req_time(node, "time", filename)?,
                position: [
                    xml_read::req_parse(position, "x", filename)?,
                    xml_read::req_parse(position, "y", filename)?,
                    xml_read::req_parse(position, "z", filename)?,
                ],
                velocity: [
                    xml_read::req_parse(velocity, "x", filename)?,
                    xml_read::req_parse(velocity, "y", filename)?,
                    xml_read::req_parse(velocity, "z", filename)?,
                ],
            });
        }
        if state_vectors.len() < 4 {
            return Err(XmlError::MissingElement {
                name: "orbit".to_string(),
                filename: filename.to_string(),
            });
        }
        Ok(Orbit { state_vectors })
    }

    /// State vector times as seconds relative to `center`.
    fn relative_times(&self, center: NaiveDateTime) -> Vec<f64> {
        self.state_vectors
            .iter()
            .map(|sv| xml_read::seconds_since(sv.time, center))
            .collect()
    }

    /// Position and velocity at a relative time, from a cubic through the
    /// four nearest state vectors. Exact at the sample times.
    pub fn at(&self, center: NaiveDateTime, t: f64) -> ([f64; 3], [f64; 3]) {
        let times = self.relative_times(center);

        // four samples nearest by absolute time difference, ascending
        let mut order: Vec<usize> = (0..times.len()).collect();
        order.sort_by(|&a, &b| {
            (times[a] - t)
                .abs()
                .partial_cmp(&(times[b] - t).abs())
                .unwrap()
        });
        let mut nearest: Vec<usize> = order.into_iter().take(4).collect();
        nearest.sort_unstable();

        let xs: Vec<f64> = nearest.iter().map(|&i| times[i]).collect();
        let mut position = [0.0; 3];
        let mut velocity = [0.0; 3];
        for component in 0..3 {
            let pos: Vec<f64> = nearest
                .iter()
                .map(|&i| self.state_vectors[i].position[component])
                .collect();
            let vel: Vec<f64> = nearest
                .iter()
                .map(|&i| self.state_vectors[i].velocity[component])
                .collect();
            position[component] = cubic_interpolation(&xs, &pos, t);
            velocity[component] = cubic_interpolation(&xs, &vel, t);
        }
        (position, velocity)
    }

    /// Satellite speed at each relative time.
    pub fn velocity_magnitudes(&self, center: NaiveDateTime, times: &[f64]) -> Vec<f64> {
        times
            .iter()
            .map(|&t| {
                let (_, v) = self.at(center, t);
                (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
            })
            .collect()
    }

    /// Satellite positions at each relative time.
    pub fn positions(&self, center: NaiveDateTime, times: &[f64]) -> Vec<[f64; 3]> {
        times
            .iter()
            .map(|&t| {
                let (p, _) = self.at(center, t);
                p
            })
            .collect()
    }
}

/// Value at `t` of the cubic through four samples (Neville's scheme).
///
/// Evaluating at a sample abscissa returns the sample exactly.
fn cubic_interpolation(xs: &[f64], ys: &[f64], t: f64) -> f64 {
    debug_assert_eq!(xs.len(), 4);
    let mut p = ys.to_vec();
    for level in 1..4 {
        for i in 0..4 - level {
            p[i] = ((t - xs[i + level]) * p[i] + (xs[i] - t) * p[i + 1]) / (xs[i] - xs[i + level]);
        }
    }
    p[0]
}
