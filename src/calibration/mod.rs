// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for radiometric calibration vectors
*/

use chrono::NaiveDateTime;
use roxmltree::Node;

use crate::xml_read::{self, XmlError};

/// One calibration vector: per-pixel calibration LUTs along one image line.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationVector {
    /// Zero-Doppler azimuth time of the vector
    pub azimuth_time: NaiveDateTime,
    /// Image line of the vector
    pub line: i32,
    /// Range samples of the LUT entries, ascending
    pub pixels: Vec<i32>,
    /// Sigma nought calibration LUT
    pub sigma_nought: Vec<f64>,
    /// Beta nought calibration LUT
    pub beta_nought: Vec<f64>,
    /// Gamma calibration LUT
    pub gamma: Vec<f64>,
    /// Digital number calibration LUT
    pub dn: Vec<f64>,
}

/// All calibration vectors of one polarization.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    /// Vectors in annotation (azimuth) order
    pub vectors: Vec<CalibrationVector>,
}

impl CalibrationTable {
    /// Parse all `calibrationVector` records of a calibration document.
    pub fn parse(calibration: Node, filename: &str) -> Result<Self, XmlError> {
        let mut vectors = vec![];
        for node in xml_read::find_all(calibration, "calibrationVector") {
            vectors.push(CalibrationVector {
                azimuth_time: xml_read::req_time(node, "azimuthTime", filename)?,
                line: xml_read::req_parse(node, "line", filename)?,
                pixels: xml_read::req_list(node, "pixel", filename)?,
                sigma_nought: xml_read::req_list(node, "sigmaNought", filename)?,
                beta_nought: xml_read::req_list(node, "betaNought", filename)?,
                gamma: xml_read::req_list(node, "gamma", filename)?,
                dn: xml_read::req_list(node, "dn", filename)?,
            });
        }
        if vectors.is_empty() {
            return Err(XmlError::MissingElement {
                name: "calibrationVector".to_string(),
                filename: filename.to_string(),
            });
        }
        Ok(CalibrationTable { vectors })
    }

    /// The image line of each vector.
    pub fn lines(&self) -> Vec<i32> {
        self.vectors.iter().map(|v| v.line).collect()
    }

    /// The pixel axis of each vector.
    pub fn pixels(&self) -> Vec<&[i32]> {
        self.vectors.iter().map(|v| v.pixels.as_slice()).collect()
    }

    /// The sigma nought LUT of each vector.
    pub fn sigma_nought(&self) -> Vec<&[f64]> {
        self.vectors
            .iter()
            .map(|v| v.sigma_nought.as_slice())
            .collect()
    }
}
