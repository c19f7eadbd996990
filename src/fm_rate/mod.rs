// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for azimuth FM rate metadata
*/

use chrono::NaiveDateTime;
use roxmltree::Node;

use crate::error::S1Error;
use crate::interp::clamped_interp;
use crate::xml_read::{self, XmlError};

/// One azimuth frequency-modulation rate record.
#[derive(Debug, Clone, PartialEq)]
pub struct AzimuthFmRate {
    /// Zero-Doppler azimuth time of the record
    pub azimuth_time: NaiveDateTime,
    /// Slant-range reference time of the polynomial, seconds
    pub t0: f64,
    /// Polynomial coefficients `c0 + c1 (tau - t0) + c2 (tau - t0)^2`
    pub coefficients: [f64; 3],
}

impl AzimuthFmRate {
    /// Parse all `azimuthFmRate` records. Older annotations spell the
    /// polynomial as separate `c0`/`c1`/`c2` elements, newer ones as a
    /// single `azimuthFmRatePolynomial` list.
    pub fn parse_all(annotation: Node, filename: &str) -> Result<Vec<Self>, XmlError> {
        let mut records = vec![];
        for node in xml_read::find_all(annotation, "azimuthFmRate") {
            let coefficients = if xml_read::find(node, "azimuthFmRatePolynomial").is_some() {
                let poly: Vec<f64> =
                    xml_read::req_list(node, "azimuthFmRatePolynomial", filename)?;
                if poly.len() != 3 {
                    return Err(XmlError::Parse {
                        value: format!("{} coefficients", poly.len()),
                        element: "azimuthFmRatePolynomial".to_string(),
                        filename: filename.to_string(),
                    });
                }
                [poly[0], poly[1], poly[2]]
            } else {
                [
                    xml_read::req_parse(node, "c0", filename)?,
                    xml_read::req_parse(node, "c1", filename)?,
                    xml_read::req_parse(node, "c2", filename)?,
                ]
            };
            records.push(AzimuthFmRate {
                azimuth_time: xml_read::req_time(node, "azimuthTime", filename)?,
                t0: xml_read::req_parse(node, "t0", filename)?,
                coefficients,
            });
        }
        if records.is_empty() {
            return Err(XmlError::MissingElement {
                name: "azimuthFmRate".to_string(),
                filename: filename.to_string(),
            });
        }
        Ok(records)
    }

    /// Polynomial value at a slant-range time.
    pub fn eval(&self, slant_range_time: f64) -> f64 {
        let dt = slant_range_time - self.t0;
        self.coefficients[0] + self.coefficients[1] * dt + self.coefficients[2] * dt * dt
    }
}

/// The motion Doppler rate at paired (azimuth, slant-range) times.
///
/// Each record's polynomial is evaluated at the slant-range time, then the
/// record values are interpolated in azimuth time (clamped at the ends).
pub fn fm_rate_at(
    records: &[AzimuthFmRate],
    center: NaiveDateTime,
    azimuth_times: &[f64],
    slant_range_times: &[f64],
) -> Result<Vec<f64>, S1Error> {
    if azimuth_times.len() != slant_range_times.len() {
        return Err(S1Error::LengthMismatch {
            context: "azimuth FM rate evaluation",
            left: azimuth_times.len(),
            right: slant_range_times.len(),
        });
    }
    let xp: Vec<f64> = records
        .iter()
        .map(|r| xml_read::seconds_since(r.azimuth_time, center))
        .collect();
    Ok(azimuth_times
        .iter()
        .zip(slant_range_times)
        .map(|(&eta, &tau)| {
            let fp: Vec<f64> = records.iter().map(|r| r.eval(tau)).collect();
            clamped_interp(eta, &xp, &fp)
        })
        .collect())
}
