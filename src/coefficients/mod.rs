// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for the denoising coefficient table

Noise-scaling (NS), power-balancing (PB), extra-scaling (ES),
noise-variance (NV) and total-gain (APG) coefficients are fitted offline
(see [`crate::experiments`]) and shipped as a JSON table compiled into the
library. Entries are keyed by
`{platform}_{mode}_{resolution}_{pol}_{kind}_{IPF}` with per-swath values.

A missing NS/PB entry is not fatal: the lookup falls back to a neutral
`ns = 1`, `pb = 0` and reports a warning.
*/

pub mod error;

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::product::{Platform, Polarization, ProductName};
use crate::swath::SwathId;

pub use error::CoefficientError;

/// The denoising coefficient table bundled with the library.
const BUNDLED_JSON: &str = include_str!("denoising_parameters.json");

lazy_static! {
    static ref BUNDLED: CoefficientTable =
        CoefficientTable::from_json(BUNDLED_JSON).expect("bundled coefficient table is valid");
}

/// Scale and offset of one noise-scaling / power-balancing lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseScaling {
    /// Multiplicative NESZ correction per swath
    pub ns: HashMap<SwathId, f64>,
    /// Additive power-balance correction per swath
    pub pb: HashMap<SwathId, f64>,
}

/// The JSON-backed coefficient table.
#[derive(Debug, Clone)]
pub struct CoefficientTable {
    params: serde_json::Map<String, Value>,
}

impl CoefficientTable {
    /// The table compiled into the library.
    pub fn bundled() -> &'static CoefficientTable {
        &BUNDLED
    }

    /// Parse a table from JSON text.
    pub fn from_json(text: &str) -> Result<Self, CoefficientError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| CoefficientError::BadJson(e.to_string()))?;
        match value {
            Value::Object(params) => Ok(CoefficientTable { params }),
            _ => Err(CoefficientError::BadJson(
                "top level is not an object".to_string(),
            )),
        }
    }

    /// The IPF version used for coefficient lookup.
    ///
    /// ESA abruptly changed the scaling LUT in AUX_PP1 on 2017-01-16 while
    /// keeping the IPF version at 2.72 on S1B; products sensed after the
    /// change use the 2.8 coefficients.
    pub fn effective_ipf(platform: Platform, ipf_version: f64, sensing: NaiveDateTime) -> f64 {
        let changeover = NaiveDate::from_ymd_opt(2017, 1, 16)
            .unwrap()
            .and_hms_opt(13, 42, 34)
            .unwrap();
        if platform == Platform::S1B && ipf_version == 2.72 && sensing >= changeover {
            return 2.8;
        }
        ipf_version
    }

    /// Noise-scaling and power-balancing coefficients for a product.
    ///
    /// Missing entries fall back to `ns = 1`, `pb = 0`; each fallback adds
    /// a warning string.
    pub fn noise_scaling(
        &self,
        product: &ProductName,
        pol: Polarization,
        ipf_version: f64,
    ) -> (NoiseScaling, Vec<String>) {
        let ipf = Self::effective_ipf(
            product.platform,
            ipf_version,
            product.time_coverage_start,
        );
        let base = product.coefficient_base(pol);
        let ns_key = format!("{base}_NS_{ipf:.1}");
        let pb_key = format!("{base}_PB_{ipf:.1}");

        let mut warnings = vec![];
        let mut ns = HashMap::new();
        let mut pb = HashMap::new();
        for &swath in product.mode.swaths() {
            match self.swath_value(&ns_key, swath) {
                Some(value) => {
                    ns.insert(swath, value);
                }
                None => {
                    warnings.push(format!(
                        "noise scaling for {swath} (IPF: {ipf}) is missing"
                    ));
                    ns.insert(swath, 1.0);
                }
            }
            match self.swath_value(&pb_key, swath) {
                Some(value) => {
                    pb.insert(swath, value);
                }
                None => {
                    warnings.push(format!(
                        "power balancing for {swath} (IPF: {ipf}) is missing"
                    ));
                    pb.insert(swath, 0.0);
                }
            }
        }
        (NoiseScaling { ns, pb }, warnings)
    }

    /// Per-swath scales and offsets of the total-gain noise model, derived
    /// from the `APG` fit entry: `offset_i = B[2i] / Y_SCALE`,
    /// `scale_i = B[2i+1] A_SCALE / Y_SCALE`.
    pub fn tg_scales_offsets(
        &self,
        product: &ProductName,
        ipf_version: f64,
    ) -> Result<(Vec<f64>, Vec<f64>), CoefficientError> {
        let key = format!("{}_APG_{ipf_version:.2}", product.type_prefix());
        let entry = self
            .params
            .get(&key)
            .ok_or_else(|| CoefficientError::MissingEntry { key: key.clone() })?;
        let b = Self::float_array(entry, "B", &key)?;
        let y_scale = Self::float_field(entry, "Y_SCALE", &key)?;
        let a_scale = Self::float_field(entry, "A_SCALE", &key)?;
        if b.len() % 2 != 0 || b.is_empty() {
            return Err(CoefficientError::Malformed {
                key,
                message: format!("B must hold offset/scale pairs, got {} values", b.len()),
            });
        }
        let mut scales = vec![];
        let mut offsets = vec![];
        for pair in b.chunks_exact(2) {
            offsets.push(pair[0] / y_scale);
            scales.push(pair[1] * a_scale / y_scale);
        }
        Ok((scales, offsets))
    }

    /// Extra-scaling (ES) coefficients: a gain per SNNR bin per swath.
    /// Falls back to a unit gain over `SNNR = -30..30` with a warning.
    pub fn extra_scaling(
        &self,
        product: &ProductName,
        pol: Polarization,
        ipf_version: f64,
    ) -> (HashMap<SwathId, Vec<f64>>, Vec<f64>, Vec<String>) {
        let ipf = Self::effective_ipf(
            product.platform,
            ipf_version,
            product.time_coverage_start,
        );
        let key = format!("{}_ES_{ipf:.1}", product.coefficient_base(pol));
        let mut warnings = vec![];
        let mut scaling = HashMap::new();

        let snnr = match self.params.get(&key).and_then(|e| e.get("SNNR")) {
            Some(value) => value
                .as_array()
                .map(|a| a.iter().filter_map(Value::as_f64).collect::<Vec<f64>>())
                .unwrap_or_default(),
            None => {
                warnings.push(format!("extra scaling (IPF: {ipf}) is missing"));
                (0..601).map(|i| -30.0 + i as f64 * 0.1).collect()
            }
        };
        for &swath in product.mode.swaths() {
            let values = self
                .params
                .get(&key)
                .and_then(|e| e.get(swath.as_str()))
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_f64).collect::<Vec<f64>>());
            match values {
                Some(values) if values.len() == snnr.len() => {
                    scaling.insert(swath, values);
                }
                _ => {
                    scaling.insert(swath, vec![1.0; snnr.len()]);
                }
            }
        }
        (scaling, snnr, warnings)
    }

    /// Noise-variance (NV) coefficients, zero when missing.
    pub fn noise_variance(
        &self,
        product: &ProductName,
        pol: Polarization,
        ipf_version: f64,
    ) -> (HashMap<SwathId, f64>, Vec<String>) {
        let ipf = Self::effective_ipf(
            product.platform,
            ipf_version,
            product.time_coverage_start,
        );
        let key = format!("{}_NV_{ipf:.1}", product.coefficient_base(pol));
        let mut warnings = vec![];
        let mut variance = HashMap::new();
        for &swath in product.mode.swaths() {
            match self.swath_value(&key, swath) {
                Some(value) => {
                    variance.insert(swath, value);
                }
                None => {
                    warnings.push(format!(
                        "noise variance for {swath} (IPF: {ipf}) is missing"
                    ));
                    variance.insert(swath, 0.0);
                }
            }
        }
        (variance, warnings)
    }

    fn swath_value(&self, key: &str, swath: SwathId) -> Option<f64> {
        self.params
            .get(key)
            .and_then(|entry| entry.get(swath.as_str()))
            .and_then(Value::as_f64)
    }

    fn float_field(entry: &Value, field: &str, key: &str) -> Result<f64, CoefficientError> {
        entry
            .get(field)
            .and_then(Value::as_f64)
            .ok_or_else(|| CoefficientError::Malformed {
                key: key.to_string(),
                message: format!("missing float field {field}"),
            })
    }

    fn float_array(entry: &Value, field: &str, key: &str) -> Result<Vec<f64>, CoefficientError> {
        entry
            .get(field)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_f64).collect())
            .ok_or_else(|| CoefficientError::Malformed {
                key: key.to_string(),
                message: format!("missing array field {field}"),
            })
    }
}
