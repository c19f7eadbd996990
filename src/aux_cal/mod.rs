// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for auxiliary calibration (AUX_CAL) metadata

The antenna element patterns are not part of the product; they live in an
auxiliary calibration archive published by the S-1 Mission Performance
Centre. The archive is downloaded once and cached under
`$XDG_DATA_HOME/.s1denoise` (falling back to `$HOME/.s1denoise`).
*/

pub mod error;

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use roxmltree::Node;

use crate::product::{Platform, Polarization};
use crate::swath::SwathId;
use crate::xml_read::{self, XmlError};

pub use error::AuxCalError;

/// Version tag of the AUX_CAL archive published by the MPC.
const AUX_ARCHIVE_DATE: &str = "20241128";

/// Calibration parameters for one (polarization, subswath) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxCalParams {
    /// Absolute calibration constant
    pub absolute_calibration_constant: f64,
    /// Noise calibration factor
    pub noise_calibration_factor: f64,
    /// Elevation angle step of the EAP samples, degrees
    pub elevation_angle_increment: f64,
    /// Azimuth angle step of the AAEP samples, degrees
    pub azimuth_angle_increment: f64,
    /// Declared EAP sample count; equal to the value count when the
    /// pattern is in dB, half of it when the values are interleaved
    /// complex pairs
    pub elevation_pattern_count: usize,
    /// Elevation antenna pattern values
    pub elevation_pattern: Vec<f64>,
    /// Azimuth antenna element pattern values, dB
    pub azimuth_pattern: Vec<f64>,
}

/// All calibration parameters of the auxiliary file, keyed by
/// (polarization, subswath).
#[derive(Debug, Clone, Default)]
pub struct AuxCalibration {
    params: HashMap<(Polarization, SwathId), AuxCalParams>,
}

impl AuxCalibration {
    /// Parse every `calibrationParams` record of an AUX_CAL document.
    pub fn parse(aux: Node, filename: &str) -> Result<Self, XmlError> {
        let mut params = HashMap::new();
        for node in xml_read::find_all(aux, "calibrationParams") {
            let swath_name = xml_read::req_text(node, "swath", filename)?;
            let pol_name = xml_read::req_text(node, "polarisation", filename)?;
            let (Some(swath), Some(pol)) = (
                SwathId::from_name(swath_name),
                Polarization::from_name(pol_name),
            ) else {
                // wave-mode and other unused records
                continue;
            };
            let eap = xml_read::req(node, "elevationAntennaPattern", filename)?;
            let eap_values = xml_read::req(eap, "values", filename)?;
            let count: usize = xml_read::req_attr(eap_values, "count", filename)?
                .parse()
                .map_err(|_| XmlError::Parse {
                    value: xml_read::req_attr(eap_values, "count", filename)
                        .unwrap_or("")
                        .to_string(),
                    element: "count".to_string(),
                    filename: filename.to_string(),
                })?;
            let aaep = xml_read::req(node, "azimuthAntennaElementPattern", filename)?;
            params.insert(
                (pol, swath),
                AuxCalParams {
                    absolute_calibration_constant: xml_read::req_parse(
                        node,
                        "absoluteCalibrationConstant",
                        filename,
                    )?,
                    noise_calibration_factor: xml_read::req_parse(
                        node,
                        "noiseCalibrationFactor",
                        filename,
                    )?,
                    elevation_angle_increment: xml_read::req_parse(
                        eap,
                        "elevationAngleIncrement",
                        filename,
                    )?,
                    azimuth_angle_increment: xml_read::req_parse(
                        aaep,
                        "azimuthAngleIncrement",
                        filename,
                    )?,
                    elevation_pattern_count: count,
                    elevation_pattern: xml_read::req_list(eap, "values", filename)?,
                    azimuth_pattern: xml_read::req_list(aaep, "values", filename)?,
                },
            );
        }
        Ok(AuxCalibration { params })
    }

    /// Parameters for one (polarization, subswath) pair.
    pub fn get(&self, pol: Polarization, swath: SwathId) -> Result<&AuxCalParams, AuxCalError> {
        self.params
            .get(&(pol, swath))
            .ok_or_else(|| AuxCalError::MissingParams {
                polarization: pol.as_str().to_string(),
                swath: swath.as_str().to_string(),
            })
    }

    /// Build directly from pre-parsed parameters (used by tests).
    pub fn from_params(params: HashMap<(Polarization, SwathId), AuxCalParams>) -> Self {
        AuxCalibration { params }
    }
}

/// Directory where auxiliary calibration data is cached.
pub fn aux_data_dir() -> PathBuf {
    let base = std::env::var_os("XDG_DATA_HOME")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    base.join(".s1denoise")
}

/// Path of the AUX calibration XML for one product inside the extracted
/// archive. The year/month/hour subdirectories are parsed from the
/// validity-start field of the auxiliary file name.
pub fn aux_cal_path(aux_dir: &Path, platform: Platform, aux_filename: &str) -> PathBuf {
    let archive = format!("{}_AUX_CAL_{}", platform.as_str(), AUX_ARCHIVE_DATE);
    let validity_start = aux_filename
        .split('_')
        .nth(3)
        .unwrap_or("")
        .trim_start_matches('V');
    let (year, month, hour) = (
        validity_start.get(0..4).unwrap_or(""),
        validity_start.get(4..6).unwrap_or(""),
        validity_start.get(6..8).unwrap_or(""),
    );
    aux_dir
        .join(archive)
        .join(platform.as_str())
        .join("AUX_CAL")
        .join(year)
        .join(month)
        .join(hour)
        .join(aux_filename)
        .join("data")
        .join(format!("{}-aux-cal.xml", platform.as_str().to_lowercase()))
}

/// Locate the AUX calibration file for a product, downloading and
/// extracting the archive on first use.
pub fn fetch_aux_calibration_file(
    platform: Platform,
    aux_filename: &str,
) -> Result<PathBuf, AuxCalError> {
    let aux_dir = aux_data_dir();
    fs::create_dir_all(&aux_dir)?;
    let archive = format!("{}_AUX_CAL_{}", platform.as_str(), AUX_ARCHIVE_DATE);
    let archive_path = aux_dir.join(&archive);
    let aux_cal_file = aux_cal_path(&aux_dir, platform, aux_filename);

    if archive_path.exists() {
        // the unzipped archive already exists
        if aux_cal_file.exists() {
            return Ok(aux_cal_file);
        }
        return Err(AuxCalError::FileNotInArchive {
            filename: aux_filename.to_string(),
        });
    }

    let url = format!("https://sar-mpc.eu/files/{archive}.zip");
    info!("Downloading AUX calibration archive from {url}");
    let body = reqwest::blocking::get(&url)
        .and_then(|r| r.error_for_status())
        .and_then(|r| r.bytes())
        .map_err(|e| AuxCalError::Download {
            url: url.clone(),
            message: e.to_string(),
        })?;
    let zip_path = aux_dir.join(format!("{archive}.zip"));
    fs::File::create(&zip_path)?.write_all(&body)?;

    let file = fs::File::open(&zip_path)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| AuxCalError::Extract {
        archive: archive.clone(),
        message: e.to_string(),
    })?;
    zip.extract(&archive_path).map_err(|e| AuxCalError::Extract {
        archive: archive.clone(),
        message: e.to_string(),
    })?;

    if !aux_cal_file.exists() {
        return Err(AuxCalError::FileNotInArchive {
            filename: aux_filename.to_string(),
        });
    }
    Ok(aux_cal_file)
}
