// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with locating and reading the auxiliary calibration file.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuxCalError {
    #[error("AUX calibration archive does not include {filename}. This is probably because your product was created with an IPF version after 11/2024.")]
    FileNotInArchive { filename: String },

    #[error("Failed to download AUX calibration archive from {url}: {message}")]
    Download { url: String, message: String },

    #[error("Failed to extract AUX calibration archive {archive}: {message}")]
    Extract { archive: String, message: String },

    #[error("No AUX_CAL resource found in {filename}")]
    MissingResource { filename: String },

    #[error("No calibrationParams for polarization {polarization} swath {swath} in the AUX calibration file")]
    MissingParams { polarization: String, swath: String },

    #[error("IO error while handling the AUX calibration archive: {0}")]
    Io(#[from] std::io::Error),
}
