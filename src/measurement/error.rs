// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with reading measurement GeoTIFF rasters.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeasurementError {
    #[error("Failed to decode GeoTIFF {name}: {message}")]
    Tiff { name: String, message: String },

    #[error("Unsupported sample format in GeoTIFF {name}")]
    UnsupportedSampleFormat { name: String },

    #[error("{0}")]
    Safe(#[from] crate::safe::error::SafeError),
}
