// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with identifying and reading a Sentinel-1 product.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProductError {
    #[error("Source file {0} must be a Sentinel-1A/1B IW_GRDH_1SDH, IW_GRDH_1SDV, EW_GRDM_1SDH, or EW_GRDM_1SDV product")]
    UnsupportedProduct(String),

    #[error("IPF version {version} of the input image is lower than 2.43. Denoising vectors in annotation files are not qualified; only total-gain based denoising can be performed")]
    UnsupportedIpf { version: f64 },

    #[error("Polarization {0} is not present in this product")]
    MissingPolarization(String),

    #[error("Couldn't parse IPF version '{0}' from the manifest")]
    BadIpfVersion(String),
}
