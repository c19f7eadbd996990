// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with the denoising coefficient table.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoefficientError {
    #[error("Denoising coefficient table is not valid JSON: {0}")]
    BadJson(String),

    #[error("No {key} entry in the denoising coefficient table")]
    MissingEntry { key: String },

    #[error("Malformed {key} entry in the denoising coefficient table: {message}")]
    Malformed { key: String, message: String },
}
