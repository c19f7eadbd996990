// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with reading SAFE containers.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SafeError {
    #[error("Product {0} does not exist")]
    NotFound(String),

    #[error("Failed to read ZIP container {container}: {message}")]
    Zip { container: String, message: String },

    #[error("File {name} not found in product {container}")]
    MissingFile { name: String, container: String },

    #[error("Required {kind} file for polarization {polarization} not found in {container}")]
    MissingMember {
        kind: &'static str,
        polarization: String,
        container: String,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
