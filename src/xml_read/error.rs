// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Errors associated with parsing metadata XML documents.
*/
use thiserror::Error;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Malformed XML in {filename}: {message}")]
    Malformed { filename: String, message: String },

    #[error("Missing element <{name}> in {filename}")]
    MissingElement { name: String, filename: String },

    #[error("Missing attribute '{name}' on <{element}> in {filename}")]
    MissingAttribute {
        name: String,
        element: String,
        filename: String,
    },

    #[error("Couldn't parse '{value}' in <{element}> of {filename}")]
    Parse {
        value: String,
        element: String,
        filename: String,
    },

    #[error("Couldn't parse '{value}' as an azimuth time")]
    Time { value: String },
}
