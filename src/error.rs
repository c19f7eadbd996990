// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Structs and helper methods for Error handling

use thiserror::Error;

/// S1Error subtypes
#[derive(Error, Debug)]
pub enum S1Error {
    /// An error derived from `XmlError`.
    #[error("{0}")]
    Xml(#[from] crate::xml_read::error::XmlError),

    /// An error derived from `SafeError`.
    #[error("{0}")]
    Safe(#[from] crate::safe::error::SafeError),

    /// An error derived from `ProductError`.
    #[error("{0}")]
    Product(#[from] crate::product::error::ProductError),

    /// An error derived from `AuxCalError`.
    #[error("{0}")]
    AuxCal(#[from] crate::aux_cal::error::AuxCalError),

    /// An error derived from `MeasurementError`.
    #[error("{0}")]
    Measurement(#[from] crate::measurement::error::MeasurementError),

    /// An error derived from `CoefficientError`.
    #[error("{0}")]
    Coefficient(#[from] crate::coefficients::error::CoefficientError),

    // The focused burst count of a subswath could not be determined.
    #[error("Number of bursts cannot be determined for swath {swath}: {number_of_input_lines} input lines have no divisor in 2..={max_bursts}")]
    BurstCountUndetermined {
        swath: String,
        number_of_input_lines: usize,
        max_bursts: usize,
    },

    // Two vectors that must be evaluated together have different lengths.
    #[error("Vector length mismatch in {context}: {left} vs {right}")]
    LengthMismatch {
        context: &'static str,
        left: usize,
        right: usize,
    },

    // Burst timing needs at least two antenna pattern records.
    #[error("Not enough antenna pattern records to derive burst timing (got {0})")]
    InsufficientAntennaPattern(usize),

    /// The noise LUT shift minimizer failed to converge.
    #[error("Noise LUT shift optimization failed: {0}")]
    ShiftOptimization(String),

    /// An IO error wrapping `std::io::Error`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
