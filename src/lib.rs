// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
`s1denoise` is a library to simplify radiometric calibration and thermal
noise removal for Sentinel-1 Ground Range Detected (GRD) products.

The main interface is [`Sentinel1Product`], constructed from a SAFE
directory or ZIP file. It reads the annotation, calibration, noise,
manifest and auxiliary-calibration metadata into typed records, and exposes
the denoising pipeline: calibrated sigma nought with the noise-equivalent
sigma zero (NESZ) subtracted, with optional inter-subswath power balancing
and texture-noise attenuation.
*/

#[macro_use]
extern crate lazy_static;

pub mod antenna;
pub mod aux_cal;
pub mod calibration;
pub mod coefficients;
pub mod denoise;
pub mod error;
pub mod experiments;
pub mod fm_rate;
pub mod geolocation;
pub mod interp;
pub mod measurement;
pub mod noise;
pub mod orbit;
pub mod product;
pub mod raster;
pub mod safe;
pub mod scalloping;
pub mod swath;
pub mod xml_read;

#[cfg(test)]
mod test_fixtures;

// Re-exports.
pub use antenna::{AntennaPattern, BoresightInterpolator, EapInterpolator};
pub use calibration::CalibrationTable;
pub use coefficients::CoefficientTable;
pub use denoise::Algorithm;
pub use error::S1Error;
pub use geolocation::GeolocationGrid;
pub use noise::{AzimuthNoiseVector, NoiseTable, RangeNoiseVector};
pub use orbit::{Orbit, OrbitStateVector};
pub use product::{Platform, Polarization, ProductName, Sentinel1Product};
pub use swath::{BoundBlock, ObsMode, SwathBounds, SwathId};

/// Speed of light in a vacuum, in metres per second.
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Sentinel-1 C-band radar carrier frequency, in Hz.
pub const RADAR_FREQUENCY: f64 = 5.405_000_454_334_35e9;

/// Sentinel-1 radar wavelength, in metres.
pub const RADAR_WAVELENGTH: f64 = SPEED_OF_LIGHT / RADAR_FREQUENCY;

/// WGS-84 semi-major axis, in metres.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS-84 semi-minor axis, in metres.
pub const WGS84_SEMI_MINOR_AXIS: f64 = 6_356_752.314_245_179;
