// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Helper methods for reading the measurement GeoTIFF rasters
*/

pub mod error;

use std::io::Cursor;

use ndarray::Array2;
use tiff::decoder::{Decoder, DecodingResult};

use crate::safe::SafeContainer;

pub use error::MeasurementError;

/// Read a digital-number raster from a measurement member of the product.
///
/// The measurement images are unsigned 16-bit, but any integer or float
/// sample format decodes to `f64`.
pub fn read_digital_numbers(
    container: &SafeContainer,
    member: &str,
) -> Result<Array2<f64>, MeasurementError> {
    let bytes = container.read(member)?;
    let mut decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| MeasurementError::Tiff {
        name: member.to_string(),
        message: e.to_string(),
    })?;
    let (width, height) = decoder.dimensions().map_err(|e| MeasurementError::Tiff {
        name: member.to_string(),
        message: e.to_string(),
    })?;
    let image = decoder.read_image().map_err(|e| MeasurementError::Tiff {
        name: member.to_string(),
        message: e.to_string(),
    })?;
    let samples: Vec<f64> = match image {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
        _ => {
            return Err(MeasurementError::UnsupportedSampleFormat {
                name: member.to_string(),
            })
        }
    };
    Array2::from_shape_vec((height as usize, width as usize), samples).map_err(|e| {
        MeasurementError::Tiff {
            name: member.to_string(),
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod test;
