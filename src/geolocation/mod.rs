// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for the geolocation grid
*/

use chrono::NaiveDateTime;
use ndarray::Array2;
use roxmltree::Node;

use crate::interp::Grid2;
use crate::xml_read::{self, XmlError};

/// The sparse geolocation grid of one polarization: unique sorted lines x
/// unique sorted pixels with an aligned 2-D array per scalar field.
#[derive(Debug, Clone)]
pub struct GeolocationGrid {
    /// Unique image lines of the grid, ascending
    pub lines: Vec<i32>,
    /// Unique range samples of the grid, ascending
    pub pixels: Vec<i32>,
    /// Zero-Doppler azimuth time per grid point
    pub azimuth_time: Array2<NaiveDateTime>,
    /// Two-way slant range time per grid point, seconds
    pub slant_range_time: Array2<f64>,
    /// Elevation angle per grid point, degrees
    pub elevation_angle: Array2<f64>,
    /// Incidence angle per grid point, degrees
    pub incidence_angle: Array2<f64>,
    /// Geodetic latitude per grid point, degrees
    pub latitude: Array2<f64>,
    /// Geodetic longitude per grid point, degrees
    pub longitude: Array2<f64>,
    /// Height above the ellipsoid per grid point, metres
    pub height: Array2<f64>,
}

impl GeolocationGrid {
    /// Parse all `geolocationGridPoint` records of an annotation document.
    pub fn parse(annotation: Node, filename: &str) -> Result<Self, XmlError> {
        struct Point {
            line: i32,
            pixel: i32,
            azimuth_time: NaiveDateTime,
            slant_range_time: f64,
            elevation_angle: f64,
            incidence_angle: f64,
            latitude: f64,
            longitude: f64,
            height: f64,
        }

        let mut points = vec![];
        for node in xml_read::find_all(annotation, "geolocationGridPoint") {
            points.push(Point {
                line: xml_read::req_parse(node, "line", filename)?,
                pixel: xml_read::req_parse(node, "pixel", filename)?,
                azimuth_time: xml_read::req_time(node, "azimuthTime", filename)?,
                slant_range_time: xml_read::req_parse(node, "slantRangeTime", filename)?,
                elevation_angle: xml_read::req_parse(node, "elevationAngle", filename)?,
                incidence_angle: xml_read::req_parse(node, "incidenceAngle", filename)?,
                latitude: xml_read::req_parse(node, "latitude", filename)?,
                longitude: xml_read::req_parse(node, "longitude", filename)?,
                height: xml_read::req_parse(node, "height", filename)?,
            });
        }
        if points.is_empty() {
            return Err(XmlError::MissingElement {
                name: "geolocationGridPoint".to_string(),
                filename: filename.to_string(),
            });
        }

        let mut lines: Vec<i32> = points.iter().map(|p| p.line).collect();
        lines.sort_unstable();
        lines.dedup();
        let mut pixels: Vec<i32> = points.iter().map(|p| p.pixel).collect();
        pixels.sort_unstable();
        pixels.dedup();

        let shape = (lines.len(), pixels.len());
        let t0 = points[0].azimuth_time;
        let mut grid = GeolocationGrid {
            azimuth_time: Array2::from_elem(shape, t0),
            slant_range_time: Array2::zeros(shape),
            elevation_angle: Array2::zeros(shape),
            incidence_angle: Array2::zeros(shape),
            latitude: Array2::zeros(shape),
            longitude: Array2::zeros(shape),
            height: Array2::zeros(shape),
            lines,
            pixels,
        };
        for p in &points {
            let r = grid.lines.binary_search(&p.line).expect("line is present");
            let c = grid
                .pixels
                .binary_search(&p.pixel)
                .expect("pixel is present");
            grid.azimuth_time[[r, c]] = p.azimuth_time;
            grid.slant_range_time[[r, c]] = p.slant_range_time;
            grid.elevation_angle[[r, c]] = p.elevation_angle;
            grid.incidence_angle[[r, c]] = p.incidence_angle;
            grid.latitude[[r, c]] = p.latitude;
            grid.longitude[[r, c]] = p.longitude;
            grid.height[[r, c]] = p.height;
        }
        Ok(grid)
    }

    /// Azimuth time per grid point as seconds relative to the scene centre.
    pub fn relative_azimuth_time(&self, center: NaiveDateTime) -> Array2<f64> {
        self.azimuth_time
            .map(|t| xml_read::seconds_since(*t, center))
    }

    /// Degree-1 bivariate interpolator over (line, pixel) for one field.
    pub fn interpolator(&self, field: &Array2<f64>) -> Grid2 {
        Grid2::new(
            self.lines.iter().map(|&v| v as f64).collect(),
            self.pixels.iter().map(|&v| v as f64).collect(),
            field.clone(),
        )
    }

    /// Lift one grid field to the full image resolution.
    pub fn full_size(&self, field: &Array2<f64>, shape: (usize, usize)) -> Array2<f64> {
        let rows: Vec<f64> = (0..shape.0).map(|v| v as f64).collect();
        let cols: Vec<f64> = (0..shape.1).map(|v| v as f64).collect();
        self.interpolator(field).eval_grid(&rows, &cols)
    }
}

#[cfg(test)]
mod test;
