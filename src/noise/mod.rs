// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for thermal noise vector metadata

The noise annotation carries two families of vectors: range noise LUTs
(one per annotated line) and, from IPF 2.9, azimuth noise vectors holding
the scalloping gain per subswath block. Products processed before IPF 2.9
have no azimuth vectors; a single unit-gain block per subswath is
synthesized and the scalloping gain is reconstructed from the antenna
geometry instead.
*/

use chrono::NaiveDateTime;
use roxmltree::Node;

use crate::swath::{ObsMode, SwathId};
use crate::xml_read::{self, XmlError};

/// IPF version from which azimuth noise vectors are annotated.
pub const AZIMUTH_NOISE_IPF: f64 = 2.9;

/// One range noise vector: the noise LUT along one image line.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeNoiseVector {
    /// Zero-Doppler azimuth time of the vector
    pub azimuth_time: NaiveDateTime,
    /// Image line of the vector
    pub line: i32,
    /// Range samples of the LUT entries, strictly increasing
    pub pixels: Vec<i32>,
    /// Thermal noise LUT values
    pub noise: Vec<f64>,
}

/// One azimuth noise vector: scalloping gain samples along azimuth for one
/// subswath block.
#[derive(Debug, Clone, PartialEq)]
pub struct AzimuthNoiseVector {
    /// Which subswath the block belongs to
    pub swath: SwathId,
    /// First azimuth line covered by the block (inclusive)
    pub first_azimuth_line: i32,
    /// First range sample covered by the block (inclusive)
    pub first_range_sample: i32,
    /// Last azimuth line covered by the block (inclusive)
    pub last_azimuth_line: i32,
    /// Last range sample covered by the block (inclusive)
    pub last_range_sample: i32,
    /// Image lines of the gain samples
    pub lines: Vec<i32>,
    /// Scalloping gain samples
    pub noise: Vec<f64>,
}

/// All noise vectors of one polarization.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseTable {
    /// Range noise vectors in annotation (azimuth) order
    pub range: Vec<RangeNoiseVector>,
    /// Azimuth noise vectors, annotated or synthesized
    pub azimuth: Vec<AzimuthNoiseVector>,
}

impl NoiseTable {
    /// Parse a noise document. The element names changed with IPF 2.9
    /// (`noiseVector`/`noiseLut` became `noiseRangeVector`/`noiseRangeLut`)
    /// and azimuth vectors only exist from that version; older products get
    /// one synthetic unit-gain block per subswath.
    pub fn parse(
        noise: Node,
        filename: &str,
        ipf_version: f64,
        mode: ObsMode,
        shape: (usize, usize),
    ) -> Result<Self, XmlError> {
        let (vector_name, lut_name) = if ipf_version < AZIMUTH_NOISE_IPF {
            ("noiseVector", "noiseLut")
        } else {
            ("noiseRangeVector", "noiseRangeLut")
        };

        let mut range = vec![];
        for node in xml_read::find_all(noise, vector_name) {
            range.push(RangeNoiseVector {
                azimuth_time: xml_read::req_time(node, "azimuthTime", filename)?,
                line: xml_read::req_parse(node, "line", filename)?,
                pixels: xml_read::req_list(node, "pixel", filename)?,
                noise: xml_read::req_list(node, lut_name, filename)?,
            });
        }
        if range.is_empty() {
            return Err(XmlError::MissingElement {
                name: vector_name.to_string(),
                filename: filename.to_string(),
            });
        }

        let azimuth = if ipf_version < AZIMUTH_NOISE_IPF {
            Self::synthesize_azimuth(mode, shape)
        } else {
            let mut azimuth = vec![];
            for node in xml_read::find_all(noise, "noiseAzimuthVector") {
                let name = xml_read::req_text(node, "swath", filename)?;
                let swath = SwathId::from_name(name).ok_or_else(|| XmlError::Parse {
                    value: name.to_string(),
                    element: "swath".to_string(),
                    filename: filename.to_string(),
                })?;
                azimuth.push(AzimuthNoiseVector {
                    swath,
                    first_azimuth_line: xml_read::req_parse(node, "firstAzimuthLine", filename)?,
                    first_range_sample: xml_read::req_parse(node, "firstRangeSample", filename)?,
                    last_azimuth_line: xml_read::req_parse(node, "lastAzimuthLine", filename)?,
                    last_range_sample: xml_read::req_parse(node, "lastRangeSample", filename)?,
                    lines: xml_read::req_list(node, "line", filename)?,
                    noise: xml_read::req_list(node, "noiseAzimuthLut", filename)?,
                });
            }
            azimuth
        };

        Ok(NoiseTable { range, azimuth })
    }

    /// One full-image unit-gain block per subswath for pre-2.9 products.
    fn synthesize_azimuth(mode: ObsMode, shape: (usize, usize)) -> Vec<AzimuthNoiseVector> {
        mode.swaths()
            .iter()
            .map(|&swath| AzimuthNoiseVector {
                swath,
                first_azimuth_line: 0,
                first_range_sample: 0,
                last_azimuth_line: shape.0 as i32 - 1,
                last_range_sample: shape.1 as i32 - 1,
                lines: vec![0, shape.0 as i32 - 1],
                noise: vec![1.0, 1.0],
            })
            .collect()
    }

    /// The image line of each range vector.
    pub fn lines(&self) -> Vec<i32> {
        self.range.iter().map(|v| v.line).collect()
    }

    /// Azimuth noise vectors of one subswath.
    pub fn azimuth_for(&self, swath: SwathId) -> Vec<&AzimuthNoiseVector> {
        self.azimuth.iter().filter(|v| v.swath == swath).collect()
    }
}

#[cfg(test)]
mod test;
