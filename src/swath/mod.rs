// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for subswath metadata
*/

use std::fmt;

use chrono::NaiveDateTime;
use ndarray::Array2;
use roxmltree::Node;

use crate::xml_read::{self, XmlError};

/// Enum for the Sentinel-1 wide-swath acquisition modes
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum ObsMode {
    /// Interferometric Wide swath (3 subswaths)
    Iw,
    /// Extra Wide swath (5 subswaths)
    Ew,
}

impl ObsMode {
    /// Number of subswaths in this mode.
    pub fn swath_count(&self) -> usize {
        match self {
            ObsMode::Iw => 3,
            ObsMode::Ew => 5,
        }
    }

    /// The subswath ids of this mode in range order.
    pub fn swaths(&self) -> &'static [SwathId] {
        match self {
            ObsMode::Iw => &[SwathId::Iw1, SwathId::Iw2, SwathId::Iw3],
            ObsMode::Ew => &[
                SwathId::Ew1,
                SwathId::Ew2,
                SwathId::Ew3,
                SwathId::Ew4,
                SwathId::Ew5,
            ],
        }
    }

    /// Nominal SLC lines per burst, used to bound the focused burst count.
    /// Deliberately smaller than the real burst lengths.
    pub fn nominal_lines_per_burst(&self) -> usize {
        match self {
            ObsMode::Iw => 1450,
            ObsMode::Ew => 1100,
        }
    }

    /// Range samples cropped off block edges in the coefficient
    /// experiments.
    pub fn experiment_crop(&self) -> i32 {
        match self {
            ObsMode::Iw => 400,
            ObsMode::Ew => 200,
        }
    }
}

impl fmt::Display for ObsMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ObsMode::Iw => "IW",
                ObsMode::Ew => "EW",
            }
        )
    }
}

/// Symbolic id of one subswath (one antenna beam).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub enum SwathId {
    Iw1,
    Iw2,
    Iw3,
    Ew1,
    Ew2,
    Ew3,
    Ew4,
    Ew5,
}

impl SwathId {
    /// The tag used in annotation XML and the coefficient JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            SwathId::Iw1 => "IW1",
            SwathId::Iw2 => "IW2",
            SwathId::Iw3 => "IW3",
            SwathId::Ew1 => "EW1",
            SwathId::Ew2 => "EW2",
            SwathId::Ew3 => "EW3",
            SwathId::Ew4 => "EW4",
            SwathId::Ew5 => "EW5",
        }
    }

    /// Parse a swath tag such as `EW3`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "IW1" => Some(SwathId::Iw1),
            "IW2" => Some(SwathId::Iw2),
            "IW3" => Some(SwathId::Iw3),
            "EW1" => Some(SwathId::Ew1),
            "EW2" => Some(SwathId::Ew2),
            "EW3" => Some(SwathId::Ew3),
            "EW4" => Some(SwathId::Ew4),
            "EW5" => Some(SwathId::Ew5),
            _ => None,
        }
    }

    /// 1-based subswath number within its mode.
    pub fn number(&self) -> usize {
        match self {
            SwathId::Iw1 | SwathId::Ew1 => 1,
            SwathId::Iw2 | SwathId::Ew2 => 2,
            SwathId::Iw3 | SwathId::Ew3 => 3,
            SwathId::Ew4 => 4,
            SwathId::Ew5 => 5,
        }
    }

    /// TOPS antenna steering rate in degrees per second (from AUX_INS).
    pub fn antenna_steering_rate(&self) -> f64 {
        match self {
            SwathId::Iw1 => 1.590368784,
            SwathId::Iw2 => 0.979863325,
            SwathId::Iw3 => 1.397440818,
            SwathId::Ew1 => 2.390895448,
            SwathId::Ew2 => 2.811502724,
            SwathId::Ew3 => 2.366195855,
            SwathId::Ew4 => 2.512694636,
            SwathId::Ew5 => 2.122855427,
        }
    }
}

impl fmt::Display for SwathId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One block of the swath-merge tiling of a subswath.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundBlock {
    /// Annotation azimuth time of this block
    pub azimuth_time: NaiveDateTime,
    /// First azimuth line covered by the block (inclusive)
    pub first_azimuth_line: i32,
    /// First range sample covered by the block (inclusive)
    pub first_range_sample: i32,
    /// Last azimuth line covered by the block (inclusive)
    pub last_azimuth_line: i32,
    /// Last range sample covered by the block (inclusive)
    pub last_range_sample: i32,
}

impl BoundBlock {
    /// Whether an image line falls inside this block's azimuth extent.
    pub fn contains_line(&self, line: i32) -> bool {
        line >= self.first_azimuth_line && line <= self.last_azimuth_line
    }

    /// Whether a range sample falls inside this block's range extent.
    pub fn contains_sample(&self, sample: i32) -> bool {
        sample >= self.first_range_sample && sample <= self.last_range_sample
    }
}

/// The bound blocks of one subswath.
#[derive(Debug, Clone, PartialEq)]
pub struct SwathBounds {
    /// Which subswath these blocks tile
    pub swath: SwathId,
    /// Blocks in azimuth order
    pub blocks: Vec<BoundBlock>,
}

impl SwathBounds {
    /// Parse all `swathMerge` records of an annotation document.
    pub fn parse_all(annotation: Node, filename: &str) -> Result<Vec<SwathBounds>, XmlError> {
        let mut all = vec![];
        for merge in xml_read::find_all(annotation, "swathMerge") {
            let name = xml_read::req_text(merge, "swath", filename)?;
            let swath = SwathId::from_name(name).ok_or_else(|| XmlError::Parse {
                value: name.to_string(),
                element: "swath".to_string(),
                filename: filename.to_string(),
            })?;
            let mut blocks = vec![];
            for bounds in xml_read::find_all(merge, "swathBounds") {
                blocks.push(BoundBlock {
                    azimuth_time: xml_read::req_time(bounds, "azimuthTime", filename)?,
                    first_azimuth_line: xml_read::req_parse(bounds, "firstAzimuthLine", filename)?,
                    first_range_sample: xml_read::req_parse(bounds, "firstRangeSample", filename)?,
                    last_azimuth_line: xml_read::req_parse(bounds, "lastAzimuthLine", filename)?,
                    last_range_sample: xml_read::req_parse(bounds, "lastRangeSample", filename)?,
                });
            }
            all.push(SwathBounds { swath, blocks });
        }
        all.sort_by_key(|b| b.swath);
        Ok(all)
    }

    /// Find the bounds of one subswath in a parsed list.
    pub fn get<'a>(all: &'a [SwathBounds], swath: SwathId) -> Option<&'a SwathBounds> {
        all.iter().find(|b| b.swath == swath)
    }

    /// The full-range pixel axis covered by this swath, `min(frs)..=max(lrs)`.
    pub fn full_range_pixels(&self) -> Vec<i32> {
        let first = self.blocks.iter().map(|b| b.first_range_sample).min();
        let last = self.blocks.iter().map(|b| b.last_range_sample).max();
        match (first, last) {
            (Some(first), Some(last)) => (first..=last).collect(),
            _ => vec![],
        }
    }

    /// Range centre sample of this subswath: the line-weighted mean of the
    /// block midpoints, rounded.
    pub fn center_sample_index(&self) -> i32 {
        let mut weighted = 0.0;
        let mut lines = 0.0;
        for block in &self.blocks {
            let n = (block.last_azimuth_line - block.first_azimuth_line + 1) as f64;
            let mid = (block.first_range_sample + block.last_range_sample) as f64 / 2.0;
            weighted += mid * n;
            lines += n;
        }
        (weighted / lines).round() as i32
    }
}

/// Raster of 1-based subswath numbers, 0 where no swath is defined.
pub fn swath_index_map(all: &[SwathBounds], shape: (usize, usize)) -> Array2<u8> {
    let mut map = Array2::zeros(shape);
    for bounds in all {
        let number = bounds.swath.number() as u8;
        for block in &bounds.blocks {
            for line in block.first_azimuth_line..=block.last_azimuth_line {
                for sample in block.first_range_sample..=block.last_range_sample {
                    map[[line as usize, sample as usize]] = number;
                }
            }
        }
    }
    map
}

#[cfg(test)]
mod test;
