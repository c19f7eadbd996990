// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The main interface to Sentinel-1 GRD data.

[`Sentinel1Product`] is constructed from a SAFE directory or ZIP file. It
identifies the product from its name, locates the annotation, calibration,
noise and manifest members, resolves the auxiliary calibration file, and
parses everything into typed records exactly once. The denoising pipeline
entry points are implemented on this context in [`crate::denoise`] and
[`crate::experiments`].
*/

pub mod error;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use chrono::{Duration, NaiveDateTime};
use log::warn;
use regex::Regex;

use crate::antenna::AntennaPattern;
use crate::aux_cal::{self, AuxCalibration};
use crate::calibration::CalibrationTable;
use crate::error::S1Error;
use crate::fm_rate::AzimuthFmRate;
use crate::geolocation::GeolocationGrid;
use crate::noise::NoiseTable;
use crate::orbit::Orbit;
use crate::safe::{SafeContainer, SafeError};
use crate::swath::{ObsMode, SwathBounds, SwathId};
use crate::xml_read::{self};

pub use error::ProductError;

lazy_static! {
    // e.g. S1A_EW_GRDM_1SDH_20190101T000000_20190101T000030_025418_02D042_5B5B
    static ref RE_PRODUCT: Regex = Regex::new(
        r"^(?P<platform>S1[AB])_(?P<mode>IW|EW)_(?P<resolution>GRD[HM])_(?P<ptype>1SD[HV])_(?P<start>\d{8}T\d{6})_(?P<end>\d{8}T\d{6})_"
    )
    .unwrap();
}

/// The product sensing-time format used in SAFE names.
const NAME_TIME_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Enum for the two Sentinel-1 platforms
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Platform {
    S1A,
    S1B,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::S1A => "S1A",
            Platform::S1B => "S1B",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "S1A" => Some(Platform::S1A),
            "S1B" => Some(Platform::S1B),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enum for the transmit/receive polarization combinations
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Polarization {
    HH,
    HV,
    VH,
    VV,
}

impl Polarization {
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarization::HH => "HH",
            Polarization::HV => "HV",
            Polarization::VH => "VH",
            Polarization::VV => "VV",
        }
    }

    /// The lowercase tag used inside SAFE member names.
    pub fn file_tag(&self) -> &'static str {
        match self {
            Polarization::HH => "hh",
            Polarization::HV => "hv",
            Polarization::VH => "vh",
            Polarization::VV => "vv",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HH" => Some(Polarization::HH),
            "HV" => Some(Polarization::HV),
            "VH" => Some(Polarization::VH),
            "VV" => Some(Polarization::VV),
            _ => None,
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a product name declares: platform, mode, resolution,
/// polarization set and the sensing time window.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductName {
    /// The SAFE base name without extension
    pub name: String,
    /// S1A or S1B
    pub platform: Platform,
    /// Acquisition mode (IW or EW)
    pub mode: ObsMode,
    /// Resolution class tag (`GRDH` or `GRDM`)
    pub resolution: String,
    /// Product class and polarization tag (`1SDH` or `1SDV`)
    pub product_type: String,
    /// Sensing start time
    pub time_coverage_start: NaiveDateTime,
    /// Sensing end time
    pub time_coverage_end: NaiveDateTime,
}

impl ProductName {
    /// Parse a SAFE (or ZIP) file name. Anything but the four supported
    /// GRD product types is rejected.
    pub fn parse(filename: &str) -> Result<Self, ProductError> {
        let base = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| filename.to_string());
        let caps = RE_PRODUCT
            .captures(&base)
            .ok_or_else(|| ProductError::UnsupportedProduct(base.clone()))?;

        let platform = Platform::from_name(&caps["platform"]).unwrap();
        let mode = match &caps["mode"] {
            "IW" => ObsMode::Iw,
            _ => ObsMode::Ew,
        };
        let resolution = caps["resolution"].to_string();
        // IW comes in high resolution, EW in medium; any other pairing is
        // not a supported product
        let supported = matches!(
            (mode, resolution.as_str()),
            (ObsMode::Iw, "GRDH") | (ObsMode::Ew, "GRDM")
        );
        if !supported {
            return Err(ProductError::UnsupportedProduct(base));
        }
        let parse_time = |s: &str| {
            NaiveDateTime::parse_from_str(s, NAME_TIME_FORMAT)
                .map_err(|_| ProductError::UnsupportedProduct(base.clone()))
        };
        Ok(ProductName {
            platform,
            mode,
            product_type: caps["ptype"].to_string(),
            time_coverage_start: parse_time(&caps["start"])?,
            time_coverage_end: parse_time(&caps["end"])?,
            resolution,
            name: base
                .trim_end_matches(".zip")
                .trim_end_matches(".SAFE")
                .to_string(),
        })
    }

    /// Scene centre time: start plus half the coverage window. Relative
    /// azimuth times throughout the crate are seconds from this instant.
    pub fn time_coverage_center(&self) -> NaiveDateTime {
        let window = self
            .time_coverage_end
            .signed_duration_since(self.time_coverage_start);
        self.time_coverage_start + Duration::microseconds(window.num_microseconds().unwrap_or(0) / 2)
    }

    /// Both polarizations of the product, co-pol first.
    pub fn polarizations(&self) -> [Polarization; 2] {
        match self.product_type.as_str() {
            "1SDH" => [Polarization::HH, Polarization::HV],
            _ => [Polarization::VH, Polarization::VV],
        }
    }

    /// The cross-polarized channel (HV for 1SDH, VH for 1SDV).
    pub fn cross_polarization(&self) -> Polarization {
        match self.product_type.as_str() {
            "1SDH" => Polarization::HV,
            _ => Polarization::VH,
        }
    }

    /// `{platform}_{mode}_{resolution}_{type}`, the key prefix of the
    /// total-gain coefficient entries.
    pub fn type_prefix(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.platform, self.mode, self.resolution, self.product_type
        )
    }

    /// `{platform}_{mode}_{resolution}_{pol}`, the key prefix of the
    /// NS/PB/ES/NV coefficient entries.
    pub fn coefficient_base(&self, pol: Polarization) -> String {
        format!(
            "{}_{}_{}_{}",
            self.platform, self.mode, self.resolution, pol
        )
    }
}

/// All typed metadata of one polarization channel.
#[derive(Debug, Clone)]
pub struct PolarizationData {
    /// Number of image lines
    pub number_of_lines: usize,
    /// Number of range samples per line
    pub number_of_samples: usize,
    /// Reference slant range used by the range spreading loss, metres
    pub reference_range: f64,
    /// Azimuth sampling frequency, Hz
    pub azimuth_frequency: f64,
    /// Bound blocks per subswath
    pub swath_bounds: Vec<SwathBounds>,
    /// The sparse geolocation grid
    pub geolocation: GeolocationGrid,
    /// Orbit state vectors
    pub orbit: Orbit,
    /// Antenna pattern series per subswath
    pub antenna_patterns: Vec<AntennaPattern>,
    /// Azimuth FM rate records
    pub fm_rates: Vec<AzimuthFmRate>,
    /// SLC input line count per subswath
    pub number_of_input_lines: HashMap<SwathId, usize>,
    /// PG product amplitudes per subswath, time-sorted
    pub pg_amplitudes: HashMap<SwathId, Vec<(NaiveDateTime, f64)>>,
    /// Radiometric calibration vectors
    pub calibration: CalibrationTable,
    /// Thermal noise vectors
    pub noise: NoiseTable,
}

impl PolarizationData {
    /// Parse the annotation, calibration and noise documents of one
    /// polarization.
    pub fn parse(
        annotation_xml: &str,
        annotation_name: &str,
        calibration_xml: &str,
        calibration_name: &str,
        noise_xml: &str,
        noise_name: &str,
        ipf_version: f64,
        mode: ObsMode,
    ) -> Result<Self, S1Error> {
        let doc = roxmltree::Document::parse(annotation_xml)
            .map_err(|e| xml_read::malformed(annotation_name, e))?;
        let root = doc.root_element();

        let number_of_lines: usize = xml_read::req_parse(root, "numberOfLines", annotation_name)?;
        let number_of_samples: usize =
            xml_read::req_parse(root, "numberOfSamples", annotation_name)?;

        let mut number_of_input_lines = HashMap::new();
        for node in xml_read::find_all(root, "inputDimensions") {
            let name = xml_read::req_text(node, "swath", annotation_name)?;
            if let Some(swath) = SwathId::from_name(name) {
                number_of_input_lines.insert(
                    swath,
                    xml_read::req_parse(node, "numberOfInputLines", annotation_name)?,
                );
            }
        }

        let mut pg_amplitudes: HashMap<SwathId, Vec<(NaiveDateTime, f64)>> = HashMap::new();
        for node in xml_read::find_all(root, "pgProductAmplitude") {
            let amplitude: f64 = node
                .text()
                .unwrap_or("")
                .trim()
                .parse()
                .map_err(|_| crate::xml_read::XmlError::Parse {
                    value: node.text().unwrap_or("").to_string(),
                    element: "pgProductAmplitude".to_string(),
                    filename: annotation_name.to_string(),
                })?;
            let entry = node.parent_element().ok_or_else(|| {
                crate::xml_read::XmlError::MissingElement {
                    name: "pgProduct".to_string(),
                    filename: annotation_name.to_string(),
                }
            })?;
            let azimuth_time = xml_read::req_time(entry, "azimuthTime", annotation_name)?;
            // the owning downlink record carries the swath tag
            let swath = node
                .ancestors()
                .find_map(|a| {
                    a.children()
                        .find(|c| c.is_element() && c.tag_name().name() == "swath")
                })
                .and_then(|s| SwathId::from_name(s.text().unwrap_or("").trim()));
            if let Some(swath) = swath {
                pg_amplitudes
                    .entry(swath)
                    .or_default()
                    .push((azimuth_time, amplitude));
            }
        }
        for series in pg_amplitudes.values_mut() {
            series.sort_by_key(|(t, _)| *t);
        }

        let calibration_doc = roxmltree::Document::parse(calibration_xml)
            .map_err(|e| xml_read::malformed(calibration_name, e))?;
        let noise_doc = roxmltree::Document::parse(noise_xml)
            .map_err(|e| xml_read::malformed(noise_name, e))?;

        Ok(PolarizationData {
            number_of_lines,
            number_of_samples,
            reference_range: xml_read::req_parse(root, "referenceRange", annotation_name)?,
            azimuth_frequency: xml_read::req_parse(root, "azimuthFrequency", annotation_name)?,
            swath_bounds: SwathBounds::parse_all(root, annotation_name)?,
            geolocation: GeolocationGrid::parse(root, annotation_name)?,
            orbit: Orbit::parse(root, annotation_name)?,
            antenna_patterns: AntennaPattern::parse_all(root, annotation_name)?,
            fm_rates: AzimuthFmRate::parse_all(root, annotation_name)?,
            number_of_input_lines,
            pg_amplitudes,
            calibration: CalibrationTable::parse(calibration_doc.root_element(), calibration_name)?,
            noise: NoiseTable::parse(
                noise_doc.root_element(),
                noise_name,
                ipf_version,
                mode,
                (number_of_lines, number_of_samples),
            )?,
        })
    }

    /// Raster shape (lines, samples).
    pub fn shape(&self) -> (usize, usize) {
        (self.number_of_lines, self.number_of_samples)
    }

    /// Bound blocks of one subswath.
    pub fn bounds(&self, swath: SwathId) -> Option<&SwathBounds> {
        SwathBounds::get(&self.swath_bounds, swath)
    }
}

/// `s1denoise` product context. Thermal noise correction for S1 GRD data.
pub struct Sentinel1Product {
    /// Parsed product identification
    pub product_name: ProductName,
    /// IPF processor version from the manifest
    pub ipf_version: f64,
    /// The SAFE container the product was read from
    pub container: SafeContainer,
    /// Auxiliary calibration parameters per (polarization, swath)
    pub aux: AuxCalibration,
    data: HashMap<Polarization, PolarizationData>,
    measurement_members: HashMap<Polarization, String>,
    noise_members: HashMap<Polarization, String>,
    warnings: Mutex<Vec<String>>,
}

impl Sentinel1Product {
    /// Open a product, downloading the auxiliary calibration archive if it
    /// is not cached yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, S1Error> {
        Self::open(path.as_ref(), None)
    }

    /// Open a product with an explicit auxiliary calibration file instead
    /// of the downloaded archive.
    pub fn with_aux_file<P: AsRef<Path>, Q: AsRef<Path>>(
        path: P,
        aux_file: Q,
    ) -> Result<Self, S1Error> {
        Self::open(path.as_ref(), Some(aux_file.as_ref()))
    }

    fn open(path: &Path, aux_override: Option<&Path>) -> Result<Self, S1Error> {
        let product_name = ProductName::parse(&path.to_string_lossy())?;
        let container = SafeContainer::open(path)?;
        let members = container.file_names()?;

        // manifest: IPF version and the AUX_CAL resource name
        let manifest_member = members
            .iter()
            .find(|m| m.ends_with("manifest.safe"))
            .ok_or_else(|| SafeError::MissingFile {
                name: "manifest.safe".to_string(),
                container: container.path().display().to_string(),
            })?;
        let manifest_xml = container.read_to_string(manifest_member)?;
        let manifest = roxmltree::Document::parse(&manifest_xml)
            .map_err(|e| xml_read::malformed(manifest_member, e))?;
        let software = xml_read::req(manifest.root_element(), "software", manifest_member)?;
        let version = xml_read::req_attr(software, "version", manifest_member)?;
        let ipf_version: f64 = version
            .parse()
            .map_err(|_| ProductError::BadIpfVersion(version.to_string()))?;

        let aux_name = manifest
            .root_element()
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "resource")
            .find(|n| n.attribute("role") == Some("AUX_CAL"))
            .and_then(|n| n.attribute("name"))
            .map(|name| name.split('/').next_back().unwrap_or(name).to_string())
            .ok_or_else(|| aux_cal::AuxCalError::MissingResource {
                filename: manifest_member.to_string(),
            })?;

        let warnings = Mutex::new(vec![]);
        if ipf_version < 2.43 {
            warnings.lock().unwrap().push(format!(
                "IPF version {ipf_version} of the input image is lower than 2.43. Denoising vectors in annotation files are not qualified; only TG-based denoising can be performed"
            ));
        } else if ipf_version < 2.53 {
            warnings.lock().unwrap().push(format!(
                "IPF version {ipf_version} of the input image is lower than 2.53. ESA default noise correction result might be wrong"
            ));
        }

        let aux_file = match aux_override {
            Some(path) => path.to_path_buf(),
            None => aux_cal::fetch_aux_calibration_file(product_name.platform, &aux_name)?,
        };
        let aux_xml = fs::read_to_string(&aux_file)?;
        let aux_doc = roxmltree::Document::parse(&aux_xml)
            .map_err(|e| xml_read::malformed(&aux_file.display().to_string(), e))?;
        let aux = AuxCalibration::parse(aux_doc.root_element(), &aux_file.display().to_string())?;

        let mut data = HashMap::new();
        let mut measurement_members = HashMap::new();
        let mut noise_members = HashMap::new();
        for pol in product_name.polarizations() {
            let annotation_member = find_member(&members, "annotation/s1", pol, &container)?;
            let calibration_member = find_member(&members, "calibration-s1", pol, &container)?;
            let noise_member = find_member(&members, "noise-s1", pol, &container)?;
            let measurement_member = find_member(&members, "measurement/s1", pol, &container)?;

            let annotation_xml = container.read_to_string(&annotation_member)?;
            let calibration_xml = container.read_to_string(&calibration_member)?;
            let noise_xml = container.read_to_string(&noise_member)?;
            data.insert(
                pol,
                PolarizationData::parse(
                    &annotation_xml,
                    &annotation_member,
                    &calibration_xml,
                    &calibration_member,
                    &noise_xml,
                    &noise_member,
                    ipf_version,
                    product_name.mode,
                )?,
            );
            measurement_members.insert(pol, measurement_member);
            noise_members.insert(pol, noise_member);
        }

        Ok(Sentinel1Product {
            product_name,
            ipf_version,
            container,
            aux,
            data,
            measurement_members,
            noise_members,
            warnings,
        })
    }

    /// Typed metadata of one polarization.
    pub fn data(&self, pol: Polarization) -> Result<&PolarizationData, ProductError> {
        self.data
            .get(&pol)
            .ok_or_else(|| ProductError::MissingPolarization(pol.as_str().to_string()))
    }

    /// The measurement GeoTIFF member of one polarization.
    pub fn measurement_member(&self, pol: Polarization) -> Result<&str, ProductError> {
        self.measurement_members
            .get(&pol)
            .map(String::as_str)
            .ok_or_else(|| ProductError::MissingPolarization(pol.as_str().to_string()))
    }

    /// The noise XML member of one polarization.
    pub fn noise_member(&self, pol: Polarization) -> Result<&str, ProductError> {
        self.noise_members
            .get(&pol)
            .map(String::as_str)
            .ok_or_else(|| ProductError::MissingPolarization(pol.as_str().to_string()))
    }

    /// Scene centre time.
    pub fn time_coverage_center(&self) -> NaiveDateTime {
        self.product_name.time_coverage_center()
    }

    /// Record a non-fatal condition. Logged immediately, surfaced through
    /// [`Sentinel1Product::take_warnings`].
    pub(crate) fn warn(&self, message: String) {
        warn!("{message}");
        self.warnings.lock().unwrap().push(message);
    }

    /// Drain the warnings collected so far.
    pub fn take_warnings(&self) -> Vec<String> {
        std::mem::take(&mut self.warnings.lock().unwrap())
    }

    /// Build a product context from pre-parsed parts (fixtures, tests).
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        product_name: ProductName,
        ipf_version: f64,
        container: SafeContainer,
        aux: AuxCalibration,
        data: HashMap<Polarization, PolarizationData>,
        measurement_members: HashMap<Polarization, String>,
        noise_members: HashMap<Polarization, String>,
    ) -> Self {
        Sentinel1Product {
            product_name,
            ipf_version,
            container,
            aux,
            data,
            measurement_members,
            noise_members,
            warnings: Mutex::new(vec![]),
        }
    }
}

/// Find the single member matching a path fragment and polarization tag.
fn find_member(
    members: &[String],
    fragment: &'static str,
    pol: Polarization,
    container: &SafeContainer,
) -> Result<String, SafeError> {
    members
        .iter()
        .find(|m| m.contains(fragment) && m.contains(&format!("-{}-", pol.file_tag())))
        .cloned()
        .ok_or_else(|| SafeError::MissingMember {
            kind: fragment,
            polarization: pol.as_str().to_string(),
            container: container.path().display().to_string(),
        })
}

/// Implements fmt::Display for Sentinel1Product
impl fmt::Display for Sentinel1Product {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            r#"Sentinel1Product (
    product:        {name},
    platform:       {platform},
    mode:           {mode},
    resolution:     {resolution},
    IPF version:    {ipf},
    coverage start: {start},
    coverage end:   {end},
    polarizations:  {pols:?},
)"#,
            name = self.product_name.name,
            platform = self.product_name.platform,
            mode = self.product_name.mode,
            resolution = self.product_name.resolution,
            ipf = self.ipf_version,
            start = self.product_name.time_coverage_start,
            end = self.product_name.time_coverage_end,
            pols = self.product_name.polarizations(),
        )
    }
}
