// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Helper methods for building synthetic SAFE products in tests
*/

use std::fs;
use std::path::{Path, PathBuf};

use tiff::encoder::{colortype, TiffEncoder};

use crate::product::Sentinel1Product;

/// Synthetic scene dimensions.
pub const LINES: usize = 40;
pub const SAMPLES: usize = 200;

/// Swath width of the synthetic EW scene; samples `190..=199` fall
/// outside every swath.
pub const SWATH_WIDTH: i32 = 38;

/// Sigma nought calibration constant of the synthetic scene.
pub const CAL_S0: f64 = 600.0;

/// Digital number of the synthetic measurement (except seeded zeros).
pub const DN: u16 = 1000;

/// Options of the synthetic product.
pub struct FixtureOptions {
    /// IPF version written into the manifest, e.g. "2.90"
    pub ipf: &'static str,
    /// Factor applied to every noise LUT value (0.0 builds a noise-free
    /// scene)
    pub noise_scale: f64,
}

impl Default for FixtureOptions {
    fn default() -> Self {
        FixtureOptions {
            ipf: "2.90",
            noise_scale: 1.0,
        }
    }
}

fn swath_tag(index: usize) -> String {
    format!("EW{}", index + 1)
}

fn swath_range(index: usize) -> (i32, i32) {
    let first = index as i32 * SWATH_WIDTH;
    (first, first + SWATH_WIDTH - 1)
}

/// Noise LUT of the synthetic scene: proportional to the antenna pattern
/// gain of the scene geometry, so the LUT shift fit converges near zero.
pub fn noise_lut(pixel: i32) -> f64 {
    let boresight = 0.02 * pixel as f64 - 2.0;
    2500.0 * 10f64.powf(0.02 * boresight * boresight)
}

fn annotation_xml() -> String {
    let mut xml = String::from(
        r#"<product>
  <imageAnnotation><imageInformation>
    <numberOfLines>40</numberOfLines>
    <numberOfSamples>200</numberOfSamples>
    <azimuthFrequency>4400.0</azimuthFrequency>
    <referenceRange>749481.145</referenceRange>
  </imageInformation></imageAnnotation>
  <generalAnnotation>
    <orbitList>
"#,
    );
    for i in 0..5 {
        xml.push_str(&format!(
            r#"      <orbit><time>2019-01-01T00:00:{:02}.000000</time><frame>Earth Fixed</frame>
        <position><x>7070000.0</x><y>{}.0</y><z>0.0</z></position>
        <velocity><x>0.0</x><y>7500.0</y><z>0.0</z></velocity></orbit>
"#,
            i,
            i * 7500
        ));
    }
    xml.push_str("    </orbitList>\n    <azimuthFmRateList>\n");
    for (time, c0) in [("2019-01-01T00:00:00.000000", -2000.0), ("2019-01-01T00:00:02.000000", -2010.0)] {
        xml.push_str(&format!(
            r#"      <azimuthFmRate><azimuthTime>{time}</azimuthTime><t0>5.0e-03</t0>
        <azimuthFmRatePolynomial count="3">{c0} 0.0 0.0</azimuthFmRatePolynomial></azimuthFmRate>
"#
        ));
    }
    xml.push_str("    </azimuthFmRateList>\n    <downlinkInformationList>\n");
    for i in 0..5 {
        xml.push_str(&format!(
            r#"      <downlinkInformation><swath>{swath}</swath><polarisation>HV</polarisation>
        <downlinkValues><pgProductList>
          <pgProduct><azimuthTime>2019-01-01T00:00:00.000000</azimuthTime><pgProductAmplitude>1.01</pgProductAmplitude></pgProduct>
          <pgProduct><azimuthTime>2019-01-01T00:00:01.000000</azimuthTime><pgProductAmplitude>1.02</pgProductAmplitude></pgProduct>
        </pgProductList></downlinkValues></downlinkInformation>
"#,
            swath = swath_tag(i)
        ));
    }
    xml.push_str("    </downlinkInformationList>\n  </generalAnnotation>\n  <inputDimensionsList>\n");
    for i in 0..5 {
        xml.push_str(&format!(
            "    <inputDimensions><swath>{}</swath><numberOfInputLines>2200</numberOfInputLines></inputDimensions>\n",
            swath_tag(i)
        ));
    }
    xml.push_str("  </inputDimensionsList>\n  <antennaPattern><antennaPatternList>\n");
    for i in 0..5 {
        for (seconds, fraction) in [(0u32, "200000"), (0u32, "700000")] {
            xml.push_str(&format!(
                r#"    <antennaPattern>
      <swath>{swath}</swath>
      <azimuthTime>2019-01-01T00:00:{seconds:02}.{fraction}</azimuthTime>
      <slantRangeTime>4.9e-03 5.0e-03 5.1e-03</slantRangeTime>
      <elevationAngle>25.0 27.0 29.0</elevationAngle>
      <elevationPattern>-0.5 0.0 -0.5</elevationPattern>
      <incidenceAngle>30.0 32.0 34.0</incidenceAngle>
      <terrainHeight>0.0</terrainHeight>
      <roll>27.0</roll>
    </antennaPattern>
"#,
                swath = swath_tag(i)
            ));
        }
    }
    xml.push_str("  </antennaPatternList></antennaPattern>\n  <geolocationGrid><geolocationGridPointList>\n");
    for &line in &[0, 20, 39] {
        for &pixel in &[0, 100, 199] {
            let seconds = line as f64 * 0.025;
            let tau = 5.0e-3 + (pixel as f64 - 100.0) * 2.0e-8;
            let elevation = 25.0 + pixel as f64 * 0.02;
            xml.push_str(&format!(
                r#"    <geolocationGridPoint>
      <azimuthTime>2019-01-01T00:00:{seconds:09.6}</azimuthTime>
      <slantRangeTime>{tau:.9}</slantRangeTime>
      <line>{line}</line><pixel>{pixel}</pixel>
      <latitude>72.0</latitude><longitude>20.0</longitude><height>0.0</height>
      <incidenceAngle>{incidence:.3}</incidenceAngle>
      <elevationAngle>{elevation:.3}</elevationAngle>
    </geolocationGridPoint>
"#,
                incidence = 30.0 + pixel as f64 * 0.02,
            ));
        }
    }
    xml.push_str("  </geolocationGridPointList></geolocationGrid>\n  <swathMergeList>\n");
    for i in 0..5 {
        let (first, last) = swath_range(i);
        xml.push_str(&format!(
            r#"    <swathMerge><swath>{swath}</swath><swathBoundsList>
      <swathBounds>
        <azimuthTime>2019-01-01T00:00:00.000000</azimuthTime>
        <firstAzimuthLine>0</firstAzimuthLine>
        <firstRangeSample>{first}</firstRangeSample>
        <lastAzimuthLine>39</lastAzimuthLine>
        <lastRangeSample>{last}</lastRangeSample>
      </swathBounds>
    </swathBoundsList></swathMerge>
"#,
            swath = swath_tag(i)
        ));
    }
    xml.push_str("  </swathMergeList>\n</product>\n");
    xml
}

fn calibration_xml() -> String {
    let mut pixels: Vec<i32> = (0..SAMPLES as i32).step_by(10).collect();
    if *pixels.last().unwrap() != SAMPLES as i32 - 1 {
        pixels.push(SAMPLES as i32 - 1);
    }
    let pixel_text = pixels
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let value_text = pixels
        .iter()
        .map(|_| format!("{CAL_S0}"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut xml = String::from("<calibration><calibrationVectorList>\n");
    for &line in &[0, 13, 26, 39] {
        xml.push_str(&format!(
            r#"  <calibrationVector>
    <azimuthTime>2019-01-01T00:00:{:09.6}</azimuthTime>
    <line>{line}</line>
    <pixel>{pixel_text}</pixel>
    <sigmaNought>{value_text}</sigmaNought>
    <betaNought>{value_text}</betaNought>
    <gamma>{value_text}</gamma>
    <dn>{value_text}</dn>
  </calibrationVector>
"#,
            line as f64 * 0.025
        ));
    }
    xml.push_str("</calibrationVectorList></calibration>\n");
    xml
}

fn noise_xml(ipf: f64, noise_scale: f64) -> String {
    let (vector_name, lut_name) = if ipf < 2.9 {
        ("noiseVector", "noiseLut")
    } else {
        ("noiseRangeVector", "noiseRangeLut")
    };
    let pixels: Vec<i32> = (0..SAMPLES as i32).step_by(2).collect();
    let pixel_text = pixels
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    let mut xml = String::from("<noise>\n  <noiseRangeVectorList>\n");
    for &line in &[0, 13, 26, 39] {
        let noise_text = pixels
            .iter()
            .map(|&p| format!("{}", noise_lut(p) * noise_scale))
            .collect::<Vec<_>>()
            .join(" ");
        xml.push_str(&format!(
            r#"    <{vector_name}>
      <azimuthTime>2019-01-01T00:00:{:09.6}</azimuthTime>
      <line>{line}</line>
      <pixel>{pixel_text}</pixel>
      <{lut_name}>{noise_text}</{lut_name}>
    </{vector_name}>
"#,
            line as f64 * 0.025
        ));
    }
    xml.push_str("  </noiseRangeVectorList>\n");
    if ipf >= 2.9 {
        xml.push_str("  <noiseAzimuthVectorList>\n");
        for i in 0..5 {
            let (first, last) = swath_range(i);
            xml.push_str(&format!(
                r#"    <noiseAzimuthVector>
      <swath>{swath}</swath>
      <firstAzimuthLine>0</firstAzimuthLine>
      <firstRangeSample>{first}</firstRangeSample>
      <lastAzimuthLine>39</lastAzimuthLine>
      <lastRangeSample>{last}</lastRangeSample>
      <line>0 20 39</line>
      <noiseAzimuthLut>1.0 1.1 1.0</noiseAzimuthLut>
    </noiseAzimuthVector>
"#,
                swath = swath_tag(i)
            ));
        }
        xml.push_str("  </noiseAzimuthVectorList>\n");
    }
    xml.push_str("</noise>\n");
    xml
}

fn aux_cal_xml() -> String {
    let mut xml = String::from("<auxiliaryCalibration><calibrationParamsList>\n");
    // quadratic one-way patterns in dB
    let eap_values = (0..21)
        .map(|i| {
            let angle = (i as f64 - 10.0) * 0.5;
            format!("{}", -0.2 * angle * angle)
        })
        .collect::<Vec<_>>()
        .join(" ");
    let aaep_values = (0..11)
        .map(|i| {
            let angle = (i as f64 - 5.0) * 0.01;
            format!("{}", -800.0 * angle * angle)
        })
        .collect::<Vec<_>>()
        .join(" ");
    for pol in ["HH", "HV"] {
        for i in 0..5 {
            xml.push_str(&format!(
                r#"  <calibrationParams>
    <swath>{swath}</swath>
    <polarisation>{pol}</polarisation>
    <elevationAntennaPattern>
      <elevationAngleIncrement>0.5</elevationAngleIncrement>
      <values count="21">{eap_values}</values>
    </elevationAntennaPattern>
    <azimuthAntennaElementPattern>
      <azimuthAngleIncrement>0.01</azimuthAngleIncrement>
      <values count="11">{aaep_values}</values>
    </azimuthAntennaElementPattern>
    <absoluteCalibrationConstant>1.0</absoluteCalibrationConstant>
    <noiseCalibrationFactor>1.0</noiseCalibrationFactor>
  </calibrationParams>
"#,
                swath = swath_tag(i)
            ));
        }
    }
    xml.push_str("</calibrationParamsList></auxiliaryCalibration>\n");
    xml
}

fn manifest_xml(ipf: &str) -> String {
    format!(
        r#"<xfdu:XFDU xmlns:xfdu="urn:ccsds:schema:xfdu:1" xmlns:safe="http://www.esa.int/safe/sentinel-1.0">
  <metadataSection>
    <safe:processing name="GRD Post Processing">
      <safe:facility country="Norway" name="KSAT">
        <safe:software name="Sentinel-1 IPF" version="{ipf}"/>
      </safe:facility>
      <safe:resource name="auxiliary/S1A_AUX_CAL_V20190228T092500_G20210104T141310.SAFE" role="AUX_CAL"/>
    </safe:processing>
  </metadataSection>
</xfdu:XFDU>
"#
    )
}

/// Write a complete synthetic SAFE directory plus the auxiliary
/// calibration file. Returns (product path, aux file path).
pub fn build_safe_product(dir: &Path, options: &FixtureOptions) -> (PathBuf, PathBuf) {
    let name = "S1A_EW_GRDM_1SDH_20190101T000000_20190101T000004_025418_02D042_5B5B.SAFE";
    let root = dir.join(name);
    fs::create_dir_all(root.join("annotation/calibration")).unwrap();
    fs::create_dir_all(root.join("measurement")).unwrap();

    let ipf: f64 = options.ipf.parse().unwrap();
    for pol in ["hh", "hv"] {
        fs::write(
            root.join(format!("annotation/s1a-ew-grd-{pol}-001.xml")),
            annotation_xml(),
        )
        .unwrap();
        fs::write(
            root.join(format!(
                "annotation/calibration/calibration-s1a-ew-grd-{pol}-001.xml"
            )),
            calibration_xml(),
        )
        .unwrap();
        fs::write(
            root.join(format!(
                "annotation/calibration/noise-s1a-ew-grd-{pol}-001.xml"
            )),
            noise_xml(ipf, options.noise_scale),
        )
        .unwrap();

        // line-alternating DN with a small range ripple and two seeded
        // zero pixels
        let mut data = vec![0u16; LINES * SAMPLES];
        for line in 0..LINES {
            for sample in 0..SAMPLES {
                let base = if line % 2 == 0 { DN } else { DN + 100 };
                data[line * SAMPLES + sample] = base + (sample % 5) as u16;
            }
        }
        data[0] = 0;
        data[5 * SAMPLES + 5] = 0;
        let file = fs::File::create(
            root.join(format!("measurement/s1a-ew-grd-{pol}-001.tiff")),
        )
        .unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        encoder
            .write_image::<colortype::Gray16>(SAMPLES as u32, LINES as u32, &data)
            .unwrap();
    }
    fs::write(root.join("manifest.safe"), manifest_xml(options.ipf)).unwrap();

    let aux_path = dir.join("s1a-aux-cal.xml");
    fs::write(&aux_path, aux_cal_xml()).unwrap();
    (root, aux_path)
}

/// Build and open a synthetic product.
pub fn open_fixture(options: &FixtureOptions) -> (tempdir::TempDir, Sentinel1Product) {
    let tdir = tempdir::TempDir::new("s1denoise-fixture").unwrap();
    let (root, aux) = build_safe_product(tdir.path(), options);
    let product = Sentinel1Product::with_aux_file(&root, &aux).unwrap();
    (tdir, product)
}
