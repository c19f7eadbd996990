// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

const MODERN_NOISE: &str = r#"<noise>
    <noiseRangeVectorList count="2">
        <noiseRangeVector>
            <azimuthTime>2019-01-01T00:00:00.000000</azimuthTime>
            <line>0</line>
            <pixel>0 10 20</pixel>
            <noiseRangeLut>3000.0 2500.0 2800.0</noiseRangeLut>
        </noiseRangeVector>
        <noiseRangeVector>
            <azimuthTime>2019-01-01T00:00:01.000000</azimuthTime>
            <line>50</line>
            <pixel>0 10 20</pixel>
            <noiseRangeLut>3100.0 2600.0 2900.0</noiseRangeLut>
        </noiseRangeVector>
    </noiseRangeVectorList>
    <noiseAzimuthVectorList>
        <noiseAzimuthVector>
            <swath>EW1</swath>
            <firstAzimuthLine>0</firstAzimuthLine>
            <firstRangeSample>0</firstRangeSample>
            <lastAzimuthLine>99</lastAzimuthLine>
            <lastRangeSample>19</lastRangeSample>
            <line>0 50 99</line>
            <noiseAzimuthLut>1.0 1.1 1.0</noiseAzimuthLut>
        </noiseAzimuthVector>
    </noiseAzimuthVectorList>
</noise>"#;

#[test]
fn test_parse_modern_noise() {
    let doc = roxmltree::Document::parse(MODERN_NOISE).unwrap();
    let table =
        NoiseTable::parse(doc.root_element(), "noise.xml", 2.9, ObsMode::Ew, (100, 20)).unwrap();
    assert_eq!(table.range.len(), 2);
    assert_eq!(table.lines(), vec![0, 50]);
    assert_eq!(table.range[0].noise[1], 2500.0);
    assert_eq!(table.azimuth.len(), 1);
    assert_eq!(table.azimuth[0].swath, SwathId::Ew1);
    assert_eq!(table.azimuth[0].lines, vec![0, 50, 99]);
}

#[test]
fn test_parse_legacy_noise_synthesizes_azimuth() {
    let xml = r#"<noise><noiseVectorList>
        <noiseVector>
            <azimuthTime>2017-01-01T00:00:00.000000</azimuthTime>
            <line>0</line>
            <pixel>0 10</pixel>
            <noiseLut>3000.0 2500.0</noiseLut>
        </noiseVector>
    </noiseVectorList></noise>"#;
    let doc = roxmltree::Document::parse(xml).unwrap();
    let table =
        NoiseTable::parse(doc.root_element(), "noise.xml", 2.72, ObsMode::Ew, (200, 40)).unwrap();
    assert_eq!(table.range.len(), 1);
    assert_eq!(table.azimuth.len(), 5);
    let ew3 = table.azimuth_for(SwathId::Ew3);
    assert_eq!(ew3.len(), 1);
    assert_eq!(ew3[0].last_azimuth_line, 199);
    assert_eq!(ew3[0].noise, vec![1.0, 1.0]);
}

#[test]
fn test_modern_names_are_required_for_modern_ipf() {
    // a legacy-named document parsed as IPF 2.9 has no range vectors
    let xml = r#"<noise><noiseVectorList>
        <noiseVector>
            <azimuthTime>2017-01-01T00:00:00.000000</azimuthTime>
            <line>0</line>
            <pixel>0</pixel>
            <noiseLut>1.0</noiseLut>
        </noiseVector>
    </noiseVectorList></noise>"#;
    let doc = roxmltree::Document::parse(xml).unwrap();
    assert!(NoiseTable::parse(doc.root_element(), "noise.xml", 2.9, ObsMode::Ew, (10, 10)).is_err());
}
