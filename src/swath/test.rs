// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;

fn parse_bounds(xml: &str) -> Vec<SwathBounds> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    SwathBounds::parse_all(doc.root_element(), "annotation.xml").unwrap()
}

const TWO_SWATHS: &str = r#"<product><swathMergeList>
  <swathMerge><swath>EW1</swath><swathBoundsList>
    <swathBounds>
      <azimuthTime>2019-01-01T00:00:00.000000</azimuthTime>
      <firstAzimuthLine>0</firstAzimuthLine>
      <firstRangeSample>0</firstRangeSample>
      <lastAzimuthLine>9</lastAzimuthLine>
      <lastRangeSample>4</lastRangeSample>
    </swathBounds>
    <swathBounds>
      <azimuthTime>2019-01-01T00:00:01.000000</azimuthTime>
      <firstAzimuthLine>10</firstAzimuthLine>
      <firstRangeSample>1</firstRangeSample>
      <lastAzimuthLine>19</lastAzimuthLine>
      <lastRangeSample>5</lastRangeSample>
    </swathBounds>
  </swathBoundsList></swathMerge>
  <swathMerge><swath>EW2</swath><swathBoundsList>
    <swathBounds>
      <azimuthTime>2019-01-01T00:00:00.000000</azimuthTime>
      <firstAzimuthLine>0</firstAzimuthLine>
      <firstRangeSample>5</firstRangeSample>
      <lastAzimuthLine>19</lastAzimuthLine>
      <lastRangeSample>9</lastRangeSample>
    </swathBounds>
  </swathBoundsList></swathMerge>
</swathMergeList></product>"#;

#[test]
fn test_parse_all_orders_by_swath() {
    let bounds = parse_bounds(TWO_SWATHS);
    assert_eq!(bounds.len(), 2);
    assert_eq!(bounds[0].swath, SwathId::Ew1);
    assert_eq!(bounds[0].blocks.len(), 2);
    assert_eq!(bounds[0].blocks[1].first_azimuth_line, 10);
    assert_eq!(bounds[1].swath, SwathId::Ew2);
    assert_eq!(bounds[1].blocks[0].last_range_sample, 9);
}

#[test]
fn test_full_range_pixels_spans_blocks() {
    let bounds = parse_bounds(TWO_SWATHS);
    let pixels = bounds[0].full_range_pixels();
    assert_eq!(pixels.first(), Some(&0));
    assert_eq!(pixels.last(), Some(&5));
}

#[test]
fn test_center_sample_index_weights_by_lines() {
    let bounds = parse_bounds(TWO_SWATHS);
    // block mids 2 and 3, both 10 lines -> 2.5 rounds away from zero
    assert_eq!(bounds[0].center_sample_index(), 3);
    assert_eq!(bounds[1].center_sample_index(), 7);
}

#[test]
fn test_swath_index_map_tiles_without_overlap() {
    let bounds = parse_bounds(TWO_SWATHS);
    let map = swath_index_map(&bounds, (20, 10));
    assert_eq!(map[[0, 0]], 1);
    assert_eq!(map[[0, 5]], 2);
    // second EW1 block does not cover sample 0
    assert_eq!(map[[15, 0]], 0);
    assert_eq!(map[[15, 1]], 1);
    assert_eq!(map[[19, 9]], 2);
}

#[test]
fn test_swath_id_round_trip_and_rates() {
    for id in ObsMode::Ew.swaths() {
        assert_eq!(SwathId::from_name(id.as_str()), Some(*id));
        assert!(id.antenna_steering_rate() > 2.0);
    }
    assert_eq!(SwathId::from_name("XX9"), None);
    assert_eq!(SwathId::Iw2.antenna_steering_rate(), 0.979863325);
    assert_eq!(SwathId::Ew5.number(), 5);
}

#[test]
fn test_obs_mode_constants() {
    assert_eq!(ObsMode::Iw.swath_count(), 3);
    assert_eq!(ObsMode::Ew.swath_count(), 5);
    assert_eq!(ObsMode::Iw.nominal_lines_per_burst(), 1450);
    assert_eq!(ObsMode::Ew.experiment_crop(), 200);
}
