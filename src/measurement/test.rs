// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use std::fs;
use tiff::encoder::{colortype, TiffEncoder};

/// Write a small u16 grayscale TIFF into a SAFE-style directory.
pub fn write_test_tiff(path: &std::path::Path, width: u32, height: u32, data: &[u16]) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = TiffEncoder::new(file).unwrap();
    encoder
        .write_image::<colortype::Gray16>(width, height, data)
        .unwrap();
}

#[test]
fn test_read_digital_numbers() {
    let tdir = tempdir::TempDir::new("s1denoise-measurement").unwrap();
    let root = tdir.path().join("product.SAFE");
    fs::create_dir_all(root.join("measurement")).unwrap();
    let data: Vec<u16> = (0..12).map(|v| v * 100).collect();
    write_test_tiff(
        &root.join("measurement/s1a-ew-grd-hv-img.tiff"),
        4,
        3,
        &data,
    );

    let container = SafeContainer::open(&root).unwrap();
    let dn = read_digital_numbers(&container, "measurement/s1a-ew-grd-hv-img.tiff").unwrap();
    assert_eq!(dn.dim(), (3, 4));
    assert_eq!(dn[[0, 0]], 0.0);
    assert_eq!(dn[[1, 0]], 400.0);
    assert_eq!(dn[[2, 3]], 1100.0);
}

#[test]
fn test_missing_member_is_an_error() {
    let tdir = tempdir::TempDir::new("s1denoise-measurement").unwrap();
    let container = SafeContainer::open(tdir.path()).unwrap();
    assert!(read_digital_numbers(&container, "measurement/none.tiff").is_err());
}
