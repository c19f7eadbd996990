// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use super::*;
use std::fs;

#[test]
fn test_dir_container_lists_and_reads() {
    let tdir = tempdir::TempDir::new("s1denoise-safe").unwrap();
    let root = tdir.path().join("product.SAFE");
    fs::create_dir_all(root.join("annotation/calibration")).unwrap();
    fs::write(root.join("manifest.safe"), b"<manifest/>").unwrap();
    fs::write(
        root.join("annotation/calibration/noise-s1a-ew-grd-hv.xml"),
        b"<noise/>",
    )
    .unwrap();

    let container = SafeContainer::open(&root).unwrap();
    let names = container.file_names().unwrap();
    assert!(names.contains(&"manifest.safe".to_string()));
    assert!(names.contains(&"annotation/calibration/noise-s1a-ew-grd-hv.xml".to_string()));
    assert_eq!(container.read("manifest.safe").unwrap(), b"<manifest/>");
    assert_eq!(
        container.read_to_string("manifest.safe").unwrap(),
        "<manifest/>"
    );
}

#[test]
fn test_zip_container_lists_and_reads() {
    let tdir = tempdir::TempDir::new("s1denoise-safe").unwrap();
    let zip_path = tdir.path().join("product.zip");
    let file = fs::File::create(&zip_path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options: zip::write::SimpleFileOptions = Default::default();
    writer
        .start_file("product.SAFE/manifest.safe", options)
        .unwrap();
    use std::io::Write;
    writer.write_all(b"<manifest/>").unwrap();
    writer.finish().unwrap();

    let container = SafeContainer::open(&zip_path).unwrap();
    let names = container.file_names().unwrap();
    assert_eq!(names, vec!["product.SAFE/manifest.safe".to_string()]);
    assert_eq!(
        container.read("product.SAFE/manifest.safe").unwrap(),
        b"<manifest/>"
    );
    assert!(container.read("missing.xml").is_err());
}

#[test]
fn test_missing_product_errors() {
    assert!(matches!(
        SafeContainer::open("/nonexistent/product.SAFE"),
        Err(SafeError::NotFound(_))
    ));
}
