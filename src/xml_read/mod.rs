// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Helper methods for reading metadata out of XML documents.

All Sentinel-1 metadata files (annotation, calibration, noise, manifest and
the auxiliary calibration file) are XML. The helpers here wrap `roxmltree`
nodes so that callers get either a typed value or a `XmlError` naming the
offending element and file. Element lookups compare local names only, which
makes them namespace agnostic (the manifest uses `safe:` prefixes, the
annotation files none).
*/

pub mod error;

use std::str::FromStr;

use chrono::NaiveDateTime;
use roxmltree::Node;

pub use error::XmlError;

/// The annotation time format, e.g. `2019-01-01T00:00:02.123456`.
const AZIMUTH_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Parse an azimuth time string into a naive UTC instant.
pub fn parse_azimuth_time(value: &str) -> Result<NaiveDateTime, XmlError> {
    NaiveDateTime::parse_from_str(value.trim(), AZIMUTH_TIME_FORMAT).map_err(|_| XmlError::Time {
        value: value.to_string(),
    })
}

/// Seconds from `reference` to `time` as a float (microsecond resolution).
pub fn seconds_since(time: NaiveDateTime, reference: NaiveDateTime) -> f64 {
    let delta = time.signed_duration_since(reference);
    delta.num_microseconds().unwrap_or(0) as f64 * 1e-6
}

/// Find the first descendant element with the given local name.
pub fn find<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

/// Find all descendant elements with the given local name, in document order.
pub fn find_all<'a, 'input>(node: Node<'a, 'input>, name: &'a str) -> Vec<Node<'a, 'input>> {
    node.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .collect()
}

/// Find the first descendant element with the given local name, or error.
pub fn req<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
    filename: &str,
) -> Result<Node<'a, 'input>, XmlError> {
    find(node, name).ok_or_else(|| XmlError::MissingElement {
        name: name.to_string(),
        filename: filename.to_string(),
    })
}

/// The trimmed text content of the first descendant element with the given name.
pub fn req_text<'a>(node: Node<'a, '_>, name: &str, filename: &str) -> Result<&'a str, XmlError> {
    let element = req(node, name, filename)?;
    Ok(element.text().unwrap_or("").trim())
}

/// Parse the text content of a required element into any `FromStr` type.
pub fn req_parse<T: FromStr>(node: Node, name: &str, filename: &str) -> Result<T, XmlError> {
    let text = req_text(node, name, filename)?;
    text.parse().map_err(|_| XmlError::Parse {
        value: text.to_string(),
        element: name.to_string(),
        filename: filename.to_string(),
    })
}

/// Parse the text content of a required element as an azimuth time.
pub fn req_time(node: Node, name: &str, filename: &str) -> Result<NaiveDateTime, XmlError> {
    parse_azimuth_time(req_text(node, name, filename)?)
}

/// Parse a required element's text as a whitespace-separated list of values.
pub fn req_list<T: FromStr>(node: Node, name: &str, filename: &str) -> Result<Vec<T>, XmlError> {
    let text = req_text(node, name, filename)?;
    parse_list(text, name, filename)
}

/// Parse whitespace-separated values out of an element's text content.
pub fn parse_list<T: FromStr>(text: &str, name: &str, filename: &str) -> Result<Vec<T>, XmlError> {
    text.split_whitespace()
        .map(|token| {
            token.parse().map_err(|_| XmlError::Parse {
                value: token.to_string(),
                element: name.to_string(),
                filename: filename.to_string(),
            })
        })
        .collect()
}

/// A required attribute value on the given node.
pub fn req_attr<'a>(node: Node<'a, '_>, name: &str, filename: &str) -> Result<&'a str, XmlError> {
    node.attribute(name).ok_or_else(|| XmlError::MissingAttribute {
        name: name.to_string(),
        element: node.tag_name().name().to_string(),
        filename: filename.to_string(),
    })
}

/// Wrap a `roxmltree` parse failure with the name of the offending file.
pub fn malformed(filename: &str, err: roxmltree::Error) -> XmlError {
    XmlError::Malformed {
        filename: filename.to_string(),
        message: err.to_string(),
    }
}
