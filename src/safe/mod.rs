// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Structs and helper methods for SAFE container access

A Sentinel-1 product is either a SAFE directory or a ZIP file with the same
internal layout. Both forms expose the same interface here: a list of
member names (relative, forward-slash separated) and byte-level reads.
*/

pub mod error;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub use error::SafeError;

/// One SAFE product container.
#[derive(Debug, Clone)]
pub enum SafeContainer {
    /// An unpacked SAFE directory
    Dir(PathBuf),
    /// A zipped SAFE product
    Zip(PathBuf),
}

impl SafeContainer {
    /// Open a SAFE directory or ZIP file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SafeError> {
        let path = path.as_ref();
        if path.is_dir() {
            Ok(SafeContainer::Dir(path.to_path_buf()))
        } else if path.is_file() {
            Ok(SafeContainer::Zip(path.to_path_buf()))
        } else {
            Err(SafeError::NotFound(path.display().to_string()))
        }
    }

    /// The path the container was opened from.
    pub fn path(&self) -> &Path {
        match self {
            SafeContainer::Dir(p) | SafeContainer::Zip(p) => p,
        }
    }

    /// All member names, relative to the container root.
    pub fn file_names(&self) -> Result<Vec<String>, SafeError> {
        match self {
            SafeContainer::Dir(root) => {
                let mut names = vec![];
                walk_dir(root, root, &mut names)?;
                names.sort();
                Ok(names)
            }
            SafeContainer::Zip(path) => {
                let file = open_file(path)?;
                let zip = zip::ZipArchive::new(file).map_err(|e| SafeError::Zip {
                    container: path.display().to_string(),
                    message: e.to_string(),
                })?;
                Ok(zip.file_names().map(str::to_string).collect())
            }
        }
    }

    /// Read one member completely.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, SafeError> {
        match self {
            SafeContainer::Dir(root) => {
                let path = root.join(name);
                fs::read(&path).map_err(|source| SafeError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
            SafeContainer::Zip(path) => {
                let file = open_file(path)?;
                let mut zip = zip::ZipArchive::new(file).map_err(|e| SafeError::Zip {
                    container: path.display().to_string(),
                    message: e.to_string(),
                })?;
                let mut member = zip.by_name(name).map_err(|_| SafeError::MissingFile {
                    name: name.to_string(),
                    container: path.display().to_string(),
                })?;
                let mut buffer = Vec::with_capacity(member.size() as usize);
                member
                    .read_to_end(&mut buffer)
                    .map_err(|source| SafeError::Io {
                        path: name.to_string(),
                        source,
                    })?;
                Ok(buffer)
            }
        }
    }

    /// Read one member as UTF-8 text.
    pub fn read_to_string(&self, name: &str) -> Result<String, SafeError> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes).map_err(|e| SafeError::Zip {
            container: self.path().display().to_string(),
            message: format!("{name} is not valid UTF-8: {e}"),
        })
    }
}

fn open_file(path: &Path) -> Result<fs::File, SafeError> {
    fs::File::open(path).map_err(|source| SafeError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn walk_dir(root: &Path, dir: &Path, names: &mut Vec<String>) -> Result<(), SafeError> {
    let entries = fs::read_dir(dir).map_err(|source| SafeError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| SafeError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(root, &path, names)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            names.push(relative.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod test;
