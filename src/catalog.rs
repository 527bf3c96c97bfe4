//! Asset catalog access.
//! Assets are the static files and templates a skeleton is built from. They
//! are addressed by logical names such as `config/environment.rb`.

use crate::error::{Error, Result};
use include_dir::{include_dir, Dir, DirEntry};
use log::debug;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Assets shipped inside the railgen binary.
static BUNDLED_ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/templates/app");

/// One entry below a listed asset directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetEntry {
    /// Logical asset name, usable with [`AssetCatalog::read`].
    pub name: String,
    /// Path relative to the listed directory.
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Source of named assets.
pub trait AssetCatalog: fmt::Debug {
    /// Reads the raw bytes of a file asset.
    ///
    /// # Errors
    /// * `Error::SourceAssetMissing` if the catalog has no such file
    fn read(&self, name: &str) -> Result<Vec<u8>>;

    /// Lists what lies below a directory asset. Entries come sorted by file
    /// name with every directory followed by its own contents; without
    /// `recursive` only the direct children are listed.
    ///
    /// # Errors
    /// * `Error::SourceAssetMissing` if the catalog has no such directory
    fn list(&self, dir: &str, recursive: bool) -> Result<Vec<AssetEntry>>;

    /// Reads a file asset as UTF-8 text.
    fn read_to_string(&self, name: &str) -> Result<String> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// Opens the catalog compiled into the binary.
pub fn bundled() -> EmbeddedCatalog {
    EmbeddedCatalog::new(&BUNDLED_ASSETS)
}

/// Catalog backed by a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalCatalog {
    root: PathBuf,
}

impl LocalCatalog {
    /// Opens a catalog rooted at `root`.
    ///
    /// # Errors
    /// * `Error::Config` if `root` is not a directory
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::Config(format!(
                "asset catalog '{}' is not a directory",
                root.display()
            )));
        }
        debug!("Using assets from '{}'", root.display());
        Ok(Self { root: root.to_path_buf() })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a logical asset name to a file or directory under the root.
    ///
    /// # Errors
    /// * `Error::SourceAssetMissing` if nothing exists under that name
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        let relative = checked_name(name).ok_or_else(|| self.missing(name))?;
        let path = self.root.join(relative);
        if path.exists() {
            Ok(path)
        } else {
            Err(self.missing(name))
        }
    }

    fn missing(&self, name: &str) -> Error {
        Error::SourceAssetMissing {
            name: name.to_string(),
            catalog: format!("'{}'", self.root.display()),
        }
    }
}

impl AssetCatalog for LocalCatalog {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.locate(name)?;
        if !path.is_file() {
            return Err(self.missing(name));
        }
        Ok(std::fs::read(path)?)
    }

    fn list(&self, dir: &str, recursive: bool) -> Result<Vec<AssetEntry>> {
        let source = self.locate(dir)?;
        if !source.is_dir() {
            return Err(self.missing(dir));
        }

        let max_depth = if recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&source).min_depth(1).max_depth(max_depth).sort_by_file_name();
        let mut entries = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            let path = entry
                .path()
                .strip_prefix(&source)
                .map_err(|e| Error::Config(e.to_string()))?
                .to_path_buf();
            entries.push(AssetEntry {
                name: asset_name(dir, &path),
                is_dir: entry.file_type().is_dir(),
                path,
            });
        }
        Ok(entries)
    }
}

/// Catalog compiled into the binary with `include_dir`.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedCatalog {
    dir: &'static Dir<'static>,
}

impl EmbeddedCatalog {
    pub fn new(dir: &'static Dir<'static>) -> Self {
        Self { dir }
    }

    fn missing(&self, name: &str) -> Error {
        Error::SourceAssetMissing {
            name: name.to_string(),
            catalog: "the bundled assets".to_string(),
        }
    }
}

impl AssetCatalog for EmbeddedCatalog {
    fn read(&self, name: &str) -> Result<Vec<u8>> {
        let relative = checked_name(name).ok_or_else(|| self.missing(name))?;
        self.dir
            .get_file(relative)
            .map(|file| file.contents().to_vec())
            .ok_or_else(|| self.missing(name))
    }

    fn list(&self, dir: &str, recursive: bool) -> Result<Vec<AssetEntry>> {
        let relative = checked_name(dir).ok_or_else(|| self.missing(dir))?;
        let source = self.dir.get_dir(relative).ok_or_else(|| self.missing(dir))?;

        let mut entries = Vec::new();
        collect_embedded(source, dir, Path::new(""), recursive, &mut entries);
        Ok(entries)
    }
}

fn collect_embedded(
    source: &Dir<'_>,
    dir: &str,
    prefix: &Path,
    recursive: bool,
    out: &mut Vec<AssetEntry>,
) {
    let mut children: Vec<&DirEntry<'_>> = source.entries().iter().collect();
    children.sort_by(|a, b| a.path().file_name().cmp(&b.path().file_name()));

    for child in children {
        let Some(file_name) = child.path().file_name() else {
            continue;
        };
        let path = prefix.join(file_name);
        match child {
            DirEntry::Dir(sub) => {
                out.push(AssetEntry { name: asset_name(dir, &path), path: path.clone(), is_dir: true });
                if recursive {
                    collect_embedded(sub, dir, &path, recursive, out);
                }
            }
            DirEntry::File(_) => {
                out.push(AssetEntry { name: asset_name(dir, &path), path, is_dir: false });
            }
        }
    }
}

/// Names never escape the catalog root.
fn checked_name(name: &str) -> Option<&Path> {
    let relative = Path::new(name);
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
        .then_some(relative)
}

fn asset_name(dir: &str, relative: &Path) -> String {
    let mut name = dir.trim_end_matches('/').to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
