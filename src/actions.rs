//! File action primitives.
//!
//! Every action targets one path relative to the application root and can be
//! repeated safely: directories that exist are left alone and files are
//! overwritten with the same content.

use log::debug;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::AssetCatalog;
use crate::context::TemplateContext;
use crate::error::{Error, Result};
use crate::renderer::TemplateRenderer;

/// Kind of effect a primitive had on the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Exist,
    Copy,
    Render,
    Chmod,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Create => "create",
            Action::Exist => "exist",
            Action::Copy => "copy",
            Action::Render => "render",
            Action::Chmod => "chmod",
        };
        write!(f, "{}", label)
    }
}

/// One action applied to one path, relative to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRecord {
    pub action: Action,
    pub path: PathBuf,
}

/// Applies file actions under a fixed root, pulling sources from a catalog.
pub struct Actions<'a> {
    root: PathBuf,
    catalog: &'a dyn AssetCatalog,
    renderer: &'a dyn TemplateRenderer,
    quiet: bool,
    records: Vec<ActionRecord>,
}

impl<'a> Actions<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        catalog: &'a dyn AssetCatalog,
        renderer: &'a dyn TemplateRenderer,
    ) -> Self {
        Self { root: root.into(), catalog, renderer, quiet: false, records: Vec::new() }
    }

    /// Suppresses the per-file status lines on stdout.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Actions applied so far, in order.
    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ActionRecord> {
        self.records
    }

    /// Creates a directory and any missing parents.
    pub fn create_directory<P: AsRef<Path>>(&mut self, rel: P) -> Result<()> {
        let rel = rel.as_ref();
        let target = self.target(rel);
        if target.is_dir() {
            self.record(Action::Exist, rel);
            return Ok(());
        }
        fs::create_dir_all(&target)?;
        self.record(Action::Create, rel);
        Ok(())
    }

    /// Copies an asset byte for byte.
    ///
    /// # Errors
    /// * `Error::SourceAssetMissing` if the catalog has no such asset
    pub fn copy_file<P: AsRef<Path>>(&mut self, asset: &str, rel: P) -> Result<()> {
        let rel = rel.as_ref();
        let content = self.catalog.read(asset)?;
        let target = self.prepare_parent(rel)?;
        fs::write(target, content)?;
        self.record(Action::Copy, rel);
        Ok(())
    }

    /// Renders an asset with the template context and writes the result.
    ///
    /// # Errors
    /// * `Error::SourceAssetMissing` if the catalog has no such asset
    /// * `Error::TemplateRender` if the template cannot be rendered
    pub fn render_template<P: AsRef<Path>>(
        &mut self,
        asset: &str,
        rel: P,
        context: &TemplateContext,
    ) -> Result<()> {
        let rel = rel.as_ref();
        let template = self.catalog.read_to_string(asset)?;
        let content = self.renderer.render(asset, &template, &context.to_value())?;
        let target = self.prepare_parent(rel)?;
        fs::write(target, content)?;
        self.record(Action::Render, rel);
        Ok(())
    }

    /// Writes a file with the given content, replacing what was there.
    pub fn create_file<P: AsRef<Path>>(&mut self, rel: P, content: &str) -> Result<()> {
        let rel = rel.as_ref();
        let target = self.prepare_parent(rel)?;
        fs::write(target, content)?;
        self.record(Action::Create, rel);
        Ok(())
    }

    /// Applies permission bits to a path, and to everything beneath it when
    /// `recursive` is set. Does nothing on platforms without Unix modes.
    ///
    /// # Errors
    /// * `Error::PathNotFound` if the path does not exist
    pub fn set_permissions<P: AsRef<Path>>(&mut self, rel: P, mode: u32, recursive: bool) -> Result<()> {
        let rel = rel.as_ref();
        let target = self.target(rel);
        if !target.exists() {
            return Err(Error::PathNotFound { path: target });
        }

        let max_depth = if recursive { usize::MAX } else { 0 };
        for entry in WalkDir::new(&target).max_depth(max_depth) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            apply_mode(entry.path(), mode)?;
        }
        self.record(Action::Chmod, rel);
        Ok(())
    }

    /// Copies an asset directory. With `recursive` unset only the files
    /// directly inside it are copied and subdirectories are left out.
    ///
    /// # Errors
    /// * `Error::SourceAssetMissing` if the catalog has no such directory
    pub fn copy_tree<P: AsRef<Path>>(&mut self, asset_dir: &str, rel: P, recursive: bool) -> Result<()> {
        let rel = rel.as_ref();
        let entries = self.catalog.list(asset_dir, recursive)?;

        self.create_directory(rel)?;

        for entry in entries {
            let dest = rel.join(&entry.path);
            if entry.is_dir {
                if recursive {
                    self.create_directory(&dest)?;
                }
            } else {
                let content = self.catalog.read(&entry.name)?;
                let target = self.prepare_parent(&dest)?;
                fs::write(target, content)?;
                self.record(Action::Copy, &dest);
            }
        }
        Ok(())
    }

    /// Joins `rel` onto the root with `.` segments dropped, so `"."` names
    /// the root itself.
    fn target(&self, rel: &Path) -> PathBuf {
        self.root.join(rel).components().collect()
    }

    fn prepare_parent(&self, rel: &Path) -> Result<PathBuf> {
        let target = self.target(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(target)
    }

    fn record(&mut self, action: Action, rel: &Path) {
        debug!("{} {}", action, self.target(rel).display());
        if !self.quiet {
            println!("{:>10}  {}", action, rel.display());
        }
        self.records.push(ActionRecord { action, path: rel.to_path_buf() });
    }
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    debug!("Skipping mode {:o} on {}", mode, path.display());
    Ok(())
}
