//! The generation pipeline.
//!
//! A skeleton is produced by running [`STEPS`] in order. Each step may be
//! guarded by an option; a step whose guard fails is skipped as a whole and
//! the remaining steps keep their order.

use log::{debug, info};
use std::path::{Path, PathBuf};

use crate::actions::{ActionRecord, Actions};
use crate::catalog::AssetCatalog;
use crate::context::TemplateContext;
use crate::error::{Error, Result};
use crate::options::ResolvedOptions;
use crate::renderer::TemplateRenderer;

/// Log files created empty and left world-writable.
pub const LOG_FILES: [&str; 4] = ["server", "production", "development", "test"];

/// Runtime directories created under `tmp/`.
pub const TMP_DIRS: [&str; 4] = ["sessions", "sockets", "cache", "pids"];

/// Targets the dispatcher template is rendered into, with the mode to apply.
pub const DISPATCHERS: [(&str, Option<u32>); 3] = [
    ("public/dispatch.rb", None),
    ("public/dispatch.cgi", Some(0o755)),
    ("public/dispatch.fcgi", Some(0o755)),
];

/// Option-derived condition deciding whether a step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    ActiveRecord,
    Dispatchers,
    Prototype,
    TestUnit,
}

impl Guard {
    pub fn allows(self, options: &ResolvedOptions) -> bool {
        match self {
            Guard::Always => true,
            Guard::ActiveRecord => !options.no_activerecord(),
            Guard::Dispatchers => options.with_dispatchers(),
            Guard::Prototype => !options.no_prototype(),
            Guard::TestUnit => !options.no_testunit(),
        }
    }
}

/// A named unit of the pipeline.
pub struct Step {
    pub name: &'static str,
    pub guard: Guard,
    pub run: fn(&mut Generator<'_>) -> Result<()>,
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Step").field("name", &self.name).field("guard", &self.guard).finish()
    }
}

/// Steps in the order they run. Later steps write into directories created
/// by earlier ones.
pub const STEPS: &[Step] = &[
    Step { name: "create_root", guard: Guard::Always, run: create_root },
    Step { name: "create_root_files", guard: Guard::Always, run: create_root_files },
    Step { name: "create_app_files", guard: Guard::Always, run: create_app_files },
    Step { name: "create_config_files", guard: Guard::Always, run: create_config_files },
    Step {
        name: "create_activerecord_files",
        guard: Guard::ActiveRecord,
        run: create_activerecord_files,
    },
    Step { name: "create_db_files", guard: Guard::Always, run: create_db_files },
    Step { name: "create_doc_files", guard: Guard::Always, run: create_doc_files },
    Step { name: "create_lib_files", guard: Guard::Always, run: create_lib_files },
    Step { name: "create_log_files", guard: Guard::Always, run: create_log_files },
    Step { name: "create_public_files", guard: Guard::Always, run: create_public_files },
    Step { name: "create_dispatch_files", guard: Guard::Dispatchers, run: create_dispatch_files },
    Step {
        name: "create_public_image_files",
        guard: Guard::Always,
        run: create_public_image_files,
    },
    Step {
        name: "create_public_stylesheets_files",
        guard: Guard::Always,
        run: create_public_stylesheets_files,
    },
    Step { name: "create_prototype_files", guard: Guard::Prototype, run: create_prototype_files },
    Step { name: "create_script_files", guard: Guard::Always, run: create_script_files },
    Step { name: "create_test_files", guard: Guard::TestUnit, run: create_test_files },
    Step { name: "create_tmp_files", guard: Guard::Always, run: create_tmp_files },
    Step { name: "create_vendor_files", guard: Guard::Always, run: create_vendor_files },
];

/// What a finished (or stopped) run did.
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub executed: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
    /// Set when the run was stopped at a step boundary before completing.
    pub stopped_before: Option<&'static str>,
    pub records: Vec<ActionRecord>,
}

/// Result of [`generate`].
#[derive(Debug)]
pub enum Outcome {
    Generated(GenerationReport),
    /// An informational flag was set; nothing was written.
    ShortCircuited,
}

/// Runs the pipeline for one application root.
pub struct Generator<'a> {
    options: &'a ResolvedOptions,
    context: TemplateContext,
    actions: Actions<'a>,
}

impl<'a> Generator<'a> {
    /// Prepares a run rooted at `target`, made absolute against the
    /// current directory.
    ///
    /// # Errors
    /// * `Error::InvalidTarget` if the target has no usable final segment
    pub fn new<P: AsRef<Path>>(
        target: P,
        options: &'a ResolvedOptions,
        catalog: &'a dyn AssetCatalog,
        renderer: &'a dyn TemplateRenderer,
    ) -> Result<Self> {
        let root = absolute_root(target.as_ref())?;
        let context = TemplateContext::new(&root, options.clone())?;
        Ok(Self { options, context, actions: Actions::new(root, catalog, renderer) })
    }

    /// Pins the secret token rendered into templates.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.context = self.context.with_secret(secret);
        self
    }

    /// Replaces the locations probed for a MySQL socket.
    pub fn with_socket_candidates<I, P>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.context = self.context.with_socket_candidates(candidates);
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.actions = self.actions.quiet(quiet);
        self
    }

    pub fn root(&self) -> &Path {
        self.actions.root()
    }

    pub fn context(&self) -> &TemplateContext {
        &self.context
    }

    /// Runs every step.
    pub fn run(self) -> Result<GenerationReport> {
        self.run_until(|_| true)
    }

    /// Runs steps in order, asking `should_continue` before each one. A step
    /// that starts always runs to completion.
    pub fn run_until<F>(mut self, mut should_continue: F) -> Result<GenerationReport>
    where
        F: FnMut(&Step) -> bool,
    {
        let mut report = GenerationReport::default();

        if let Some(source) = self.options.template_source() {
            info!("Application template '{}' is not applied by this generator", source);
        }

        for step in STEPS {
            if !should_continue(step) {
                info!("Stopping before step {}", step.name);
                report.stopped_before = Some(step.name);
                break;
            }
            if !step.guard.allows(self.options) {
                info!("Skipping step {}", step.name);
                report.skipped.push(step.name);
                continue;
            }
            debug!("Running step {}", step.name);
            (step.run)(&mut self)?;
            report.executed.push(step.name);
        }

        report.records = self.actions.into_records();
        Ok(report)
    }
}

/// Runs the pipeline unless an informational flag asks to quit first.
pub fn generate<P: AsRef<Path>>(
    target: P,
    options: &ResolvedOptions,
    catalog: &dyn AssetCatalog,
    renderer: &dyn TemplateRenderer,
    quiet: bool,
) -> Result<Outcome> {
    if options.short_circuits() {
        return Ok(Outcome::ShortCircuited);
    }
    let report = Generator::new(target, options, catalog, renderer)?.quiet(quiet).run()?;
    Ok(Outcome::Generated(report))
}

fn absolute_root(target: &Path) -> Result<PathBuf> {
    let root = std::path::absolute(target)?;
    match root.file_name() {
        Some(_) => Ok(root),
        // "." or ".." as the last segment; the directory must exist to be named.
        None => root.canonicalize().map_err(|e| Error::InvalidTarget {
            path: target.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

fn create_root(g: &mut Generator<'_>) -> Result<()> {
    g.actions.create_directory(".")?;
    debug!("Application name: {}", g.context.app_name());
    Ok(())
}

fn create_root_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_file("Rakefile", "Rakefile")?;
    g.actions.copy_file("README", "README")
}

fn create_app_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("app", "app", true)
}

fn create_config_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.create_directory("config")?;
    g.actions.copy_file("config/boot.rb", "config/boot.rb")?;
    g.actions.copy_file("config/routes.rb", "config/routes.rb")?;
    g.actions.render_template("config/environment.rb", "config/environment.rb", &g.context)?;

    for dir in ["environments", "initializers", "locales"] {
        let path = format!("config/{}", dir);
        g.actions.copy_tree(&path, &path, true)?;
    }
    Ok(())
}

fn create_activerecord_files(g: &mut Generator<'_>) -> Result<()> {
    let asset = format!("config/databases/{}.yml", g.options.database());
    g.actions.render_template(&asset, "config/database.yml", &g.context)
}

fn create_db_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("db", "db", true)
}

fn create_doc_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("doc", "doc", true)
}

fn create_lib_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.create_directory("lib")?;
    g.actions.create_directory("lib/tasks")
}

fn create_log_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.create_directory("log")?;
    for name in LOG_FILES {
        let path = format!("log/{}.log", name);
        g.actions.create_file(&path, "")?;
        g.actions.set_permissions(&path, 0o666, false)?;
    }
    Ok(())
}

// Shallow on purpose: later steps fill the subdirectories one by one.
fn create_public_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("public", "public", false)
}

fn create_dispatch_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_file("dispatchers/config.ru", "config.ru")?;
    for (target, mode) in DISPATCHERS {
        g.actions.render_template("dispatchers/dispatch.rb", target, &g.context)?;
        if let Some(mode) = mode {
            g.actions.set_permissions(target, mode, false)?;
        }
    }
    Ok(())
}

fn create_public_image_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("public/images", "public/images", true)
}

fn create_public_stylesheets_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("public/stylesheets", "public/stylesheets", true)
}

fn create_prototype_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("public/javascripts", "public/javascripts", true)
}

fn create_script_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("script", "script", true)?;
    g.actions.set_permissions("script", 0o755, false)
}

fn create_test_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.copy_tree("test", "test", true)
}

fn create_tmp_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.create_directory("tmp")?;
    for dir in TMP_DIRS {
        g.actions.create_directory(format!("tmp/{}", dir))?;
    }
    Ok(())
}

fn create_vendor_files(g: &mut Generator<'_>) -> Result<()> {
    g.actions.create_directory("vendor/plugins")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names_are_unique() {
        let mut names: Vec<&str> = STEPS.iter().map(|step| step.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), STEPS.len());
    }

    #[test]
    fn test_root_is_created_first() {
        assert_eq!(STEPS[0].name, "create_root");
        assert_eq!(STEPS.last().map(|step| step.name), Some("create_vendor_files"));
    }

    #[test]
    fn test_guards_follow_flags() {
        let defaults = crate::options::resolve(&Default::default()).unwrap();
        assert!(Guard::ActiveRecord.allows(&defaults));
        assert!(Guard::TestUnit.allows(&defaults));
        assert!(Guard::Prototype.allows(&defaults));
        assert!(!Guard::Dispatchers.allows(&defaults));
    }
}
