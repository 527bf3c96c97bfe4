use railgen::catalog::{bundled, AssetCatalog, LocalCatalog};
use railgen::context::TemplateContext;
use railgen::error::Error;
use railgen::options::{resolve, RawOptions, ResolvedOptions, DATABASES};
use railgen::pipeline::{generate, GenerationReport, Generator, Outcome, LOG_FILES, STEPS};
use railgen::renderer::{MiniJinjaRenderer, TemplateRenderer};
use serde_json::json;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SECRET: &str = "0123456789abcdef";

fn options(value: serde_json::Value) -> ResolvedOptions {
    let raw: RawOptions = serde_json::from_value(value).unwrap();
    resolve(&raw).unwrap()
}

fn run(target: &Path, options: &ResolvedOptions) -> GenerationReport {
    let catalog = bundled();
    let renderer = MiniJinjaRenderer::new();
    Generator::new(target, options, &catalog, &renderer)
        .unwrap()
        .with_secret(SECRET)
        .quiet(true)
        .run()
        .unwrap()
}

#[cfg(unix)]
fn mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[test_log::test]
fn test_end_to_end_postgresql_without_tests() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("myapp");
    run(&root, &options(json!({ "database": "postgresql", "no_testunit": true })));

    let database_yml = fs::read_to_string(root.join("config/database.yml")).unwrap();
    assert!(database_yml.contains("adapter: postgresql"));
    assert!(database_yml.contains("database: myapp_development"));
    assert!(!root.join("test").exists());
    assert!(root.join("script/server").is_file());
    assert!(root.join("log/development.log").is_file());

    #[cfg(unix)]
    {
        assert_eq!(mode(&root.join("script")), 0o755);
        assert_eq!(mode(&root.join("log/development.log")), 0o666);
    }
}

#[test]
fn test_default_tree() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    run(&root, &options(json!({})));

    for path in [
        "Rakefile",
        "README",
        "app/controllers/application_controller.rb",
        "config/boot.rb",
        "config/routes.rb",
        "config/environment.rb",
        "config/environments/production.rb",
        "config/initializers/inflections.rb",
        "config/locales/en.yml",
        "config/database.yml",
        "db/seeds.rb",
        "doc/README_FOR_APP",
        "public/index.html",
        "public/images/rails.svg",
        "public/javascripts/prototype.js",
        "script/performance/profiler",
        "test/test_helper.rb",
    ] {
        assert!(root.join(path).is_file(), "missing {}", path);
    }
    for dir in ["lib/tasks", "tmp/sessions", "tmp/sockets", "tmp/cache", "tmp/pids", "vendor/plugins"] {
        assert!(root.join(dir).is_dir(), "missing {}", dir);
    }
    assert!(!root.join("config.ru").exists());

    let environment = fs::read_to_string(root.join("config/environment.rb")).unwrap();
    assert!(environment.contains("'_blog_session'"));
    assert!(environment.contains(SECRET));
    assert!(fs::read_to_string(root.join("config/database.yml")).unwrap().contains("sqlite3"));
}

#[test]
fn test_steps_run_in_declared_order() {
    let temp_dir = TempDir::new().unwrap();
    let report = run(&temp_dir.path().join("blog"), &options(json!({ "no_prototype": true })));

    let expected: Vec<&str> = STEPS
        .iter()
        .map(|step| step.name)
        .filter(|name| !["create_dispatch_files", "create_prototype_files"].contains(name))
        .collect();
    assert_eq!(report.executed, expected);
    assert_eq!(report.skipped, ["create_dispatch_files", "create_prototype_files"]);
    assert!(report.stopped_before.is_none());
    assert_eq!(report.records.first().map(|r| r.path.as_path()), Some(Path::new(".")));
}

#[test]
fn test_suppression_flags_remove_their_subtrees() {
    let cases = [
        ("no_activerecord", "config/database.yml"),
        ("no_testunit", "test"),
        ("no_prototype", "public/javascripts"),
    ];
    for (flag, path) in cases {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("blog");
        let report = run(&root, &options(json!({ flag: true })));

        assert!(!root.join(path).exists(), "{} should remove {}", flag, path);
        assert!(report.records.iter().all(|r| !r.path.starts_with(path)));
        assert!(root.join("config/environment.rb").exists());
    }
}

#[test]
fn test_dispatchers_are_left_out_by_default() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    let report = run(&root, &options(json!({ "with_dispatchers": false })));

    assert!(report.skipped.contains(&"create_dispatch_files"));
    for path in ["config.ru", "public/dispatch.rb", "public/dispatch.cgi", "public/dispatch.fcgi"] {
        assert!(!root.join(path).exists(), "{} should not exist", path);
        assert!(report.records.iter().all(|r| r.path != Path::new(path)));
    }
    assert!(root.join("public/index.html").exists());
}

#[test]
fn test_generates_below_missing_parents() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("work/apps/myapp");
    let report = run(&root, &options(json!({})));

    assert!(report.stopped_before.is_none());
    assert!(root.join("config/environment.rb").is_file());
    let environment = fs::read_to_string(root.join("config/environment.rb")).unwrap();
    assert!(environment.contains("myapp"));
}

#[test]
fn test_log_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    run(&root, &options(json!({})));

    let mut names: Vec<String> = fs::read_dir(root.join("log"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    let mut expected: Vec<String> = LOG_FILES.iter().map(|name| format!("{}.log", name)).collect();
    expected.sort();
    assert_eq!(names, expected);

    for name in &expected {
        let path = root.join("log").join(name);
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        #[cfg(unix)]
        assert_eq!(mode(&path), 0o666);
    }
}

#[test]
fn test_dispatchers() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    run(
        &root,
        &options(json!({ "with_dispatchers": true, "ruby_interpreter_path": "/opt/ruby/bin/ruby" })),
    );

    assert!(root.join("config.ru").is_file());
    let dispatchers: Vec<_> = fs::read_dir(root.join("public"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.file_stem().is_some_and(|stem| stem == "dispatch"))
        .collect();
    assert_eq!(dispatchers.len(), 3);

    for name in ["dispatch.rb", "dispatch.cgi", "dispatch.fcgi"] {
        let content = fs::read_to_string(root.join("public").join(name)).unwrap();
        assert!(content.starts_with("#!/opt/ruby/bin/ruby\n"), "{}", name);
    }

    #[cfg(unix)]
    {
        assert_eq!(mode(&root.join("public/dispatch.cgi")), 0o755);
        assert_eq!(mode(&root.join("public/dispatch.fcgi")), 0o755);
        assert_eq!(mode(&root.join("public/dispatch.rb")) & 0o111, 0);
    }
}

#[test]
fn test_database_template_selection() {
    let renderer = MiniJinjaRenderer::new();
    let catalog = bundled();

    for database in DATABASES {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("shop");
        let options = options(json!({ "database": database }));
        run(&root, &options);

        let template =
            catalog.read_to_string(&format!("config/databases/{}.yml", database)).unwrap();
        let context = TemplateContext::new(&root, options.clone()).unwrap().with_secret(SECRET);
        let expected = renderer.render(database, &template, &context.to_value()).unwrap();

        assert_eq!(fs::read_to_string(root.join("config/database.yml")).unwrap(), expected);
    }
}

#[test]
fn test_unknown_database_never_starts() {
    let raw: RawOptions = serde_json::from_value(json!({ "database": "mongodb" })).unwrap();
    assert!(matches!(resolve(&raw), Err(Error::InvalidChoice { .. })));
}

#[test]
fn test_runs_are_reproducible_with_pinned_secret() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let options = options(json!({ "with_dispatchers": true, "database": "mysql" }));

    run(&first.path().join("myapp"), &options);
    run(&second.path().join("myapp"), &options);
    assert!(!dir_diff::is_different(first.path(), second.path()).unwrap());

    // Running again over a populated root changes nothing.
    run(&first.path().join("myapp"), &options);
    assert!(!dir_diff::is_different(first.path(), second.path()).unwrap());
}

#[test]
fn test_secret_changes_between_unpinned_runs() {
    let catalog = bundled();
    let renderer = MiniJinjaRenderer::new();
    let options = options(json!({}));
    let mut secrets = Vec::new();

    for _ in 0..2 {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("blog");
        Generator::new(&root, &options, &catalog, &renderer)
            .unwrap()
            .quiet(true)
            .run()
            .unwrap();
        secrets.push(fs::read_to_string(root.join("config/environment.rb")).unwrap());
    }
    assert_ne!(secrets[0], secrets[1]);
}

#[test]
fn test_freeze_does_not_change_the_tree() {
    let frozen = TempDir::new().unwrap();
    let thawed = TempDir::new().unwrap();
    run(&frozen.path().join("blog"), &options(json!({ "freeze": true })));
    run(&thawed.path().join("blog"), &options(json!({ "freeze": false })));
    assert!(!dir_diff::is_different(frozen.path(), thawed.path()).unwrap());
}

#[test]
fn test_template_source_is_not_processed() {
    let with_source = TempDir::new().unwrap();
    let without = TempDir::new().unwrap();
    run(&with_source.path().join("blog"), &options(json!({ "template_source": "setup.rb" })));
    run(&without.path().join("blog"), &options(json!({})));
    assert!(!dir_diff::is_different(with_source.path(), without.path()).unwrap());
}

#[test]
fn test_stop_at_step_boundary() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    let options = options(json!({}));
    let catalog = bundled();
    let renderer = MiniJinjaRenderer::new();

    let report = Generator::new(&root, &options, &catalog, &renderer)
        .unwrap()
        .quiet(true)
        .run_until(|step| step.name != "create_log_files")
        .unwrap();

    assert_eq!(report.stopped_before, Some("create_log_files"));
    assert_eq!(report.executed.last(), Some(&"create_lib_files"));
    assert!(root.join("lib/tasks").is_dir());
    assert!(!root.join("log").exists());
}

#[test_log::test]
fn test_failure_aborts_and_leaves_partial_tree() {
    let assets = TempDir::new().unwrap();
    fs::write(assets.path().join("Rakefile"), "task :default\n").unwrap();
    let catalog = LocalCatalog::open(assets.path()).unwrap();
    let renderer = MiniJinjaRenderer::new();
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    let options = options(json!({}));

    let err = Generator::new(&root, &options, &catalog, &renderer)
        .unwrap()
        .quiet(true)
        .run()
        .unwrap_err();

    assert!(matches!(err, Error::SourceAssetMissing { ref name, .. } if name == "README"));
    assert!(root.join("Rakefile").is_file());
    assert!(!root.join("app").exists());
}

#[test]
fn test_informational_flags_write_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("blog");
    let catalog = bundled();
    let renderer = MiniJinjaRenderer::new();

    for flag in ["show_version", "show_help"] {
        let outcome =
            generate(&root, &options(json!({ flag: true })), &catalog, &renderer, true).unwrap();
        assert!(matches!(outcome, Outcome::ShortCircuited));
        assert!(!root.exists());
    }

    let outcome = generate(&root, &options(json!({})), &catalog, &renderer, true).unwrap();
    assert!(matches!(outcome, Outcome::Generated(_)));
    assert!(root.join("Rakefile").exists());
}
