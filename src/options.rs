//! Option schema and resolution.
//!
//! Every option the generator understands is declared once in [`OPTIONS`].
//! Resolution turns the values supplied for one invocation into a
//! [`ResolvedOptions`] map where every declared option has a value.

use indexmap::IndexMap;
use log::debug;
use std::fmt;

use crate::error::{Error, Result};

/// Value supplied for an option by a caller (command line or options file).
pub type RawValue = serde_json::Value;

/// Supplied values keyed by option name, in the order they were given.
pub type RawOptions = IndexMap<String, RawValue>;

/// Interpreter used in shebang lines when nothing better is found.
pub const FALLBACK_RUBY: &str = "/usr/bin/env ruby";

/// Declared type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    String,
    Boolean,
}

impl OptionKind {
    fn as_str(self) -> &'static str {
        match self {
            OptionKind::String => "string",
            OptionKind::Boolean => "boolean",
        }
    }
}

/// Section of the help output an option belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionGroup {
    Generator,
    Runtime,
}

/// Default used when an option is not supplied.
#[derive(Debug, Clone, Copy)]
pub enum OptionDefault {
    /// The option stays absent.
    None,
    Bool(bool),
    Str(&'static str),
    /// Probed from the running platform at resolution time.
    Detect(fn() -> String),
}

/// Declaration of a single option.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub default: OptionDefault,
    pub short: char,
    pub help: &'static str,
    pub group: OptionGroup,
    /// Allowed values; empty means unrestricted.
    pub choices: &'static [&'static str],
}

/// Database identifiers a skeleton can be preconfigured for.
pub const DATABASES: [&str; 7] = [
    "mysql",
    "oracle",
    "postgresql",
    "sqlite2",
    "sqlite3",
    "frontbase",
    "ibm_db",
];

pub const DEFAULT_DATABASE: &str = "sqlite3";

/// The option schema of the application generator.
pub const OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "ruby_interpreter_path",
        kind: OptionKind::String,
        default: OptionDefault::Detect(default_ruby_path),
        short: 'r',
        help: "Path to the Ruby binary of your choice",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "database",
        kind: OptionKind::String,
        default: OptionDefault::Str(DEFAULT_DATABASE),
        short: 'd',
        help: "Preconfigure for selected database",
        group: OptionGroup::Generator,
        choices: &DATABASES,
    },
    OptionSpec {
        name: "freeze",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'f',
        help: "Freeze the framework in vendor/rails from the gems",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "template_source",
        kind: OptionKind::String,
        default: OptionDefault::None,
        short: 'm',
        help: "Path to an application template (can be a filesystem path or URL)",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "with_dispatchers",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'D',
        help: "Add CGI/FastCGI/mod_ruby dispatchers code",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "no_activerecord",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'A',
        help: "Do not generate ActiveRecord files",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "no_testunit",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'U',
        help: "Do not generate TestUnit files",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "no_prototype",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'P',
        help: "Do not generate Prototype files",
        group: OptionGroup::Generator,
        choices: &[],
    },
    OptionSpec {
        name: "show_version",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'v',
        help: "Show version number and quit",
        group: OptionGroup::Runtime,
        choices: &[],
    },
    OptionSpec {
        name: "show_help",
        kind: OptionKind::Boolean,
        default: OptionDefault::Bool(false),
        short: 'h',
        help: "Show this help message and quit",
        group: OptionGroup::Runtime,
        choices: &[],
    },
];

/// Locates a `ruby` executable on `PATH`, falling back to `/usr/bin/env ruby`.
pub fn default_ruby_path() -> String {
    which::which("ruby")
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| FALLBACK_RUBY.to_string())
}

/// Looks up an option declaration by name.
pub fn find_spec(name: &str) -> Option<&'static OptionSpec> {
    OPTIONS.iter().find(|spec| spec.name == name)
}

/// Concrete value of a resolved option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Str(String),
    Bool(bool),
    Absent,
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Str(s) => write!(f, "{}", s),
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Absent => write!(f, "(none)"),
        }
    }
}

/// Effective configuration for one invocation. Read-only once built.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    values: IndexMap<&'static str, OptionValue>,
}

impl ResolvedOptions {
    /// Returns the value of a declared option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Returns a boolean option; undeclared or non-boolean options read as false.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(OptionValue::Bool(true)))
    }

    /// Returns a string option if it has a value.
    pub fn string(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(OptionValue::Str(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn database(&self) -> &str {
        self.string("database").unwrap_or(DEFAULT_DATABASE)
    }

    pub fn ruby_interpreter_path(&self) -> Option<&str> {
        self.string("ruby_interpreter_path")
    }

    pub fn template_source(&self) -> Option<&str> {
        self.string("template_source")
    }

    pub fn freeze(&self) -> bool {
        self.flag("freeze")
    }

    pub fn with_dispatchers(&self) -> bool {
        self.flag("with_dispatchers")
    }

    pub fn no_activerecord(&self) -> bool {
        self.flag("no_activerecord")
    }

    pub fn no_testunit(&self) -> bool {
        self.flag("no_testunit")
    }

    pub fn no_prototype(&self) -> bool {
        self.flag("no_prototype")
    }

    /// Whether an informational flag asks to quit before generating anything.
    pub fn short_circuits(&self) -> bool {
        self.flag("show_version") || self.flag("show_help")
    }

    /// Iterates over all options in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &OptionValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }
}

/// Resolves supplied values against the declared schema.
///
/// # Errors
/// * `Error::UnknownOption` if a supplied name is not declared
/// * `Error::OptionType` if a value does not match the declared type
/// * `Error::InvalidChoice` if a value is outside the option's choices
pub fn resolve(supplied: &RawOptions) -> Result<ResolvedOptions> {
    resolve_with(OPTIONS, supplied)
}

/// Resolves supplied values against an explicit schema.
pub fn resolve_with(schema: &'static [OptionSpec], supplied: &RawOptions) -> Result<ResolvedOptions> {
    let mut normalized: IndexMap<String, &RawValue> = IndexMap::new();
    for (name, value) in supplied {
        let name = name.replace('-', "_");
        if !schema.iter().any(|spec| spec.name == name) {
            return Err(Error::UnknownOption { name });
        }
        normalized.insert(name, value);
    }

    let mut values = IndexMap::new();
    for spec in schema {
        let value = match normalized.get(spec.name) {
            Some(raw) => coerce(spec, raw)?,
            None => default_value(spec),
        };
        debug!("Option {} = {}", spec.name, value);
        values.insert(spec.name, value);
    }

    Ok(ResolvedOptions { values })
}

fn default_value(spec: &OptionSpec) -> OptionValue {
    match spec.default {
        OptionDefault::None => OptionValue::Absent,
        OptionDefault::Bool(b) => OptionValue::Bool(b),
        OptionDefault::Str(s) => OptionValue::Str(s.to_string()),
        OptionDefault::Detect(probe) => OptionValue::Str(probe()),
    }
}

fn coerce(spec: &OptionSpec, raw: &RawValue) -> Result<OptionValue> {
    let type_error = || Error::OptionType {
        name: spec.name.to_string(),
        expected: spec.kind.as_str(),
        found: raw.to_string(),
    };

    let value = match (spec.kind, raw) {
        (OptionKind::Boolean, RawValue::Bool(b)) => OptionValue::Bool(*b),
        (OptionKind::Boolean, RawValue::String(s)) => match s.as_str() {
            "true" => OptionValue::Bool(true),
            "false" => OptionValue::Bool(false),
            _ => return Err(type_error()),
        },
        (OptionKind::String, RawValue::String(s)) => OptionValue::Str(s.clone()),
        _ => return Err(type_error()),
    };

    if let OptionValue::Str(s) = &value {
        if !spec.choices.is_empty() && !spec.choices.contains(&s.as_str()) {
            return Err(Error::InvalidChoice {
                name: spec.name.to_string(),
                value: s.clone(),
                choices: spec.choices.join("/"),
            });
        }
    }

    Ok(value)
}
