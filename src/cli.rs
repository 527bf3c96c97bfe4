//! Command-line interface implementation for railgen.
//! Provides argument parsing and help text formatting using clap.

use clap::{error::ErrorKind, ArgAction, Command, CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

use crate::options::{OptionGroup, RawOptions, RawValue, ResolvedOptions, OPTIONS};

/// Command-line arguments structure for railgen.
///
/// Help text and headings of the generator options come from
/// [`OPTIONS`]; see [`command`].
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "railgen: create a new web application skeleton",
    long_about = None,
    disable_version_flag = true
)]
pub struct Args {
    /// Directory the application is created in; its name becomes the app name
    #[arg(value_name = "APP_PATH")]
    pub app_path: PathBuf,

    #[arg(short = 'r', long = "ruby", value_name = "PATH")]
    pub ruby: Option<String>,

    #[arg(short, long, value_name = "DATABASE")]
    pub database: Option<String>,

    #[arg(short, long)]
    pub freeze: bool,

    #[arg(short = 'm', long = "template", value_name = "TEMPLATE")]
    pub template: Option<String>,

    #[arg(short = 'D', long)]
    pub with_dispatchers: bool,

    #[arg(short = 'A', long)]
    pub no_activerecord: bool,

    #[arg(short = 'U', long)]
    pub no_testunit: bool,

    #[arg(short = 'P', long)]
    pub no_prototype: bool,

    /// Directory holding the application assets
    #[arg(long, value_name = "DIR", env = "RAILGEN_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// JSON or YAML file with option values; command-line values take precedence
    #[arg(long, value_name = "FILE")]
    pub options_file: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(long)]
    pub verbose: bool,

    /// Do not print a line for every file action
    #[arg(short, long)]
    pub quiet: bool,

    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

impl Args {
    /// Option values given on the command line, keyed by option name.
    /// Flags that were not passed are left out so defaults and the options
    /// file still apply.
    pub fn raw_options(&self) -> RawOptions {
        let mut raw = RawOptions::new();
        let strings = [
            ("ruby_interpreter_path", &self.ruby),
            ("database", &self.database),
            ("template_source", &self.template),
        ];
        for (name, value) in strings {
            if let Some(value) = value {
                raw.insert(name.to_string(), RawValue::String(value.clone()));
            }
        }

        let flags = [
            ("freeze", self.freeze),
            ("with_dispatchers", self.with_dispatchers),
            ("no_activerecord", self.no_activerecord),
            ("no_testunit", self.no_testunit),
            ("no_prototype", self.no_prototype),
        ];
        for (name, set) in flags {
            if set {
                raw.insert(name.to_string(), RawValue::Bool(true));
            }
        }
        raw
    }
}

/// Name of the clap argument carrying an option from [`OPTIONS`].
fn arg_id(option: &str) -> &str {
    match option {
        "ruby_interpreter_path" => "ruby",
        "template_source" => "template",
        "show_version" => "version",
        other => other,
    }
}

/// The clap command with short flags, help text and headings taken from
/// the option schema. `show_help` stays on clap's built-in help flag.
pub fn command() -> Command {
    OPTIONS
        .iter()
        .filter(|spec| spec.name != "show_help")
        .fold(Args::command(), |command, spec| {
            let heading = match spec.group {
                OptionGroup::Generator => "Generator options",
                OptionGroup::Runtime => "Runtime options",
            };
            let help = if spec.choices.is_empty() {
                spec.help.to_string()
            } else {
                format!("{} (options: {})", spec.help, spec.choices.join("/"))
            };
            command.mut_arg(arg_id(spec.name), |arg| {
                arg.short(spec.short).help(help).help_heading(heading)
            })
        })
}

/// Parses arguments with the schema-driven [`command`].
pub fn try_parse_from<I, T>(itr: I) -> Result<Args, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(itr)?;
    Args::from_arg_matches(&matches)
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default handling for help, version and other argument errors
pub fn get_args() -> Args {
    match try_parse_from(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

/// Prints what an informational option asked for.
pub fn print_informational(options: &ResolvedOptions) {
    if options.flag("show_help") {
        print_help();
    } else {
        println!("railgen {}", env!("CARGO_PKG_VERSION"));
    }
}

fn print_help() {
    let result = command()
        .help_template(
            r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
        )
        .print_help();
    if let Err(err) = result {
        log::error!("{}", err);
    }
}
