//! Values derived from the options and the environment for use in templates.
//!
//! Each value is computed the first time something asks for it and cached for
//! the rest of the invocation, so every template sees the same application
//! name, secret and socket path.

use log::{debug, error};
use minijinja::value::{Enumerator, Object, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::error::{Error, Result};
use crate::options::{ResolvedOptions, FALLBACK_RUBY};

/// Number of random bytes behind the secret token.
pub const SECRET_BYTES: usize = 64;

/// Places a MySQL server commonly puts its socket, most likely first.
pub const MYSQL_SOCKET_CANDIDATES: [&str; 9] = [
    "/tmp/mysql.sock",                       // default
    "/var/run/mysqld/mysqld.sock",           // debian/gentoo
    "/var/tmp/mysql.sock",                   // freebsd
    "/var/lib/mysql/mysql.sock",             // fedora
    "/opt/local/lib/mysql/mysql.sock",       // fedora
    "/opt/local/var/run/mysqld/mysqld.sock", // mac + darwinports + mysql
    "/opt/local/var/run/mysql4/mysqld.sock", // mac + darwinports + mysql4
    "/opt/local/var/run/mysql5/mysqld.sock", // mac + darwinports + mysql5
    "/opt/lampp/var/mysql/mysql.sock",       // xampp for linux
];

const TEMPLATE_KEYS: &[&str] = &[
    "app_name",
    "app_secret",
    "shebang",
    "db_socket",
    "database",
    "freeze",
];

#[derive(Debug, Clone)]
struct ContextState {
    root: PathBuf,
    options: ResolvedOptions,
    socket_candidates: Vec<PathBuf>,
    app_name: OnceLock<String>,
    secret: OnceLock<String>,
    shebang: OnceLock<String>,
    db_socket: OnceLock<Option<PathBuf>>,
}

/// Per-invocation cache of derived values. Cloning shares the cache.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    state: Arc<ContextState>,
}

impl TemplateContext {
    /// Creates a context for an absolute application root.
    ///
    /// # Errors
    /// * `Error::InvalidTarget` if the root has no final path segment
    pub fn new<P: AsRef<Path>>(root: P, options: ResolvedOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if root.file_name().is_none() {
            return Err(Error::InvalidTarget {
                path: root,
                reason: "cannot derive an application name from it".to_string(),
            });
        }

        Ok(Self {
            state: Arc::new(ContextState {
                root,
                options,
                socket_candidates: MYSQL_SOCKET_CANDIDATES.iter().map(PathBuf::from).collect(),
                app_name: OnceLock::new(),
                secret: OnceLock::new(),
                shebang: OnceLock::new(),
                db_socket: OnceLock::new(),
            }),
        })
    }

    /// Pins the secret token instead of drawing it from the OS.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let state = Arc::make_mut(&mut self.state);
        state.secret = OnceLock::from(secret.into());
        self
    }

    /// Replaces the list of socket locations probed for MySQL.
    pub fn with_socket_candidates<I, P>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let state = Arc::make_mut(&mut self.state);
        state.socket_candidates = candidates.into_iter().map(Into::into).collect();
        state.db_socket = OnceLock::new();
        self
    }

    pub fn root(&self) -> &Path {
        &self.state.root
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.state.options
    }

    /// Final path segment of the application root.
    pub fn app_name(&self) -> &str {
        self.state.app_name.get_or_init(|| {
            self.state
                .root
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
    }

    /// 128 hex characters of OS randomness, generated once per invocation.
    ///
    /// # Errors
    /// * `Error::Entropy` if the OS random source fails
    pub fn secret_token(&self) -> Result<&str> {
        if let Some(secret) = self.state.secret.get() {
            return Ok(secret);
        }
        let secret = generate_secret()?;
        debug!("Generated application secret");
        Ok(self.state.secret.get_or_init(|| secret))
    }

    /// Interpreter directive for generated executables.
    pub fn shebang_line(&self) -> &str {
        self.state.shebang.get_or_init(|| {
            let interpreter = self
                .state
                .options
                .ruby_interpreter_path()
                .unwrap_or(FALLBACK_RUBY);
            format!("#!{}", interpreter)
        })
    }

    /// First existing MySQL socket, if the database is MySQL and one is found.
    pub fn db_socket_path(&self) -> Option<&Path> {
        self.state
            .db_socket
            .get_or_init(|| {
                if cfg!(windows) || !self.state.options.database().starts_with("mysql") {
                    return None;
                }
                let found = self
                    .state
                    .socket_candidates
                    .iter()
                    .find(|candidate| candidate.exists())
                    .cloned();
                debug!("MySQL socket lookup: {:?}", found);
                found
            })
            .as_deref()
    }

    /// Wraps the context as a lazily evaluated template value.
    pub fn to_value(&self) -> Value {
        Value::from_object(self.clone())
    }
}

impl Object for TemplateContext {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        match key.as_str()? {
            "app_name" => Some(Value::from(self.app_name())),
            "app_secret" => match self.secret_token() {
                Ok(secret) => Some(Value::from(secret)),
                Err(err) => {
                    error!("{}", err);
                    None
                }
            },
            "shebang" => Some(Value::from(self.shebang_line())),
            "db_socket" => Some(match self.db_socket_path() {
                Some(path) => Value::from(path.display().to_string()),
                None => Value::from(()),
            }),
            "database" => Some(Value::from(self.options().database())),
            "freeze" => Some(Value::from(self.options().freeze())),
            _ => None,
        }
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(TEMPLATE_KEYS)
    }
}

fn generate_secret() -> Result<String> {
    let mut bytes = [0u8; SECRET_BYTES];
    getrandom::fill(&mut bytes).map_err(|e| Error::Entropy(e.to_string()))?;
    Ok(hex::encode(bytes))
}
