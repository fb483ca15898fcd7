//! Coder registry: maps code strings to their [`Coder`] metadata.
//!
//! [`CoderRegistry`] can be instantiated for isolated use (tests, embedded
//! catalogs). [`global()`] is the process-wide instance used by the free
//! functions of this crate; it starts empty and is only filled by explicit
//! registration.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::debug;

use crate::coder::{Coder, ErrCode, Params};
use crate::error::{BoxError, WithCode};

/// Errors from registry operations that are recoverable by the caller.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("code: {code} already exist")]
    AlreadyExists { code: String },

    #[error("Invalid coder catalog: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Thread-safe code → coder map.
pub struct CoderRegistry {
    codes: RwLock<HashMap<String, Arc<dyn Coder>>>,
}

impl CoderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            codes: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<dyn Coder>>> {
        self.codes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<dyn Coder>>> {
        self.codes.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a coder, overwriting any existing entry for its code.
    pub fn register<C: Coder + 'static>(&self, coder: C) {
        self.register_arc(Arc::new(coder));
    }

    /// Register an already shared coder, overwriting any existing entry.
    pub fn register_arc(&self, coder: Arc<dyn Coder>) {
        let code = coder.code().to_string();
        if self.write().insert(code.clone(), coder).is_some() {
            debug!(%code, "coder overwritten");
        } else {
            debug!(%code, "coder registered");
        }
    }

    /// Register a coder, refusing to replace an existing entry.
    pub fn try_register<C: Coder + 'static>(&self, coder: C) -> Result<(), RegistryError> {
        let mut codes = self.write();
        if codes.contains_key(coder.code()) {
            return Err(RegistryError::AlreadyExists {
                code: coder.code().to_string(),
            });
        }
        let code = coder.code().to_string();
        codes.insert(code.clone(), Arc::new(coder));
        debug!(%code, "coder registered");
        Ok(())
    }

    /// Register a coder at startup.
    ///
    /// # Panics
    ///
    /// Panics with `code: <code> already exist` when the code is already
    /// registered. A duplicate code is a programming error.
    pub fn must_register<C: Coder + 'static>(&self, coder: C) {
        if let Err(e) = self.try_register(coder) {
            panic!("{e}");
        }
    }

    /// Look up the coder for `code`.
    pub fn get_coder(&self, code: &str) -> Option<Arc<dyn Coder>> {
        self.read().get(code).cloned()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.read().contains_key(code)
    }

    /// Number of registered codes.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All registered codes, sorted.
    pub fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.read().keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Load coders from a JSON array of [`ErrCode`] objects.
    /// Entries overwrite existing codes, as with [`register`](Self::register).
    pub fn load_json(&self, json: &str) -> Result<usize, RegistryError> {
        let coders: Vec<ErrCode> = serde_json::from_str(json)?;
        let count = coders.len();
        for coder in coders {
            self.register(coder);
        }
        debug!(count, "coder catalog loaded");
        Ok(count)
    }

    /// Load a JSON catalog file. See [`load_json`](Self::load_json).
    pub fn load_file(&self, path: &Path) -> Result<usize, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        self.load_json(&content)
    }

    // ─── Construction against this registry ───────────────────────────────────

    /// The instance message: the first of `msgs` when given, otherwise the
    /// registered message for `code`, otherwise empty.
    pub(crate) fn resolve_message(&self, code: &str, msgs: &[&str]) -> String {
        match msgs.first() {
            Some(msg) => (*msg).to_string(),
            None => self
                .get_coder(code)
                .map(|c| c.message().to_string())
                .unwrap_or_default(),
        }
    }

    /// Create a root error with `code`. See [`new_code`](crate::new_code).
    pub fn new_code(&self, code: &str, msgs: &[&str]) -> WithCode {
        WithCode::build(code, self.resolve_message(code, msgs), None, None)
    }

    /// Create a root error with `code` and `params`.
    pub fn new_code_with_params(&self, code: &str, params: Params, msgs: &[&str]) -> WithCode {
        WithCode::build(code, self.resolve_message(code, msgs), Some(params), None)
    }

    /// Wrap `err` with `code`; `None` stays `None`.
    pub fn wrap_code<E>(&self, err: Option<E>, code: &str, msgs: &[&str]) -> Option<WithCode>
    where
        E: Into<BoxError>,
    {
        let cause = err?.into();
        Some(WithCode::build(
            code,
            self.resolve_message(code, msgs),
            None,
            Some(cause),
        ))
    }

    /// Wrap `err` with `code` and `params`; `None` stays `None`.
    pub fn wrap_code_with_params<E>(
        &self,
        err: Option<E>,
        code: &str,
        params: Params,
        msgs: &[&str],
    ) -> Option<WithCode>
    where
        E: Into<BoxError>,
    {
        let cause = err?.into();
        Some(WithCode::build(
            code,
            self.resolve_message(code, msgs),
            Some(params),
            Some(cause),
        ))
    }

    /// The coder for `err`'s own code, when `err` is a [`WithCode`] and its
    /// code is registered here. The cause chain is not searched.
    pub fn parse_coder(
        &self,
        err: Option<&(dyn std::error::Error + 'static)>,
    ) -> Option<Arc<dyn Coder>> {
        let wc = err?.downcast_ref::<WithCode>()?;
        self.get_coder(wc.code())
    }
}

impl Default for CoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoderRegistry")
            .field("codes", &self.codes())
            .finish()
    }
}

// ─── Process-wide registry ────────────────────────────────────────────────────

static GLOBAL: OnceLock<CoderRegistry> = OnceLock::new();

/// The process-wide registry.
pub fn global() -> &'static CoderRegistry {
    GLOBAL.get_or_init(CoderRegistry::new)
}

/// Register a user-defined coder in the global registry, overwriting any
/// existing entry for the same code.
pub fn register<C: Coder + 'static>(coder: C) {
    global().register(coder);
}

/// Register a user-defined coder in the global registry.
///
/// # Panics
///
/// Panics when the code is already registered.
pub fn must_register<C: Coder + 'static>(coder: C) {
    global().must_register(coder);
}

/// Look up a coder in the global registry.
pub fn get_coder(code: &str) -> Option<Arc<dyn Coder>> {
    global().get_coder(code)
}
