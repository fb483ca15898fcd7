//! `ResultExt`: wrap the error side of a `Result` with a code while it
//! propagates. `Ok` values pass through untouched.
//!
//! ```ignore
//! use codederr_core::ResultExt;
//!
//! let raw = std::fs::read_to_string(path).wrap_code("200001")?;
//! let cfg = parse(&raw).wrap_code_msg("200002", "config is not valid TOML")?;
//! ```

use crate::coder::Params;
use crate::error::{BoxError, WithCode};
use crate::registry::global;

/// Extension trait for annotating any `Result` with a [`WithCode`] node.
pub trait ResultExt<T> {
    /// Wrap the error with `code` and its registered message.
    fn wrap_code(self, code: &str) -> Result<T, WithCode>;

    /// Wrap the error with `code` and an explicit message.
    fn wrap_code_msg(self, code: &str, msg: &str) -> Result<T, WithCode>;

    /// Wrap the error with `code`, its registered message and `params`.
    fn wrap_code_with_params(self, code: &str, params: Params) -> Result<T, WithCode>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn wrap_code(self, code: &str) -> Result<T, WithCode> {
        self.map_err(|e| wrap(e, code, None, &[]))
    }

    fn wrap_code_msg(self, code: &str, msg: &str) -> Result<T, WithCode> {
        self.map_err(|e| wrap(e, code, None, &[msg]))
    }

    fn wrap_code_with_params(self, code: &str, params: Params) -> Result<T, WithCode> {
        self.map_err(|e| wrap(e, code, Some(params), &[]))
    }
}

fn wrap<E: Into<BoxError>>(err: E, code: &str, params: Option<Params>, msgs: &[&str]) -> WithCode {
    let registry = global();
    WithCode::build(
        code,
        registry.resolve_message(code, msgs),
        params,
        Some(err.into()),
    )
}
