//! `WithCode`: an error carrying a code, a message, optional params, an
//! optional cause and the stack captured where it was built.

use std::error::Error;
use std::fmt;

use crate::coder::{render_message, Params};
use crate::registry::global;
use crate::stack::{self, StackTrace};

/// Boxed error used for causes.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// One node of a causal chain.
///
/// Immutable once built. Formatting:
///
/// - `{}`: `"<code> - <message>"`, followed by `": <cause>"` when wrapped,
///   so the whole chain reads outermost first on one line.
/// - `{:#}`: verbose: the cause's verbose form first (deepest cause at the
///   top), then `"<code> - <message>"` and this node's stack frames.
pub struct WithCode {
    code: String,
    message: String,
    params: Option<Params>,
    cause: Option<BoxError>,
    stack: Box<dyn StackTrace>,
}

impl WithCode {
    /// Build a node, capturing the stack with the process-wide capturer.
    pub(crate) fn build(
        code: &str,
        message: String,
        params: Option<Params>,
        cause: Option<BoxError>,
    ) -> Self {
        Self {
            code: code.to_string(),
            message,
            params,
            cause,
            stack: stack::capture(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    /// The message with this error's own params applied.
    pub fn full_message(&self) -> String {
        render_message(&self.message, self.params.as_ref())
    }

    /// The wrapped error, if any.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    pub fn stack(&self) -> &dyn StackTrace {
        self.stack.as_ref()
    }

    fn fmt_verbose(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(cause) = &self.cause {
            match cause.downcast_ref::<WithCode>() {
                Some(inner) => inner.fmt_verbose(f)?,
                None => write!(f, "{cause}")?,
            }
            f.write_str("\n")?;
        }
        write!(f, "{} - {}", self.code, self.message)?;
        self.stack.render(f, true)
    }
}

impl fmt::Display for WithCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return self.fmt_verbose(f);
        }
        write!(f, "{} - {}", self.code, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for WithCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("WithCode");
        d.field("code", &self.code);
        d.field("message", &self.message);
        if self.params.is_some() {
            d.field("params", &self.params);
        }
        if let Some(cause) = &self.cause {
            d.field("cause", &cause.to_string());
        }
        d.field("stack", &"<captured>");
        d.finish()
    }
}

impl Error for WithCode {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn Error + 'static))
    }
}

// ─── Construction against the global registry ────────────────────────────────

/// Create an error with `code`, capturing the stack.
///
/// The message is `msgs[0]` when given, otherwise the message registered
/// for `code` in the global registry, otherwise empty.
pub fn new_code(code: &str, msgs: &[&str]) -> WithCode {
    global().new_code(code, msgs)
}

/// Like [`new_code`], with `params` attached.
pub fn new_code_with_params(code: &str, params: Params, msgs: &[&str]) -> WithCode {
    global().new_code_with_params(code, params, msgs)
}

/// Wrap `err` as the cause of a new error with `code`.
/// Returns `None` when `err` is `None`.
pub fn wrap_code<E>(err: Option<E>, code: &str, msgs: &[&str]) -> Option<WithCode>
where
    E: Into<BoxError>,
{
    global().wrap_code(err, code, msgs)
}

/// Like [`wrap_code`], with `params` attached.
pub fn wrap_code_with_params<E>(
    err: Option<E>,
    code: &str,
    params: Params,
    msgs: &[&str],
) -> Option<WithCode>
where
    E: Into<BoxError>,
{
    global().wrap_code_with_params(err, code, params, msgs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coder::ErrCode;
    use crate::registry::CoderRegistry;
    use serde_json::json;
    use std::io;

    fn chain(reg: &CoderRegistry) -> WithCode {
        let c = reg.new_code("C1", &["msgC"]);
        let b = reg.wrap_code(Some(c), "B1", &["msgB"]).unwrap();
        reg.wrap_code(Some(b), "A1", &["msgA"]).unwrap()
    }

    #[test]
    fn display_lists_chain_outermost_first() {
        let reg = CoderRegistry::new();
        let a = chain(&reg);
        assert_eq!(a.to_string(), "A1 - msgA: B1 - msgB: C1 - msgC");
    }

    #[test]
    fn display_with_foreign_cause() {
        let reg = CoderRegistry::new();
        let io_err = io::Error::new(io::ErrorKind::NotFound, "config.toml missing");
        let err = reg.wrap_code(Some(io_err), "200001", &["load config"]).unwrap();
        assert_eq!(err.to_string(), "200001 - load config: config.toml missing");
    }

    #[test]
    fn verbose_orders_deepest_first() {
        let reg = CoderRegistry::new();
        let out = format!("{:#}", chain(&reg));
        let c = out.find("C1 - msgC").unwrap();
        let b = out.find("B1 - msgB").unwrap();
        let a = out.find("A1 - msgA").unwrap();
        assert!(c < b && b < a, "unexpected order:\n{out}");
    }

    #[test]
    fn verbose_with_foreign_root() {
        let reg = CoderRegistry::new();
        let err = reg.wrap_code(Some("socket closed"), "300001", &["send"]).unwrap();
        let out = format!("{err:#}");
        assert!(out.starts_with("socket closed\n300001 - send"), "got:\n{out}");
    }

    #[test]
    fn message_defaults_to_registered() {
        let reg = CoderRegistry::new();
        reg.register(ErrCode::new("100001", 400, "invalid params"));
        assert_eq!(reg.new_code("100001", &[]).message(), "invalid params");
        assert_eq!(reg.new_code("100001", &["custom"]).message(), "custom");
        assert_eq!(reg.new_code("999999", &[]).message(), "");
    }

    #[test]
    fn wrap_none_is_none() {
        let reg = CoderRegistry::new();
        assert!(reg.wrap_code(None::<io::Error>, "A1", &[]).is_none());
        assert!(reg
            .wrap_code_with_params(None::<BoxError>, "A1", Params::new(), &[])
            .is_none());
    }

    #[test]
    fn params_and_full_message() {
        let reg = CoderRegistry::new();
        let mut p = Params::new();
        p.insert("user".into(), json!("alice"));
        let err = reg.new_code_with_params("100003", p, &["user {user} not found"]);
        assert_eq!(err.params().unwrap()["user"], json!("alice"));
        assert_eq!(err.message(), "user {user} not found");
        assert_eq!(err.full_message(), "user alice not found");
    }

    #[test]
    fn source_is_cause() {
        let reg = CoderRegistry::new();
        let a = chain(&reg);
        let b = a.source().unwrap().downcast_ref::<WithCode>().unwrap();
        assert_eq!(b.code(), "B1");
        let c = b.source().unwrap().downcast_ref::<WithCode>().unwrap();
        assert_eq!(c.code(), "C1");
        assert!(c.source().is_none());
        assert!(c.cause().is_none());
    }

    #[test]
    fn debug_elides_stack() {
        let reg = CoderRegistry::new();
        let s = format!("{:?}", reg.new_code("1", &["m"]));
        assert!(s.contains("code: \"1\""), "got: {s}");
        assert!(s.contains("<captured>"));
    }

    #[test]
    fn send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WithCode>();
    }
}
