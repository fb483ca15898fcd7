//! Capability accessors: pull a code, message, full message or params out of
//! any error that exposes the matching single-method capability.
//!
//! [`WithCode`] always participates. Error types defined elsewhere implement
//! the capability trait and opt in once with the matching `expose_*`
//! function, which records a downcast probe for the type:
//!
//! ```
//! use codederr_core::capability::{self, ErrorCode};
//!
//! #[derive(Debug)]
//! struct Upstream;
//! impl std::fmt::Display for Upstream {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("upstream failed")
//!     }
//! }
//! impl std::error::Error for Upstream {}
//! impl ErrorCode for Upstream {
//!     fn code(&self) -> &str { "502001" }
//! }
//!
//! capability::expose_code::<Upstream>();
//! assert_eq!(codederr_core::code(Some(&Upstream)), "502001");
//! ```
//!
//! Accessors only look at the outermost error and return `""` / `None`
//! when the error is absent or lacks the capability.

use std::any::TypeId;
use std::error::Error;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::coder::Params;
use crate::error::WithCode;

/// Exposes a machine-readable code.
pub trait ErrorCode {
    fn code(&self) -> &str;
}

/// Exposes the instance message.
pub trait ErrorMessage {
    fn message(&self) -> &str;
}

/// Exposes the message with params applied.
pub trait ErrorFullMessage {
    fn full_message(&self) -> String;
}

/// Exposes message params.
pub trait ErrorParams {
    fn params(&self) -> Option<&Params>;
}

impl ErrorCode for WithCode {
    fn code(&self) -> &str {
        WithCode::code(self)
    }
}

impl ErrorMessage for WithCode {
    fn message(&self) -> &str {
        WithCode::message(self)
    }
}

impl ErrorFullMessage for WithCode {
    fn full_message(&self) -> String {
        WithCode::full_message(self)
    }
}

impl ErrorParams for WithCode {
    fn params(&self) -> Option<&Params> {
        WithCode::params(self)
    }
}

// ─── Probe table ──────────────────────────────────────────────────────────────

type Probe<T> = fn(&(dyn Error + 'static)) -> Option<T>;

#[derive(Default)]
struct Probes {
    code: Vec<(TypeId, Probe<String>)>,
    message: Vec<(TypeId, Probe<String>)>,
    full_message: Vec<(TypeId, Probe<String>)>,
    params: Vec<(TypeId, Probe<Option<Params>>)>,
}

static PROBES: OnceLock<RwLock<Probes>> = OnceLock::new();

fn probes() -> &'static RwLock<Probes> {
    PROBES.get_or_init(|| RwLock::new(Probes::default()))
}

fn add<T>(select: fn(&mut Probes) -> &mut Vec<(TypeId, Probe<T>)>, id: TypeId, probe: Probe<T>) {
    let mut table = probes().write().unwrap_or_else(PoisonError::into_inner);
    let list = select(&mut *table);
    if !list.iter().any(|(known, _)| *known == id) {
        list.push((id, probe));
    }
}

fn run<T>(
    err: &(dyn Error + 'static),
    select: fn(&Probes) -> &Vec<(TypeId, Probe<T>)>,
) -> Option<T> {
    let table = probes().read().unwrap_or_else(PoisonError::into_inner);
    select(&*table).iter().find_map(|(_, probe)| probe(err))
}

fn probe_code<E: Error + ErrorCode + 'static>(err: &(dyn Error + 'static)) -> Option<String> {
    err.downcast_ref::<E>().map(|e| e.code().to_string())
}

fn probe_message<E: Error + ErrorMessage + 'static>(err: &(dyn Error + 'static)) -> Option<String> {
    err.downcast_ref::<E>().map(|e| e.message().to_string())
}

fn probe_full_message<E: Error + ErrorFullMessage + 'static>(
    err: &(dyn Error + 'static),
) -> Option<String> {
    err.downcast_ref::<E>().map(|e| e.full_message())
}

fn probe_params<E: Error + ErrorParams + 'static>(
    err: &(dyn Error + 'static),
) -> Option<Option<Params>> {
    err.downcast_ref::<E>().map(|e| e.params().cloned())
}

/// Let [`code`] read codes from errors of type `E`. Repeat calls are no-ops.
pub fn expose_code<E: Error + ErrorCode + 'static>() {
    add(|p| &mut p.code, TypeId::of::<E>(), probe_code::<E>);
}

/// Let [`message`] read messages from errors of type `E`.
pub fn expose_message<E: Error + ErrorMessage + 'static>() {
    add(|p| &mut p.message, TypeId::of::<E>(), probe_message::<E>);
}

/// Let [`full_message`] read full messages from errors of type `E`.
pub fn expose_full_message<E: Error + ErrorFullMessage + 'static>() {
    add(|p| &mut p.full_message, TypeId::of::<E>(), probe_full_message::<E>);
}

/// Let [`params`] read params from errors of type `E`.
pub fn expose_params<E: Error + ErrorParams + 'static>() {
    add(|p| &mut p.params, TypeId::of::<E>(), probe_params::<E>);
}

// ─── Accessors ────────────────────────────────────────────────────────────────

/// The code of `err`, or `""` when absent or not exposed.
pub fn code(err: Option<&(dyn Error + 'static)>) -> String {
    let Some(err) = err else {
        return String::new();
    };
    if let Some(wc) = err.downcast_ref::<WithCode>() {
        return wc.code().to_string();
    }
    run(err, |p| &p.code).unwrap_or_default()
}

/// The message of `err`, or `""` when absent or not exposed.
pub fn message(err: Option<&(dyn Error + 'static)>) -> String {
    let Some(err) = err else {
        return String::new();
    };
    if let Some(wc) = err.downcast_ref::<WithCode>() {
        return wc.message().to_string();
    }
    run(err, |p| &p.message).unwrap_or_default()
}

/// The full message of `err`, or `""` when absent or not exposed.
pub fn full_message(err: Option<&(dyn Error + 'static)>) -> String {
    let Some(err) = err else {
        return String::new();
    };
    if let Some(wc) = err.downcast_ref::<WithCode>() {
        return wc.full_message();
    }
    run(err, |p| &p.full_message).unwrap_or_default()
}

/// The params of `err`, or `None` when absent or not exposed.
pub fn params(err: Option<&(dyn Error + 'static)>) -> Option<Params> {
    let err = err?;
    if let Some(wc) = err.downcast_ref::<WithCode>() {
        return wc.params().cloned();
    }
    run(err, |p| &p.params).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::CoderRegistry;
    use serde_json::json;
    use std::fmt;
    use std::io;

    #[derive(Debug)]
    struct Gateway {
        params: Params,
    }

    impl fmt::Display for Gateway {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("gateway timeout")
        }
    }

    impl Error for Gateway {}

    impl ErrorCode for Gateway {
        fn code(&self) -> &str {
            "504001"
        }
    }

    impl ErrorMessage for Gateway {
        fn message(&self) -> &str {
            "upstream {host} timed out"
        }
    }

    impl ErrorParams for Gateway {
        fn params(&self) -> Option<&Params> {
            Some(&self.params)
        }
    }

    // Never exposed.
    #[derive(Debug)]
    struct Hidden;

    impl fmt::Display for Hidden {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("hidden")
        }
    }

    impl Error for Hidden {}

    impl ErrorCode for Hidden {
        fn code(&self) -> &str {
            "hidden"
        }
    }

    fn gateway() -> Gateway {
        let mut params = Params::new();
        params.insert("host".into(), json!("db-1"));
        Gateway { params }
    }

    #[test]
    fn none_yields_zero_values() {
        assert_eq!(code(None), "");
        assert_eq!(message(None), "");
        assert_eq!(full_message(None), "");
        assert!(params(None).is_none());
    }

    #[test]
    fn with_code_always_participates() {
        let reg = CoderRegistry::new();
        let mut p = Params::new();
        p.insert("n".into(), json!(3));
        let err = reg.new_code_with_params("400009", p, &["retry {n} times"]);
        let e: &(dyn Error + 'static) = &err;

        assert_eq!(code(Some(e)), "400009");
        assert_eq!(message(Some(e)), "retry {n} times");
        assert_eq!(full_message(Some(e)), "retry 3 times");
        assert_eq!(params(Some(e)).unwrap()["n"], json!(3));
    }

    #[test]
    fn exposed_foreign_type_participates() {
        expose_code::<Gateway>();
        expose_message::<Gateway>();
        expose_params::<Gateway>();
        expose_code::<Gateway>();

        let err = gateway();
        assert_eq!(code(Some(&err)), "504001");
        assert_eq!(message(Some(&err)), "upstream {host} timed out");
        assert_eq!(params(Some(&err)).unwrap()["host"], json!("db-1"));
        // ErrorFullMessage is not implemented for Gateway.
        assert_eq!(full_message(Some(&err)), "");
    }

    #[test]
    fn unexposed_types_yield_zero_values() {
        assert_eq!(code(Some(&Hidden)), "");
        let io_err = io::Error::new(io::ErrorKind::Other, "disk");
        assert_eq!(code(Some(&io_err)), "");
        assert_eq!(message(Some(&io_err)), "");
        assert!(params(Some(&io_err)).is_none());
    }

    #[test]
    fn accessors_do_not_descend_into_causes() {
        let reg = CoderRegistry::new();
        let inner = reg.new_code("C1", &["inner"]);
        let outer = io::Error::new(io::ErrorKind::Other, inner);
        assert_eq!(code(Some(&outer)), "");
        assert_eq!(message(Some(&outer)), "");
    }
}
