//! codederr-core: coded errors with causal chains.
//!
//! This crate defines:
//! - [`Coder`] / [`ErrCode`]: metadata for one error class (code, status,
//!   message, params, reference)
//! - [`CoderRegistry`]: the code → coder catalog, with a process-wide
//!   instance behind [`register`], [`must_register`] and [`get_coder`]
//! - [`WithCode`]: the error value: code, message, params, cause and a stack
//!   snapshot, built with [`new_code`] / [`wrap_code`] and friends
//! - chain inspection ([`parse_coder`], [`is_code`], [`has_code`]) and
//!   capability accessors ([`code`], [`message`], [`full_message`],
//!   [`params`]) that work on any `dyn Error`
//!
//! # Quick Start
//!
//! ```rust
//! use codederr_core::{self as errors, ErrCode};
//!
//! errors::register(ErrCode::new("100001", 400, "invalid params"));
//!
//! let err = errors::new_code("100001", &[]);
//! assert_eq!(errors::message(Some(&err)), "invalid params");
//! assert_eq!(errors::parse_coder(Some(&err)).unwrap().status_code(), 400);
//!
//! let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "users.db");
//! let wrapped = errors::wrap_code(Some(io_err), "100001", &["open store"]).unwrap();
//! assert_eq!(wrapped.to_string(), "100001 - open store: users.db");
//! println!("{wrapped:#}"); // causes first, each followed by its stack
//! ```

pub mod capability;
pub mod coder;
pub mod error;
pub mod ext;
pub mod inspect;
pub mod registry;
pub mod stack;

pub use capability::{code, full_message, message, params};
pub use coder::{render_message, Coder, ErrCode, Params};
pub use error::{new_code, new_code_with_params, wrap_code, wrap_code_with_params, BoxError, WithCode};
pub use ext::ResultExt;
pub use inspect::{has_code, is_code, parse_coder};
pub use registry::{get_coder, global, must_register, register, CoderRegistry, RegistryError};
pub use stack::{set_capturer, BacktraceCapturer, NoStack, StackCapturer, StackConfig, StackTrace};
