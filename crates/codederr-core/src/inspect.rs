//! Chain inspection: which codes does an error carry?
//!
//! [`is_code`] looks at the outermost error only; [`has_code`] walks the
//! chain of [`WithCode`] causes and stops at the first error of another type.

use std::error::Error;
use std::sync::Arc;

use crate::coder::Coder;
use crate::error::WithCode;
use crate::registry::global;

/// The registered coder for `err`, when `err` itself is a [`WithCode`] whose
/// code is in the global registry. Causes are not searched.
pub fn parse_coder(err: Option<&(dyn Error + 'static)>) -> Option<Arc<dyn Coder>> {
    global().parse_coder(err)
}

/// Whether `err` is a [`WithCode`] whose own code equals `code`.
pub fn is_code(err: Option<&(dyn Error + 'static)>, code: &str) -> bool {
    err.and_then(|e| e.downcast_ref::<WithCode>())
        .map_or(false, |wc| wc.code() == code)
}

/// Whether `code` appears anywhere along `err`'s chain of [`WithCode`] nodes.
pub fn has_code(err: Option<&(dyn Error + 'static)>, code: &str) -> bool {
    let mut current = err.and_then(|e| e.downcast_ref::<WithCode>());
    while let Some(wc) = current {
        if wc.code() == code {
            return true;
        }
        current = wc.cause().and_then(|c| c.downcast_ref::<WithCode>());
    }
    false
}
