//! Stack snapshots taken when a [`WithCode`](crate::WithCode) is built.
//!
//! The crate only depends on the [`StackCapturer`] / [`StackTrace`] contract.
//! [`BacktraceCapturer`] is the default implementation, built on
//! `std::backtrace`; swap it process-wide with [`set_capturer`].

use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// An immutable call-stack snapshot.
pub trait StackTrace: Send + Sync {
    /// Write the frames to `out`. In verbose mode each frame is written as
    /// `\n<function>\n\tat <file>:<line>`, otherwise as `\n<function>`.
    fn render(&self, out: &mut dyn fmt::Write, verbose: bool) -> fmt::Result;
}

/// Takes a snapshot of the caller's stack.
pub trait StackCapturer: Send + Sync {
    fn capture(&self) -> Box<dyn StackTrace>;
}

// ─── Configuration ────────────────────────────────────────────────────────────

/// Stack capture settings for [`BacktraceCapturer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    /// Capture stacks at all. Disabled capturers still produce an empty snapshot.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Maximum number of frames rendered per snapshot.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_max_depth() -> usize {
    32
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: default_max_depth(),
        }
    }
}

impl StackConfig {
    /// Defaults overridden by `CODEDERR_STACK` (`0`, `off` or `false` disables
    /// capture) and `CODEDERR_STACK_DEPTH`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(v) = std::env::var("CODEDERR_STACK") {
            config.enabled = !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "off" | "false");
        }
        if let Some(depth) = std::env::var("CODEDERR_STACK_DEPTH")
            .ok()
            .and_then(|v| v.trim().parse().ok())
        {
            config.max_depth = depth;
        }
        config
    }
}

// ─── Capturers ────────────────────────────────────────────────────────────────

/// Default capturer backed by `std::backtrace::Backtrace::force_capture`.
///
/// Symbol resolution is deferred until the snapshot is rendered, so the
/// cost paid at construction is the unwind walk only.
#[derive(Debug, Clone, Default)]
pub struct BacktraceCapturer {
    config: StackConfig,
}

impl BacktraceCapturer {
    pub fn new(config: StackConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }
}

impl StackCapturer for BacktraceCapturer {
    fn capture(&self) -> Box<dyn StackTrace> {
        if !self.config.enabled || self.config.max_depth == 0 {
            return Box::new(EmptyStack);
        }
        Box::new(BacktraceStack {
            backtrace: Backtrace::force_capture(),
            max_depth: self.config.max_depth,
        })
    }
}

/// Capturer that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStack;

impl StackCapturer for NoStack {
    fn capture(&self) -> Box<dyn StackTrace> {
        Box::new(EmptyStack)
    }
}

/// A snapshot with no frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyStack;

impl StackTrace for EmptyStack {
    fn render(&self, _out: &mut dyn fmt::Write, _verbose: bool) -> fmt::Result {
        Ok(())
    }
}

struct BacktraceStack {
    backtrace: Backtrace,
    max_depth: usize,
}

/// One resolved frame parsed from the std backtrace text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    function: String,
    location: Option<String>,
}

/// Function-name prefixes of the capture machinery, dropped from the top of
/// every snapshot.
const INTERNAL_PREFIXES: &[&str] = &[
    "std::backtrace",
    "<std::backtrace",
    "codederr_core::",
    "<codederr_core::",
];

impl BacktraceStack {
    fn frames(&self) -> Vec<Frame> {
        let frames = parse_frames(&self.backtrace.to_string());
        frames
            .into_iter()
            .skip_while(|f| INTERNAL_PREFIXES.iter().any(|p| f.function.starts_with(p)))
            .take(self.max_depth)
            .collect()
    }
}

impl StackTrace for BacktraceStack {
    fn render(&self, out: &mut dyn fmt::Write, verbose: bool) -> fmt::Result {
        for frame in self.frames() {
            write!(out, "\n{}", frame.function)?;
            if verbose {
                if let Some(loc) = &frame.location {
                    write!(out, "\n\tat {loc}")?;
                }
            }
        }
        Ok(())
    }
}

/// Parse the `Display` form of a std backtrace:
///
/// ```text
///    3: app::handler
///              at ./src/handler.rs:42:9
/// ```
fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some(loc) = line.strip_prefix("at ") {
            if let Some(last) = frames.last_mut() {
                if last.location.is_none() {
                    last.location = Some(loc.to_string());
                }
            }
            continue;
        }
        if let Some((index, function)) = line.split_once(": ") {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                frames.push(Frame {
                    function: function.to_string(),
                    location: None,
                });
            }
        }
    }
    frames
}

// ─── Process-wide capturer ────────────────────────────────────────────────────

static CAPTURER: OnceLock<RwLock<Arc<dyn StackCapturer>>> = OnceLock::new();

fn capturer_slot() -> &'static RwLock<Arc<dyn StackCapturer>> {
    CAPTURER.get_or_init(|| {
        let capturer: Arc<dyn StackCapturer> =
            Arc::new(BacktraceCapturer::new(StackConfig::from_env()));
        RwLock::new(capturer)
    })
}

/// Replace the capturer used by every subsequent error construction.
pub fn set_capturer(capturer: Arc<dyn StackCapturer>) {
    let mut slot = capturer_slot()
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    *slot = capturer;
}

/// Take a snapshot with the process-wide capturer.
pub fn capture() -> Box<dyn StackTrace> {
    let capturer = Arc::clone(
        &capturer_slot()
            .read()
            .unwrap_or_else(PoisonError::into_inner),
    );
    capturer.capture()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/library/std/src/backtrace.rs:312:9
   1: codederr_core::stack::capture
             at ./src/stack.rs:10:5
   2: app::handler
             at ./src/handler.rs:42:9
   3: app::main
   4: __libc_start_main
";

    #[test]
    fn parse_reads_functions_and_locations() {
        let frames = parse_frames(SAMPLE);
        assert_eq!(frames.len(), 5);
        assert_eq!(frames[2].function, "app::handler");
        assert_eq!(frames[2].location.as_deref(), Some("./src/handler.rs:42:9"));
        assert_eq!(frames[3].location, None);
    }

    #[test]
    fn parse_ignores_non_frame_lines() {
        assert!(parse_frames("disabled backtrace").is_empty());
        assert!(parse_frames("unsupported backtrace").is_empty());
    }

    #[test]
    fn empty_stack_renders_nothing() {
        let mut out = String::new();
        NoStack.capture().render(&mut out, true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn disabled_config_captures_nothing() {
        let capturer = BacktraceCapturer::new(StackConfig {
            enabled: false,
            max_depth: 32,
        });
        let mut out = String::new();
        capturer.capture().render(&mut out, true).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn render_respects_max_depth() {
        let capturer = BacktraceCapturer::new(StackConfig {
            enabled: true,
            max_depth: 2,
        });
        let mut out = String::new();
        capturer.capture().render(&mut out, false).unwrap();
        assert!(out.lines().filter(|l| !l.is_empty()).count() <= 2, "got: {out}");
    }

    #[test]
    fn config_defaults_from_json() {
        let c: StackConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, StackConfig::default());
        assert!(c.enabled);
        assert_eq!(c.max_depth, 32);
    }
}
