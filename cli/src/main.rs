//! codederr CLI: inspect and check coder catalogs from the terminal.
//!
//! # Commands
//! ```text
//! codederr list  --catalog <coders.json> [--json]
//! codederr show  <CODE> --catalog <coders.json> [--json]
//! codederr check --catalog <coders.json>
//! codederr demo  --catalog <coders.json> --code <CODE>... [--no-stack]
//! ```

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, warn};

use codederr_core::{self as errors, Coder, CoderRegistry, ErrCode, Params, RegistryError, WithCode};

mod logging;

use logging::{init_tracing, LogConfig};

#[derive(Parser)]
#[command(
    name = "codederr",
    about = "Inspect coded-error catalogs",
    long_about = "
codederr: list, look up and validate JSON coder catalogs, and render sample
error chains built from them.

ENVIRONMENT VARIABLES:
  CODEDERR_STACK         Set to 0/off/false to disable stack capture
  CODEDERR_STACK_DEPTH   Maximum frames rendered per error (default 32)
",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every coder in a catalog
    List {
        /// Path to the JSON catalog
        #[arg(short, long)]
        catalog: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one coder
    Show {
        /// Code to look up
        code: String,
        /// Path to the JSON catalog
        #[arg(short, long)]
        catalog: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fail when a catalog defines the same code twice
    Check {
        /// Path to the JSON catalog
        #[arg(short, long)]
        catalog: PathBuf,
    },

    /// Build a chain wrapping the given codes in order and render it
    Demo {
        /// Path to the JSON catalog
        #[arg(short, long)]
        catalog: PathBuf,
        /// Codes from innermost to outermost
        #[arg(long = "code", required = true, num_args = 1..)]
        codes: Vec<String>,
        /// Skip stack capture
        #[arg(long)]
        no_stack: bool,
    },
}

/// Serializable view of any coder.
#[derive(Debug, Serialize)]
struct CoderView {
    code: String,
    status: u16,
    message: String,
    full_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Params>,
    #[serde(skip_serializing_if = "String::is_empty")]
    reference: String,
}

impl CoderView {
    fn from_coder(coder: &dyn Coder) -> Self {
        Self {
            code: coder.code().to_string(),
            status: coder.status_code(),
            message: coder.message().to_string(),
            full_message: coder.full_message(),
            params: coder.params().cloned(),
            reference: coder.reference().to_string(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(&LogConfig {
        level: cli.log_level.clone(),
        json: cli.json_logs,
        ..Default::default()
    });

    let result = match cli.command {
        Commands::List { catalog, json } => cmd_list(&catalog, json),
        Commands::Show {
            code,
            catalog,
            json,
        } => cmd_show(&code, &catalog, json),
        Commands::Check { catalog } => cmd_check(&catalog),
        Commands::Demo {
            catalog,
            codes,
            no_stack,
        } => cmd_demo(&catalog, &codes, no_stack),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn load_registry(path: &Path) -> Result<CoderRegistry> {
    let reg = CoderRegistry::new();
    let count = reg
        .load_file(path)
        .with_context(|| format!("loading catalog {}", path.display()))?;
    debug!(count, catalog = %path.display(), "catalog loaded");
    Ok(reg)
}

fn cmd_list(catalog: &Path, json: bool) -> Result<()> {
    let reg = load_registry(catalog)?;
    let views: Vec<CoderView> = reg
        .codes()
        .iter()
        .filter_map(|code| reg.get_coder(code))
        .map(|c| CoderView::from_coder(c.as_ref()))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    println!("{:<12} {:<6} MESSAGE", "CODE", "STATUS");
    for v in &views {
        println!("{:<12} {:<6} {}", v.code, v.status, v.full_message);
    }
    println!("\n{} coder(s)", views.len());
    Ok(())
}

fn cmd_show(code: &str, catalog: &Path, json: bool) -> Result<()> {
    let reg = load_registry(catalog)?;
    let Some(coder) = reg.get_coder(code) else {
        bail!("code {code} is not registered in {}", catalog.display());
    };
    let view = CoderView::from_coder(coder.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Code:         {}", view.code);
    println!("Status:       {}", view.status);
    println!("Message:      {}", view.message);
    if view.full_message != view.message {
        println!("Full message: {}", view.full_message);
    }
    if let Some(params) = &view.params {
        println!("Params:       {}", serde_json::to_string(params)?);
    }
    if !view.reference.is_empty() {
        println!("Reference:    {}", view.reference);
    }
    Ok(())
}

fn cmd_check(catalog: &Path) -> Result<()> {
    let content = std::fs::read_to_string(catalog)
        .with_context(|| format!("reading catalog {}", catalog.display()))?;
    let coders: Vec<ErrCode> = serde_json::from_str(&content)
        .with_context(|| format!("parsing catalog {}", catalog.display()))?;

    let reg = CoderRegistry::new();
    let total = coders.len();
    let mut duplicates = Vec::new();
    for coder in coders {
        match reg.try_register(coder) {
            Ok(()) => {}
            Err(RegistryError::AlreadyExists { code }) => {
                warn!(%code, "duplicate code");
                duplicates.push(code);
            }
            Err(e) => return Err(e.into()),
        }
    }

    if !duplicates.is_empty() {
        for code in &duplicates {
            println!("duplicate: {code}");
        }
        bail!("{} duplicate code(s) in {}", duplicates.len(), catalog.display());
    }
    println!("ok: {total} coder(s), no duplicates");
    Ok(())
}

fn cmd_demo(catalog: &Path, codes: &[String], no_stack: bool) -> Result<()> {
    let count = errors::global()
        .load_file(catalog)
        .with_context(|| format!("loading catalog {}", catalog.display()))?;
    debug!(count, "global registry populated");
    if no_stack {
        errors::set_capturer(Arc::new(errors::NoStack));
    }

    let mut chain: Option<WithCode> = None;
    for code in codes {
        chain = match chain {
            None => Some(errors::new_code(code, &[])),
            Some(inner) => errors::wrap_code(Some(inner), code, &[]),
        };
    }
    let Some(err) = chain else {
        bail!("at least one --code is required");
    };

    println!("Error:   {err}");
    println!("Code:    {}", errors::code(Some(&err)));
    match errors::parse_coder(Some(&err)) {
        Some(coder) => println!("Status:  {}", coder.status_code()),
        None => println!("Status:  (unregistered code)"),
    }
    for code in codes {
        println!(
            "  {code:<12} is_code={:<5} has_code={}",
            errors::is_code(Some(&err), code),
            errors::has_code(Some(&err), code)
        );
    }
    println!("\n{err:#}");
    Ok(())
}
