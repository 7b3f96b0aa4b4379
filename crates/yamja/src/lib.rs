//! # Yamja - YAML Template Rendering CLI
//!
//! The `yamja` binary is a thin shell over [`yamja_render`]: it reads files,
//! captures environment overrides, and maps errors to exit codes.
//!
//! ## Commands
//!
//! - `yamja render TEMPLATE -m MODEL…` renders one template to stdout or `-o`
//! - `yamja stack` renders a templates directory for every leaf of a
//!   variables tree (see [`stack`])
//!
//! ## Exit Codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | success |
//! | 1 | I/O or usage failure |
//! | 2 | parse error |
//! | 3 | merge conflict |
//! | 4 | unresolved variable |
//! | 5 | type coercion |
//! | 6 | template too deep |
//! | 7 | output serialization failure |

pub mod cli;
pub mod diagnostic;
pub mod env;
pub mod loader;
pub mod logging;
pub mod stack;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context as _, Result};
use yamja_render::{to_json, to_yaml, Context, Renderer};

use crate::cli::{Cli, Command, Format, GlobalOptions, RenderArgs};
use crate::env::EnvReader;
use crate::stack::StackLayout;

/// Runs a parsed command line.
///
/// Rendered output for `render` without `-o` goes to `stdout`. Nothing is
/// written anywhere unless rendering succeeds.
pub fn run(cli: Cli, env: &dyn EnvReader, stdout: &mut dyn Write) -> Result<()> {
    let overrides = capture_overrides(&cli.options, env);
    let renderer = Renderer::new().max_depth(cli.options.max_depth);

    match cli.command {
        Command::Render(args) => render_one(&args, &renderer, &overrides, stdout),
        Command::Stack(args) => {
            let (variables, templates, output) = args.resolved();
            let layout = StackLayout {
                variables,
                templates,
                output,
            };
            let written = stack::run(&layout, &renderer, &overrides)?;
            tracing::info!(files = written, "stack rendered");
            Ok(())
        }
    }
}

fn capture_overrides(options: &GlobalOptions, env: &dyn EnvReader) -> BTreeMap<String, String> {
    if options.no_env {
        return BTreeMap::new();
    }
    let overrides = env::overrides(env, &options.env_prefix);
    tracing::debug!(
        prefix = %options.env_prefix,
        count = overrides.len(),
        "captured environment overrides"
    );
    overrides
}

fn render_one(
    args: &RenderArgs,
    renderer: &Renderer,
    overrides: &BTreeMap<String, String>,
    stdout: &mut dyn Write,
) -> Result<()> {
    let template = loader::load_document(&args.template)?;
    let models = args
        .models
        .iter()
        .map(|path| loader::load_model(path))
        .collect::<Result<Vec<_>>>()?;

    let ctx = Context::builder()
        .models(models)
        .env_overrides(overrides.clone())
        .build()
        .context("merging models")?;

    let label = args.template.display();
    let node = renderer
        .render_document(&template, &ctx)
        .with_context(|| format!("rendering {label}"))?;
    let text = match args.format {
        Format::Yaml => to_yaml(&node),
        Format::Json => to_json(&node),
    }
    .with_context(|| format!("emitting {label}"))?;

    match args.output.as_deref() {
        Some(path) if path != Path::new("-") => {
            fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote");
        }
        _ => {
            stdout
                .write_all(text.as_bytes())
                .context("writing to stdout")?;
        }
    }
    Ok(())
}
