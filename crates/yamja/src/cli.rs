//! Command-line structure using clap.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use yamja_render::DEFAULT_MAX_DEPTH;

/// Environment variable holding the override prefix.
pub const ENV_PREFIX_VAR: &str = "YAMJA_ENV_PREFIX";
/// Environment variable holding the nesting limit.
pub const MAX_DEPTH_VAR: &str = "YAMJA_MAX_DEPTH";

#[derive(Debug, Parser)]
#[command(name = "yamja")]
#[command(version, about = "Render YAML templates from layered YAML variables", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub options: GlobalOptions,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct GlobalOptions {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only environment variables with this prefix become overrides
    #[arg(long, global = true, env = ENV_PREFIX_VAR, default_value = "YAMJA_")]
    pub env_prefix: String,

    /// Ignore environment overrides entirely
    #[arg(long, global = true)]
    pub no_env: bool,

    /// Deepest template nesting allowed
    #[arg(long, global = true, env = MAX_DEPTH_VAR, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render one template against a list of models
    Render(RenderArgs),

    /// Render a templates directory for every leaf of a variables tree
    Stack(StackArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Template file, or - for stdin
    pub template: PathBuf,

    /// Model file; repeat to layer, most specific first
    #[arg(short, long = "model", value_name = "MODEL")]
    pub models: Vec<PathBuf>,

    /// Output file, or - for stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
    pub format: Format,
}

#[derive(Debug, Clone, Args)]
pub struct StackArgs {
    /// Base directory the other three are relative to
    #[arg(short, long)]
    pub base: Option<PathBuf>,

    /// Variables directory tree
    #[arg(long, default_value = "vars")]
    pub variables: PathBuf,

    /// Templates directory
    #[arg(short = 'p', long, default_value = "templates")]
    pub templates: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,
}

impl StackArgs {
    /// Directories with `--base` applied: (variables, templates, output).
    pub fn resolved(&self) -> (PathBuf, PathBuf, PathBuf) {
        match &self.base {
            Some(base) => (
                base.join(&self.variables),
                base.join(&self.templates),
                base.join(&self.output),
            ),
            None => (
                self.variables.clone(),
                self.templates.clone(),
                self.output.clone(),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Yaml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("yamja").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    #[serial]
    fn test_render_args() {
        let cli = parse(&["render", "t.yaml", "-m", "a.yaml", "--model", "b.yaml", "-f", "json"]);
        let Command::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.template, PathBuf::from("t.yaml"));
        assert_eq!(args.models, [PathBuf::from("a.yaml"), PathBuf::from("b.yaml")]);
        assert_eq!(args.format, Format::Json);
        assert_eq!(args.output, None);
    }

    #[test]
    #[serial]
    fn test_global_defaults() {
        std::env::remove_var(ENV_PREFIX_VAR);
        std::env::remove_var(MAX_DEPTH_VAR);
        let cli = parse(&["render", "-"]);
        assert_eq!(cli.options.env_prefix, "YAMJA_");
        assert_eq!(cli.options.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!cli.options.no_env);
        assert_eq!(cli.options.verbose, 0);
    }

    #[test]
    #[serial]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["stack", "-vv", "--no-env", "--max-depth", "4"]);
        assert_eq!(cli.options.verbose, 2);
        assert!(cli.options.no_env);
        assert_eq!(cli.options.max_depth, 4);
    }

    #[test]
    #[serial]
    fn test_max_depth_from_env() {
        std::env::set_var(MAX_DEPTH_VAR, "9");
        let cli = parse(&["render", "t.yaml"]);
        std::env::remove_var(MAX_DEPTH_VAR);
        assert_eq!(cli.options.max_depth, 9);
    }

    #[test]
    #[serial]
    fn test_stack_defaults_and_base() {
        let cli = parse(&["stack", "-b", "/srv"]);
        let Command::Stack(args) = cli.command else {
            panic!("expected stack");
        };
        assert_eq!(
            args.resolved(),
            (
                PathBuf::from("/srv/vars"),
                PathBuf::from("/srv/templates"),
                PathBuf::from("/srv/output"),
            )
        );
    }
}
