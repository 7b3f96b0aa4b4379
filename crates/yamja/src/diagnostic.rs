//! Exit codes and the one-line error report.

use std::process::ExitCode;

use console::style;
use yamja_render::{ErrorKind, RenderError};

/// Exit code for I/O and usage failures.
pub const EXIT_FAILURE: u8 = 1;

/// Exit code for a render error kind.
pub fn code_for(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Parse => 2,
        ErrorKind::MergeConflict => 3,
        ErrorKind::UnresolvedVariable => 4,
        ErrorKind::TypeCoercion => 5,
        ErrorKind::TemplateTooDeep => 6,
        ErrorKind::Emit => 7,
    }
}

/// Exit code for any error the binary can produce.
///
/// The first [`RenderError`] in the cause chain decides; anything else is a
/// plain failure.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<RenderError>())
        .map(|render| code_for(render.kind()))
        .unwrap_or(EXIT_FAILURE)
}

/// The single diagnostic line, without styling.
pub fn message(err: &anyhow::Error) -> String {
    format!("{err:#}")
}

/// Prints `error: …` to stderr and returns the matching exit code.
pub fn report(err: &anyhow::Error) -> ExitCode {
    eprintln!("{} {}", style("error:").red().bold(), message(err));
    ExitCode::from(exit_code(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context as _;
    use yamja_render::{Context, Path};

    #[test]
    fn test_render_errors_map_to_codes() {
        let err = yamja_render::render_str("a: ${missing}\n", &Context::empty()).unwrap_err();
        let err = anyhow::Error::new(err).context("rendering t.yaml");
        assert_eq!(exit_code(&err), 4);
        assert_eq!(
            message(&err),
            "rendering t.yaml: unresolved variable 'missing' at 1:4"
        );
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            ErrorKind::Parse,
            ErrorKind::MergeConflict,
            ErrorKind::UnresolvedVariable,
            ErrorKind::TypeCoercion,
            ErrorKind::TemplateTooDeep,
            ErrorKind::Emit,
        ]
        .map(code_for);
        assert_eq!(codes, [2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_emit_code_differs_from_io_failure() {
        let err = anyhow::Error::new(RenderError::Emit("unrepresentable value".into()))
            .context("writing out.yaml");
        assert_eq!(exit_code(&err), 7);
        assert_ne!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_other_errors_are_failures() {
        let err = std::fs::read_to_string("/nonexistent/x.yaml")
            .context("reading /nonexistent/x.yaml")
            .unwrap_err();
        assert_eq!(exit_code(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_merge_conflict_code() {
        let err = anyhow::Error::new(RenderError::MergeConflict {
            path: Path::parse("a").unwrap(),
            existing: yamja_render::NodeKind::Mapping,
            incoming: yamja_render::NodeKind::Number,
        });
        assert_eq!(exit_code(&err), 3);
    }
}
