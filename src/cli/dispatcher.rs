// src/cli/dispatcher.rs

use crate::core::directive::{self, DirectiveKind};
use crate::core::shebang;
use crate::core::version_resolver::ResolveError;
use crate::models::VersionSpec;
use crate::state::LaunchContext;
use crate::system::executor::{CommandLine, LaunchError};
use std::path::Path;

/// What the launcher is about to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub command_line: CommandLine,
    /// Print the launcher's own usage before the runtime's help.
    pub show_help: bool,
}

impl Plan {
    fn run(command_line: CommandLine) -> Self {
        Self {
            command_line,
            show_help: false,
        }
    }
}

/// Decides which command line to run for the launcher's arguments.
///
/// 1. A first argument that does not start with `-` is treated as a script: if its
///    first line is a directive, that directive decides the command.
/// 2. A first argument of the form `-M`, `-M.m` or `-M.m-32/64` selects a runtime and
///    is dropped from the arguments.
/// 3. Otherwise the default runtime gets all arguments unchanged.
///
/// # Errors
/// A virtual command not naming `python`, an unresolvable version, or an unquotable
/// argument.
pub fn plan(args: &[String], context: &LaunchContext) -> Result<Plan, LaunchError> {
    if let Some(first) = args.first() {
        if first.starts_with('-') {
            if let Some(spec) = version_flag(first) {
                let record = context.resolve(&spec)?;
                let rest = args.get(1..).unwrap_or_default();
                let command_line = CommandLine::assemble(&record.command_form(), None, rest)?;
                return Ok(Plan::run(command_line));
            }
        } else if let Some(command_line) = from_script(first, args, context)? {
            return Ok(Plan::run(command_line));
        }
    }

    let record = context.resolve(&VersionSpec::any())?;
    let show_help = matches!(args, [only] if is_help_flag(only));
    Ok(Plan {
        command_line: CommandLine::assemble(&record.command_form(), None, args)?,
        show_help,
    })
}

/// Parses `-3`, `-3.11`, `-3.11-32` into a spec. Anything else is an interpreter
/// option and yields `None`.
fn version_flag(arg: &str) -> Option<VersionSpec> {
    arg.strip_prefix('-')
        .filter(|text| !text.is_empty())
        .and_then(VersionSpec::parse)
}

fn is_help_flag(arg: &str) -> bool {
    arg.eq_ignore_ascii_case("-h") || arg.eq_ignore_ascii_case("--help")
}

fn from_script(
    script: &str,
    args: &[String],
    context: &LaunchContext,
) -> Result<Option<CommandLine>, LaunchError> {
    let Some(line) = shebang::decode_head(Path::new(script)) else {
        return Ok(None);
    };
    let Some(directive) = directive::interpret(&line.text, context.config().aliases()) else {
        log::debug!("'{}' has no directive line", script);
        return Ok(None);
    };
    log::debug!("Directive in '{}': {:?}", script, directive);

    let command_line = match directive.kind {
        DirectiveKind::Virtual => {
            let (requested, suffix) = directive.virtual_target()?;
            let spec = VersionSpec::parse(&requested)
                .ok_or_else(|| ResolveError::NotFound(requested.clone()))?;
            let record = context.resolve(&spec)?;
            CommandLine::assemble(&record.command_form(), suffix.as_deref(), args)?
        }
        DirectiveKind::Alias | DirectiveKind::Literal => {
            CommandLine::assemble(&directive.command, directive.suffix.as_deref(), args)?
        }
    };
    Ok(Some(command_line))
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Catalog;
    use crate::core::config_store::ConfigStore;
    use crate::core::ini::IniFile;
    use crate::models::{Bitness, LaunchMode, RuntimeRecord};
    use std::fs;
    use tempfile::TempDir;

    fn context(ini: Option<&str>, versions: &[&str]) -> LaunchContext {
        let records = versions.iter().map(|v| {
            RuntimeRecord::new(v, Bitness::Bits64, format!("/opt/py{v}/bin/python").into()).unwrap()
        });
        LaunchContext::with_catalog(
            LaunchMode::Console,
            ConfigStore::from_sources(Vec::new(), ini.map(IniFile::parse), None),
            Catalog::from_records(records),
        )
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn script(dir: &TempDir, first_line: &str) -> String {
        let path = dir.path().join("script.py");
        fs::write(&path, format!("{first_line}\nprint('hi')\n")).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_version_flag_selects_runtime_and_is_dropped() {
        let ctx = context(None, &["2.7", "3.11"]);
        let plan = plan(&args(&["-3", "-c", "pass"]), &ctx).unwrap();
        assert_eq!(plan.command_line.as_str(), "/opt/py3.11/bin/python -c pass");
        assert!(!plan.show_help);
    }

    #[test]
    fn test_interpreter_options_go_to_default_runtime() {
        let ctx = context(None, &["2.7", "3.11"]);
        let plan = plan(&args(&["-c", "pass"]), &ctx).unwrap();
        assert_eq!(plan.command_line.as_str(), "/opt/py2.7/bin/python -c pass");
    }

    #[test]
    fn test_no_arguments_runs_default_runtime() {
        let ctx = context(Some("[defaults]\npython=3\n"), &["2.7", "3.11"]);
        let plan = plan(&[], &ctx).unwrap();
        assert_eq!(plan.command_line.as_str(), "/opt/py3.11/bin/python");
    }

    #[test]
    fn test_help_flag_alone_shows_banner() {
        let ctx = context(None, &["3.11"]);
        let help = plan(&args(&["--HELP"]), &ctx).unwrap();
        assert!(help.show_help);
        assert_eq!(help.command_line.as_str(), "/opt/py3.11/bin/python --HELP");

        let not_alone = plan(&args(&["-h", "x"]), &ctx).unwrap();
        assert!(!not_alone.show_help);
    }

    #[test]
    fn test_script_without_directive_uses_default() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "import sys");
        let ctx = context(None, &["3.9"]);
        let plan = plan(&args(&[&path]), &ctx).unwrap();
        assert_eq!(plan.command_line.as_str(), format!("/opt/py3.9/bin/python {path}"));
    }

    #[test]
    fn test_literal_directive_runs_as_written() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "#!/usr/bin/perl -w");
        let ctx = context(None, &["3.9"]);
        let plan = plan(&args(&[&path, "x"]), &ctx).unwrap();
        assert_eq!(plan.command_line.as_str(), format!("/usr/bin/perl -w {path} x"));
    }

    #[test]
    fn test_missing_script_falls_through_to_default() {
        let ctx = context(None, &["3.9"]);
        let plan = plan(&args(&["missing.py"]), &ctx).unwrap();
        assert_eq!(plan.command_line.as_str(), "/opt/py3.9/bin/python missing.py");
    }

    #[test]
    fn test_builtin_shebang_ignores_same_named_alias() {
        // --- Setup ---
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "#!/usr/bin/env python3");
        let ctx = context(Some("[commands]\n/usr/bin/env=/bin/other\n"), &["3.11"]);

        // --- Execute ---
        let plan = plan(&args(&[&path]), &ctx).unwrap();

        // --- Assert ---
        assert_eq!(plan.command_line.as_str(), format!("/opt/py3.11/bin/python {path}"));
    }

    #[test]
    fn test_unparsable_virtual_version_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = script(&dir, "#!python.exe");
        let ctx = context(None, &["3.11"]);
        let err = plan(&args(&[&path]), &ctx).unwrap_err();
        assert_eq!(err.exit_code(), 103);
        assert!(err.to_string().contains(".exe"));
    }

    #[test]
    fn test_unknown_version_flag_is_fatal() {
        let ctx = context(None, &["3.9"]);
        let err = plan(&args(&["-3.12", "script.py"]), &ctx).unwrap_err();
        assert_eq!(err.exit_code(), 103);
    }
}
