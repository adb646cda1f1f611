// src/system/executor.rs

use crate::constants::{
    RC_BAD_VIRTUAL_PATH, RC_CREATE_PROCESS, RC_NO_PYTHON, RC_NO_STD_HANDLES, RC_PROCESS_GROUP,
};
use crate::core::directive::DirectiveError;
use crate::core::version_resolver::ResolveError;
use crate::system::process_group::ProcessGroup;
use std::fmt;
use std::io;
use std::iter;
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Unable to duplicate the standard {stream} handle: {source}")]
    NoStdHandles {
        stream: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("Unable to create process using '{command}': {source}")]
    CreateProcess {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Command line could not be parsed: {0}")]
    CommandParse(String),
    #[error(transparent)]
    BadVirtualPath(#[from] DirectiveError),
    #[error(transparent)]
    NoPython(#[from] ResolveError),
    #[error("{context}: {source}")]
    ProcessGroup {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// The launcher's exit code for this failure. A failed process-group or wait call
    /// exits with the OS error code itself when there is one.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoStdHandles { .. } => RC_NO_STD_HANDLES,
            Self::CreateProcess { .. } | Self::CommandParse(_) => RC_CREATE_PROCESS,
            Self::BadVirtualPath(_) => RC_BAD_VIRTUAL_PATH,
            Self::NoPython(_) => RC_NO_PYTHON,
            Self::ProcessGroup { source, .. } => source
                .raw_os_error()
                .filter(|&code| code != 0)
                .unwrap_or(RC_PROCESS_GROUP),
        }
    }
}

/// A complete command line for the child: executable, optional suffix from the
/// script's first line, then the launcher's remaining arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine(String);

impl CommandLine {
    /// Joins the parts with single spaces. `executable` and `suffix` are used as
    /// written; each trailing argument is quoted for the platform.
    ///
    /// # Errors
    /// `CommandParse` if a trailing argument cannot be quoted (it contains a NUL).
    pub fn assemble(
        executable: &str,
        suffix: Option<&str>,
        trailing: &[String],
    ) -> Result<Self, LaunchError> {
        let quoted = trailing
            .iter()
            .map(|arg| quote_arg(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let suffix = suffix.map(str::trim).filter(|s| !s.is_empty());
        let parts: Vec<&str> = iter::once(executable)
            .chain(suffix)
            .chain(quoted.iter().map(String::as_str))
            .collect();
        let size = parts.iter().map(|p| p.len()).sum::<usize>() + parts.len().saturating_sub(1);

        let mut line = String::with_capacity(size);
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            line.push_str(part);
        }
        Ok(Self(line))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the line into a program and its arguments. On Unix the line is parsed
    /// with POSIX shell rules; on Windows the first token is the program and the rest
    /// is passed through untouched.
    fn to_command(&self) -> Result<Command, LaunchError> {
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;

            let (program, rest) = split_program(&self.0);
            if program.is_empty() {
                return Err(LaunchError::CommandParse(self.0.clone()));
            }
            let mut command = Command::new(program);
            if !rest.is_empty() {
                command.raw_arg(rest);
            }
            Ok(command)
        }
        #[cfg(not(windows))]
        {
            let parts =
                shlex::split(&self.0).ok_or_else(|| LaunchError::CommandParse(self.0.clone()))?;
            let (program, args) = parts
                .split_first()
                .ok_or_else(|| LaunchError::CommandParse(self.0.clone()))?;
            let mut command = Command::new(program);
            command.args(args);
            Ok(command)
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Runs `command_line` as a supervised child with the launcher's standard streams and
/// returns the child's exit code once it finishes.
///
/// # Errors
/// See [`LaunchError`]; each variant maps to a distinct exit code.
pub fn run(command_line: &CommandLine) -> Result<i32, LaunchError> {
    log::debug!("Executing: {}", command_line);
    let mut command = command_line.to_command()?;
    command
        .stdin(streams::stdin()?)
        .stdout(streams::stdout()?)
        .stderr(streams::stderr()?);

    let group = ProcessGroup::new()?;
    let child = group.spawn(&mut command, command_line.as_str())?;
    child.wait()
}

/// Duplicates of the launcher's own standard streams for the child. A stream that is
/// already closed or invalid becomes a null stream.
mod streams {
    use super::LaunchError;
    use std::io;
    use std::process::Stdio;

    #[cfg(unix)]
    fn duplicate(stream: &'static str, source: impl std::os::fd::AsFd) -> Result<Stdio, LaunchError> {
        match source.as_fd().try_clone_to_owned() {
            Ok(fd) => Ok(Stdio::from(fd)),
            Err(e) if e.raw_os_error() == Some(libc::EBADF) => {
                log::debug!("Standard {} is closed; the child gets a null stream", stream);
                Ok(Stdio::null())
            }
            Err(source) => Err(LaunchError::NoStdHandles { stream, source }),
        }
    }

    #[cfg(windows)]
    fn duplicate(
        stream: &'static str,
        source: impl std::os::windows::io::AsHandle,
    ) -> Result<Stdio, LaunchError> {
        const ERROR_INVALID_HANDLE: i32 = 6;
        match source.as_handle().try_clone_to_owned() {
            Ok(handle) => Ok(Stdio::from(handle)),
            Err(e) if e.raw_os_error() == Some(ERROR_INVALID_HANDLE) => {
                log::debug!("Standard {} is not available; the child gets a null stream", stream);
                Ok(Stdio::null())
            }
            Err(source) => Err(LaunchError::NoStdHandles { stream, source }),
        }
    }

    pub(super) fn stdin() -> Result<Stdio, LaunchError> {
        duplicate("input", io::stdin())
    }

    pub(super) fn stdout() -> Result<Stdio, LaunchError> {
        duplicate("output", io::stdout())
    }

    pub(super) fn stderr() -> Result<Stdio, LaunchError> {
        duplicate("error", io::stderr())
    }
}

fn quote_arg(arg: &str) -> Result<String, LaunchError> {
    if cfg!(windows) {
        Ok(quote_msvc(arg))
    } else {
        shlex::try_quote(arg)
            .map(|quoted| quoted.into_owned())
            .map_err(|e| LaunchError::CommandParse(format!("{}: {:?}", e, arg)))
    }
}

/// Quotes an argument so the MSVC runtime's command-line parser reads it back
/// unchanged.
fn quote_msvc(arg: &str) -> String {
    if !arg.is_empty() && !arg.contains([' ', '\t', '\n', '\u{b}', '"']) {
        return arg.to_string();
    }
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    let mut backslashes = 0;
    for c in arg.chars() {
        match c {
            '\\' => backslashes += 1,
            '"' => {
                quoted.extend(iter::repeat_n('\\', backslashes * 2 + 1));
                quoted.push('"');
                backslashes = 0;
            }
            _ => {
                quoted.extend(iter::repeat_n('\\', backslashes));
                quoted.push(c);
                backslashes = 0;
            }
        }
    }
    quoted.extend(iter::repeat_n('\\', backslashes * 2));
    quoted.push('"');
    quoted
}

/// Splits off the program token: a double-quoted string, or everything up to the
/// first whitespace. The rest is returned with leading whitespace removed.
#[cfg_attr(not(windows), allow(dead_code))]
fn split_program(line: &str) -> (&str, &str) {
    let (program, rest) = match line.strip_prefix('"') {
        Some(quoted) => match quoted.find('"') {
            Some(end) => (quoted.get(..end), quoted.get(end + 1..)),
            None => (Some(quoted), None),
        },
        None => match line.find(char::is_whitespace) {
            Some(end) => (line.get(..end), line.get(end..)),
            None => (Some(line), None),
        },
    };
    (program.unwrap_or_default(), rest.unwrap_or_default().trim_start())
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_assemble_executable_alone() {
        let line = CommandLine::assemble("/usr/bin/python3.11", None, &[]).unwrap();
        assert_eq!(line.as_str(), "/usr/bin/python3.11");

        let blank_suffix = CommandLine::assemble("python", Some("  "), &[]).unwrap();
        assert_eq!(blank_suffix.as_str(), "python");
    }

    #[test]
    fn test_assemble_joins_with_single_spaces() {
        let line = CommandLine::assemble(
            r#""C:\Program Files\Python\python.exe""#,
            Some("-u"),
            &args(&["script.py", "arg"]),
        )
        .unwrap();
        assert_eq!(
            line.as_str(),
            r#""C:\Program Files\Python\python.exe" -u script.py arg"#
        );
    }

    #[test]
    fn test_exit_codes() {
        let io_err = || io::Error::other("boom");
        assert_eq!(
            LaunchError::NoStdHandles { stream: "input", source: io_err() }.exit_code(),
            100
        );
        assert_eq!(
            LaunchError::CreateProcess { command: "x".into(), source: io_err() }.exit_code(),
            101
        );
        assert_eq!(
            LaunchError::from(DirectiveError::BadVirtualPath("pythonx".into())).exit_code(),
            102
        );
        assert_eq!(LaunchError::from(ResolveError::NoneInstalled).exit_code(), 103);
        assert_eq!(
            LaunchError::ProcessGroup { context: "wait", source: io_err() }.exit_code(),
            104
        );
    }

    #[test]
    fn test_process_group_failure_exits_with_os_code() {
        let err = LaunchError::ProcessGroup {
            context: "Unable to configure job object",
            source: io::Error::from_raw_os_error(5),
        };
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn test_quote_msvc() {
        assert_eq!(quote_msvc("plain"), "plain");
        assert_eq!(quote_msvc(""), r#""""#);
        assert_eq!(quote_msvc("with space"), r#""with space""#);
        assert_eq!(quote_msvc(r#"say "hi""#), r#""say \"hi\"""#);
        assert_eq!(quote_msvc(r"C:\dir with space\"), r#""C:\dir with space\\""#);
        assert_eq!(quote_msvc(r"C:\no\spaces"), r"C:\no\spaces");
    }

    #[test]
    fn test_split_program() {
        assert_eq!(
            split_program(r#""C:\Program Files\py.exe"  -u x.py"#),
            (r"C:\Program Files\py.exe", "-u x.py")
        );
        assert_eq!(split_program("python3 -c pass"), ("python3", "-c pass"));
        assert_eq!(split_program("python3"), ("python3", ""));
    }

    #[cfg(unix)]
    #[test]
    fn test_trailing_args_survive_shell_splitting() {
        // --- Setup ---
        let trailing = args(&["it's", "two words", "$HOME", ""]);

        // --- Execute ---
        let line = CommandLine::assemble("/bin/echo", Some("-n"), &trailing).unwrap();
        let command = line.to_command().unwrap();

        // --- Assert ---
        let parsed: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(command.get_program(), "/bin/echo");
        assert_eq!(parsed, args(&["-n", "it's", "two words", "$HOME", ""]));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_propagates_child_exit_code() {
        let line = CommandLine::assemble("/bin/sh", Some("-c"), &args(&["exit 3"])).unwrap();
        assert_eq!(run(&line).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_missing_program_is_create_process() {
        let line = CommandLine::assemble("/no/such/python3.99", None, &[]).unwrap();
        let err = run(&line).unwrap_err();
        assert_eq!(err.exit_code(), 101);
    }
}
