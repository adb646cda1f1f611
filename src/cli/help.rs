// src/cli/help.rs

use colored::*;
use std::io::{self, Write};

/// Writes the launcher's usage banner. The runtime's own help follows it.
pub fn write_banner(out: &mut impl Write, program: &str) -> io::Result<()> {
    writeln!(
        out,
        "{} {}\n",
        "Python Launcher Version".yellow().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(
        out,
        "usage: {} [ launcher-arguments ] script [ script-arguments ]\n",
        program
    )?;
    writeln!(out, "{}\n", "Launcher arguments:".yellow().bold())?;
    writeln!(
        out,
        "{}: launch using default or a specific Python 2.x version",
        "-2[.X]".cyan()
    )?;
    writeln!(
        out,
        "{}: launch using default or a specific Python 3.x version",
        "-3[.X]".cyan()
    )?;
    writeln!(
        out,
        "{}: launch a specific version with the given word size",
        "-X.Y-32, -X.Y-64".cyan()
    )?;
    writeln!(out, "\nThe following help text is from Python:\n")?;
    out.flush()
}

/// Prints the banner to stdout.
pub fn print_banner(program: &str) {
    let stdout = io::stdout();
    if let Err(e) = write_banner(&mut stdout.lock(), program) {
        log::debug!("Could not print the usage banner: {}", e);
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_names_program_and_flags() {
        colored::control::set_override(false);
        let mut out = Vec::new();
        write_banner(&mut out, "py").unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with(&format!("Python Launcher Version {}", env!("CARGO_PKG_VERSION"))));
        assert!(text.contains("usage: py [ launcher-arguments ] script [ script-arguments ]"));
        assert!(text.contains("-3[.X]: launch using default or a specific Python 3.x version"));
        assert!(text.ends_with("The following help text is from Python:\n\n"));
    }
}
