// src/cli/mod.rs

use crate::logging;
use crate::models::LaunchMode;
use crate::state::LaunchContext;
use crate::system::executor::{self, LaunchError};
use crate::system::notifier;
use clap::Parser;
use std::env;

pub mod dispatcher;
pub mod help;

/// py: runs a script with the Python runtime its first line asks for.
///
/// Every argument is collected verbatim; the launcher interprets only the first one
/// (a version flag such as `-3.11`, or a script path) and hands the rest to the
/// interpreter.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
#[command(disable_help_flag = true, disable_version_flag = true)]
pub struct Cli {
    /// The launcher arguments, the script and the script's arguments.
    #[arg(allow_hyphen_values = true, trailing_var_arg = true)]
    pub args: Vec<String>,
}

/// Runs one launcher invocation and returns the process exit code: the child's
/// own code on success, or the code for the failure that stopped the launch.
pub fn entry(mode: LaunchMode) -> i32 {
    logging::init();
    let cli = Cli::parse();
    log::debug!("Launcher arguments: {:?}", cli.args);

    let context = LaunchContext::from_environment(mode);
    match launch(&cli.args, &context) {
        Ok(code) => code,
        Err(e) => {
            notifier::report(context.mode(), &e.to_string());
            e.exit_code()
        }
    }
}

fn launch(args: &[String], context: &LaunchContext) -> Result<i32, LaunchError> {
    let plan = dispatcher::plan(args, context)?;
    if plan.show_help {
        let program = env::args().next().unwrap_or_else(|| "py".to_string());
        help::print_banner(&program);
    }
    executor::run(&plan.command_line)
}

// MARK: --- UNIT TESTS ---
