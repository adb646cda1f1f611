// src/constants.rs

//! Fixed names, limits and exit codes shared across the launcher.

/// The name of the settings file, both per-user and next to the launcher.
pub const CONFIG_FILENAME: &str = "py.ini";

/// INI section holding scalar version defaults (`python`, `python2`, ...).
pub const DEFAULTS_SECTION: &str = "defaults";

/// INI section holding user-defined shebang command aliases.
pub const COMMANDS_SECTION: &str = "commands";

/// Prefix for environment overrides of `[defaults]` keys (`PY_PYTHON3`).
pub const ENV_PREFIX: &str = "PY_";

/// Any non-blank value turns on debug diagnostics on stderr.
pub const DEBUG_ENV_VAR: &str = "PYLAUNCH_DEBUG";

/// Optional `env_logger` filter string, for finer control than the debug toggle.
pub const LOG_FILTER_ENV_VAR: &str = "PYLAUNCH_LOG";

/// The interpreter family token every virtual shebang command must start with.
pub const INTERPRETER_FAMILY: &str = "python";

/// Number of bytes read from the head of a script when looking for a shebang.
pub const SHEBANG_HEAD_SIZE: usize = 256;

/// Upper bound on the number of runtimes kept in the catalog.
pub const MAX_INSTALLED_RUNTIMES: usize = 100;

/// Upper bound on the number of `[commands]` aliases.
pub const MAX_COMMANDS: usize = 100;

/// Longest accepted alias name, in characters.
pub const MAX_ALIAS_NAME_LEN: usize = 260;

/// Longest accepted alias command line or default value, in characters.
pub const MAX_CONFIG_VALUE_LEN: usize = 1024;

/// Longest accepted install location read from the configuration store.
pub const MAX_INSTALL_PATH_LEN: usize = 260;

// --- Exit codes ---

/// The standard handles could not be prepared for the child.
pub const RC_NO_STD_HANDLES: i32 = 100;
/// The child process could not be created.
pub const RC_CREATE_PROCESS: i32 = 101;
/// A virtual shebang path did not name the interpreter family.
pub const RC_BAD_VIRTUAL_PATH: i32 = 102;
/// No installed runtime matched the request.
pub const RC_NO_PYTHON: i32 = 103;
/// The process group could not be configured or the child could not be waited on, and
/// the failure carried no OS error code.
pub const RC_PROCESS_GROUP: i32 = 104;
