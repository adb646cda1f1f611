//! # System Interaction Layer
//!
//! Everything that touches the operating system directly: where interpreters are
//! installed, how the child process is started and supervised, and how fatal errors
//! reach the user.
//!
//! ## Modules
//!
//! - **`install_source`**: The platform store of installed runtimes (the registry on
//!   Windows, `PATH` elsewhere), behind the `InstallSource` trait.
//! - **`executor`**: Builds the child's command line and runs it with the launcher's
//!   standard streams, returning its exit code.
//! - **`process_group`**: Ties the child to the launcher's lifetime (Job Objects on
//!   Windows, parent-death signals on Linux).
//! - **`notifier`**: The single reporting path for fatal errors.

pub mod executor;
pub mod install_source;
pub mod notifier;
pub mod process_group;
