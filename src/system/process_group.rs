// src/system/process_group.rs

//! Ties a launched interpreter to the launcher's lifetime.
//!
//! On Windows the child is placed in a Job Object that kills every process in it when
//! the last handle closes. On Unix the child stays in the terminal's foreground
//! process group (so it can still read from the terminal) and, on Linux, receives
//! `SIGKILL` if the launcher dies first. Processes the child itself spawns are not
//! tracked on Unix.

use crate::system::executor::LaunchError;
use std::process::{Child, Command, ExitStatus};

/// A container the supervised child is placed into.
#[derive(Debug)]
pub struct ProcessGroup {
    #[cfg(windows)]
    job: windows::JobHandle,
}

impl ProcessGroup {
    /// # Errors
    /// `ProcessGroup` if the platform container cannot be created or configured.
    pub fn new() -> Result<Self, LaunchError> {
        Ok(Self {
            #[cfg(windows)]
            job: windows::JobHandle::create()?,
        })
    }

    /// Spawns `command` inside this group.
    ///
    /// # Errors
    /// `CreateProcess` if the process cannot be started, `ProcessGroup` if it cannot
    /// be attached to the group (the half-started child is killed).
    pub fn spawn(
        &self,
        command: &mut Command,
        display: &str,
    ) -> Result<SupervisedChild<'_>, LaunchError> {
        #[cfg(target_os = "linux")]
        unix::die_with_parent(command);

        let child = command.spawn().map_err(|source| LaunchError::CreateProcess {
            command: display.to_string(),
            source,
        })?;
        log::debug!("Started child process {}", child.id());
        let supervised = SupervisedChild { child, _group: self };

        #[cfg(windows)]
        self.job.assign(&supervised.child)?;

        Ok(supervised)
    }
}

/// A running child that is killed if it is still alive when this value drops.
#[derive(Debug)]
pub struct SupervisedChild<'g> {
    child: Child,
    _group: &'g ProcessGroup,
}

impl SupervisedChild<'_> {
    /// Waits, without a timeout, for the child to exit and returns its exit code.
    /// Interrupt signals are left for the child to handle while waiting.
    ///
    /// # Errors
    /// `ProcessGroup` if waiting fails.
    pub fn wait(mut self) -> Result<i32, LaunchError> {
        #[cfg(unix)]
        let _restore = unix::ignore_interrupts()?;

        let status = self.child.wait().map_err(|source| LaunchError::ProcessGroup {
            context: "Failed to wait for the child process",
            source,
        })?;
        let code = exit_code(status);
        log::debug!("Child process exited with code {}", code);
        Ok(code)
    }
}

impl Drop for SupervisedChild<'_> {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            log::debug!("Killing child process {}", self.child.id());
            if let Err(e) = self.child.kill() {
                log::warn!("Failed to kill child process {}: {}", self.child.id(), e);
            }
            self.child.wait().ok();
        }
    }
}

/// The code the launcher should exit with for `status`. A Unix signal death maps to
/// `128 + signal`, as shells report it.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

// --- Unix ---

#[cfg(unix)]
mod unix {
    use crate::system::executor::LaunchError;
    use nix::sys::signal::{SigHandler, Signal, signal};
    use scopeguard::ScopeGuard;

    const FORWARDED: [Signal; 2] = [Signal::SIGINT, Signal::SIGQUIT];

    /// Ignores `SIGINT`/`SIGQUIT` in the launcher. The terminal still delivers them
    /// to the child, which shares our process group. Dropping the guard restores the
    /// previous handlers.
    #[allow(unsafe_code)]
    pub(super) fn ignore_interrupts()
    -> Result<ScopeGuard<Vec<(Signal, SigHandler)>, impl FnOnce(Vec<(Signal, SigHandler)>)>, LaunchError>
    {
        let mut previous = Vec::with_capacity(FORWARDED.len());
        for sig in FORWARDED {
            // SAFETY: SigIgn installs no Rust code as a handler.
            let old = unsafe { signal(sig, SigHandler::SigIgn) }.map_err(|errno| {
                LaunchError::ProcessGroup {
                    context: "Failed to ignore interrupt signals",
                    source: errno.into(),
                }
            })?;
            previous.push((sig, old));
        }
        Ok(scopeguard::guard(previous, |previous| {
            for (sig, handler) in previous {
                // SAFETY: restores the handler that was installed before.
                if let Err(e) = unsafe { signal(sig, handler) } {
                    log::warn!("Failed to restore the {} handler: {}", sig, e);
                }
            }
        }))
    }

    /// Asks the kernel to kill the child when the launcher exits.
    #[cfg(target_os = "linux")]
    #[allow(unsafe_code)]
    pub(super) fn die_with_parent(command: &mut std::process::Command) {
        use std::os::unix::process::CommandExt;

        let launcher = nix::unistd::getpid();
        // SAFETY: the closure only makes async-signal-safe calls.
        unsafe {
            command.pre_exec(move || {
                if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                // The launcher may have exited before prctl took effect.
                if nix::unistd::getppid() != launcher {
                    return Err(std::io::Error::other("launcher exited before the child started"));
                }
                Ok(())
            });
        }
    }
}

// --- Windows ---

#[cfg(windows)]
mod windows {
    use crate::system::executor::LaunchError;
    use std::io;
    use std::mem;
    use std::os::windows::io::AsRawHandle;
    use std::process::Child;
    use std::ptr;
    use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};
    use windows_sys::Win32::System::JobObjects::{
        AssignProcessToJobObject, CreateJobObjectW, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
        JOB_OBJECT_LIMIT_SILENT_BREAKAWAY_OK, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
        JobObjectExtendedLimitInformation, QueryInformationJobObject, SetInformationJobObject,
    };

    /// Owned Job Object handle, closed on drop. Closing it kills every process in the
    /// job.
    #[derive(Debug)]
    pub(super) struct JobHandle(HANDLE);

    impl JobHandle {
        #[allow(unsafe_code, clippy::cast_possible_truncation)]
        pub(super) fn create() -> Result<Self, LaunchError> {
            // SAFETY: null attributes and name create an anonymous job.
            let raw = unsafe { CreateJobObjectW(ptr::null(), ptr::null()) };
            if raw == 0 {
                return Err(group_error("Unable to create job object"));
            }
            let job = Self(raw);

            let size = mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32;
            // SAFETY: the struct is plain data; all-zero is a valid value.
            let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = unsafe { mem::zeroed() };
            let mut returned = 0u32;
            // SAFETY: `info` is a live, correctly sized buffer for this info class.
            let queried = unsafe {
                QueryInformationJobObject(
                    job.0,
                    JobObjectExtendedLimitInformation,
                    (&raw mut info).cast(),
                    size,
                    &mut returned,
                )
            };
            if queried == 0 {
                return Err(group_error("Unable to query job object limits"));
            }

            info.BasicLimitInformation.LimitFlags |=
                JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE | JOB_OBJECT_LIMIT_SILENT_BREAKAWAY_OK;
            // SAFETY: as above; the buffer is only read.
            let set = unsafe {
                SetInformationJobObject(
                    job.0,
                    JobObjectExtendedLimitInformation,
                    (&raw const info).cast(),
                    size,
                )
            };
            if set == 0 {
                return Err(group_error("Unable to configure job object"));
            }
            Ok(job)
        }

        #[allow(unsafe_code)]
        pub(super) fn assign(&self, child: &Child) -> Result<(), LaunchError> {
            let process = child.as_raw_handle() as HANDLE;
            // SAFETY: both handles are open for the duration of the call.
            if unsafe { AssignProcessToJobObject(self.0, process) } == 0 {
                return Err(group_error("Unable to assign child process to job"));
            }
            Ok(())
        }
    }

    impl Drop for JobHandle {
        #[allow(unsafe_code)]
        fn drop(&mut self) {
            // SAFETY: the handle is owned and closed exactly once.
            unsafe {
                CloseHandle(self.0);
            }
        }
    }

    fn group_error(context: &'static str) -> LaunchError {
        LaunchError::ProcessGroup {
            context,
            source: io::Error::last_os_error(),
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell(script: &str) -> Command {
        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(script);
        command
    }

    #[test]
    fn test_wait_returns_child_exit_code() {
        let group = ProcessGroup::new().unwrap();
        let child = group.spawn(&mut shell("exit 7"), "sh -c 'exit 7'").unwrap();
        assert_eq!(child.wait().unwrap(), 7);
    }

    #[test]
    fn test_signal_death_maps_to_128_plus_signal() {
        let group = ProcessGroup::new().unwrap();
        let child = group.spawn(&mut shell("kill -TERM $$"), "sh").unwrap();
        assert_eq!(child.wait().unwrap(), 128 + 15);
    }

    #[test]
    fn test_drop_kills_running_child() {
        // --- Setup ---
        let group = ProcessGroup::new().unwrap();
        let child = group.spawn(&mut shell("sleep 30"), "sleep").unwrap();
        let pid = child.child.id();

        // --- Execute ---
        drop(child);

        // --- Assert ---
        let alive = Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("kill -0 {pid} 2>/dev/null"))
            .status()
            .unwrap();
        assert!(!alive.success());
    }

    #[test]
    fn test_spawn_failure_is_create_process() {
        let group = ProcessGroup::new().unwrap();
        let result = group.spawn(&mut Command::new("/definitely/not/python"), "python");
        assert!(matches!(result, Err(LaunchError::CreateProcess { .. })));
    }
}
