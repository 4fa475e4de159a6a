//! Spawning a child with stdin on a pipe and stdout/stderr on a pty.

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use log::debug;
use nix::fcntl::{FcntlArg, FdFlag, OFlag, fcntl};
use nix::pty::{Winsize, openpty};
use nix::unistd::setsid;

use super::command::CommandLine;
use crate::error::SpawnError;

/// Everything needed to launch one child.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    /// What to run.
    pub command: CommandLine,

    /// Extra environment variables.
    pub env: Vec<(OsString, OsString)>,

    /// Working directory; inherited when `None`.
    pub current_dir: Option<PathBuf>,

    /// Terminal width.
    pub terminal_width: u16,

    /// Terminal height.
    pub terminal_height: u16,

    /// Make the pty the child's controlling terminal in a new session.
    pub controlling_terminal: bool,
}

impl SpawnRequest {
    pub fn new(command: impl Into<CommandLine>) -> Self {
        Self {
            command: command.into(),
            env: Vec::new(),
            current_dir: None,
            terminal_width: 511,
            terminal_height: 24,
            controlling_terminal: false,
        }
    }
}

/// The parent's side of a freshly spawned child.
///
/// The child-facing ends (pty slave, pipe read end) are already closed in the
/// parent by the time this is returned; only the caller's ends remain.
#[derive(Debug)]
pub struct Spawned {
    pub child: Child,

    /// Pseudo-terminal master, non-blocking, for reading the child's output.
    pub pty_master: File,

    /// Write end of the child's stdin pipe.
    pub stdin_pipe: File,
}

/// Allocates the pty and pipe and launches children on them.
pub struct ProcessHarness;

impl ProcessHarness {
    /// Spawn `request.command` with stdin bound to a new pipe and
    /// stdout/stderr bound to a new pseudo-terminal.
    pub fn spawn(request: &SpawnRequest) -> Result<Spawned, SpawnError> {
        let (program, args) = request
            .command
            .program_and_args()
            .ok_or(SpawnError::EmptyCommand)?;
        let program_name = program.to_string_lossy().into_owned();

        let winsize = Winsize {
            ws_row: request.terminal_height,
            ws_col: request.terminal_width,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let (pipe_read, pipe_write) = cloexec_pipe().map_err(SpawnError::Pipe)?;
        let pty = openpty(Some(&winsize), None).map_err(SpawnError::OpenPty)?;

        // Nothing but the intended child may inherit these. The child's
        // stdio copies are made with dup2, which clears the flag on them.
        // openpty(3) takes no flags, so a fork on another thread between
        // openpty and here can still inherit the pty pair.
        for fd in [&pty.master, &pty.slave] {
            set_cloexec(fd).map_err(|e| io_error(&program_name, e.into()))?;
        }
        set_nonblocking(&pty.master).map_err(|e| io_error(&program_name, e.into()))?;

        let stderr = pty
            .slave
            .try_clone()
            .map_err(|e| io_error(&program_name, e))?;

        let mut command = Command::new(&program);
        command
            .args(&args)
            .envs(request.env.iter().cloned())
            .stdin(Stdio::from(pipe_read))
            .stdout(Stdio::from(pty.slave))
            .stderr(Stdio::from(stderr));
        if let Some(dir) = &request.current_dir {
            command.current_dir(dir);
        }
        if request.controlling_terminal {
            // SAFETY: the closure only makes async-signal-safe calls
            // (setsid, ioctl) between fork and exec.
            unsafe {
                command.pre_exec(|| {
                    setsid()?;
                    if libc::ioctl(libc::STDOUT_FILENO, libc::TIOCSCTTY as _, 0) < 0 {
                        return Err(io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        let spawned = command.spawn();
        // Dropping the command closes the parent's copies of the pipe read
        // end and the pty slave; the child holds its own.
        drop(command);

        let child = spawned.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SpawnError::NotFound {
                    program: program_name.clone(),
                }
            } else {
                io_error(&program_name, source)
            }
        })?;

        debug!(
            "spawned pid {}: {}",
            child.id(),
            request.command.display()
        );

        Ok(Spawned {
            child,
            pty_master: File::from(pty.master),
            stdin_pipe: File::from(pipe_write),
        })
    }
}

fn io_error(program: &str, source: io::Error) -> SpawnError {
    SpawnError::Io {
        program: program.to_string(),
        source,
    }
}

/// A pipe whose ends are close-on-exec from the start.
#[cfg(not(target_vendor = "apple"))]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    nix::unistd::pipe2(OFlag::O_CLOEXEC)
}

#[cfg(target_vendor = "apple")]
fn cloexec_pipe() -> nix::Result<(OwnedFd, OwnedFd)> {
    let (read, write) = nix::unistd::pipe()?;
    set_cloexec(&read)?;
    set_cloexec(&write)?;
    Ok((read, write))
}

fn set_cloexec(fd: &OwnedFd) -> nix::Result<()> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

fn set_nonblocking(fd: &OwnedFd) -> nix::Result<()> {
    let flags = OFlag::from_bits_truncate(fcntl(fd.as_raw_fd(), FcntlArg::F_GETFL)?);
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
    Ok(())
}
