#![allow(unsafe_code)]

use crate::error::{Error, Result};
use crate::run::Event;
use nix::unistd::setsid;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{ChildStdin, Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

/// A spawned server process. Its exit is reported on the event channel
/// passed to [`spawn`], not through this handle.
#[derive(Debug)]
pub struct Child {
    pub pid: u32,
    pub stdin: ChildStdin,
}

/// Starts `cmd` (program first, then its arguments) with a piped stdin and
/// inherited stdout/stderr.
///
/// A waiter thread sends exactly one [`Event::ChildExited`] on `tx` when the
/// child terminates, whatever its exit status. With `new_session` the child
/// is moved into its own session, so a Ctrl-C typed in the terminal only
/// reaches the supervisor.
pub fn spawn(cmd: &[String], new_session: bool, tx: Sender<Event>) -> Result<Child> {
    let (program, args) = match cmd.split_first() {
        Some(parts) => parts,
        None => {
            return Err(Error::Spawn(
                String::new(),
                io::Error::new(io::ErrorKind::InvalidInput, "command is empty"),
            ))
        }
    };
    let spawn_err = |err: io::Error| Error::Spawn(program.clone(), err);

    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    if new_session {
        unsafe {
            command.pre_exec(|| setsid().map(|_| ()).map_err(io::Error::from));
        }
    }

    debug!("Assembled command {:?}", command);
    let mut child = command.spawn().map_err(spawn_err)?;
    let pid = child.id();

    let stdin = match child.stdin.take() {
        Some(stdin) => stdin,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(spawn_err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "couldn't connect to the child's stdin",
            )));
        }
    };

    thread::Builder::new()
        .name("child-waiter".into())
        .spawn(move || {
            let status = match child.wait() {
                Ok(status) => {
                    debug!("Child {} exited: {}", pid, status);
                    Some(status)
                }
                Err(err) => {
                    error!("Couldn't wait for child {}: {}", pid, err);
                    None
                }
            };

            if tx.send(Event::ChildExited(status)).is_err() {
                debug!("Event loop is gone, dropping exit of child {}", pid);
            }
        })
        .map_err(spawn_err)?;

    Ok(Child { pid, stdin })
}
