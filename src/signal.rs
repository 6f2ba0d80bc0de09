use crate::error::{Error, Result};
use crate::run::Event;
use nix::sys::signal::{SigSet, Signal as RawSignal};
use std::sync::mpsc::Sender;
use std::thread;

/// A host request to shut down.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal {
    Interrupt,
    Terminate,
    /// The controlling terminal went away.
    Hangup,
}

impl Signal {
    const fn from_raw(raw: RawSignal) -> Option<Self> {
        match raw {
            RawSignal::SIGINT => Some(Self::Interrupt),
            RawSignal::SIGTERM => Some(Self::Terminate),
            RawSignal::SIGHUP => Some(Self::Hangup),
            _ => None,
        }
    }
}

/// Routes SIGINT, SIGTERM and SIGHUP to `tx` as [`Event::Signal`].
///
/// A hang-up is a shutdown request like the others: the server runs in a
/// session of its own and would otherwise be left without its supervisor
/// when the terminal closes.
///
/// The signals are blocked on the calling thread and picked up with
/// `sigwait` on a dedicated thread. The mask is inherited by threads spawned
/// afterwards, so this must run before any other thread is started.
pub fn install(tx: Sender<Event>) -> Result<()> {
    let mut mask = SigSet::empty();
    mask.add(RawSignal::SIGINT);
    mask.add(RawSignal::SIGTERM);
    mask.add(RawSignal::SIGHUP);
    mask.thread_block().map_err(|errno| Error::Signal(errno.into()))?;

    thread::Builder::new()
        .name("signal-waiter".into())
        .spawn(move || loop {
            let raw = match mask.wait() {
                Ok(raw) => raw,
                Err(errno) => {
                    error!("Waiting for signals failed, shutdown on signal is disabled: {}", errno);
                    return;
                }
            };
            debug!("Received {:?}", raw);

            if let Some(sig) = Signal::from_raw(raw) {
                if tx.send(Event::Signal(sig)).is_err() {
                    return;
                }
            }
        })
        .map_err(Error::Signal)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{RawSignal, Signal};

    #[test]
    fn maps_termination_signals() {
        assert_eq!(Signal::from_raw(RawSignal::SIGINT), Some(Signal::Interrupt));
        assert_eq!(Signal::from_raw(RawSignal::SIGTERM), Some(Signal::Terminate));
        assert_eq!(Signal::from_raw(RawSignal::SIGHUP), Some(Signal::Hangup));
        assert_eq!(Signal::from_raw(RawSignal::SIGUSR1), None);
    }
}
