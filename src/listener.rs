use crate::run::Event;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// A byte stream whose end-of-data only means "no writer right now".
pub trait Resume: Read {
    /// Blocks until reading may produce data again.
    fn resume(&mut self) -> io::Result<()>;
}

impl<R: Resume + ?Sized> Resume for &mut R {
    fn resume(&mut self) -> io::Result<()> {
        (**self).resume()
    }
}

/// Reads commands from `reader` on a background thread until a read fails.
///
/// A read error is logged and ends the thread; the rest of the supervisor
/// keeps running without a command source.
pub fn spawn<R>(reader: R, tx: Sender<Event>) -> io::Result<JoinHandle<()>>
where
    R: Resume + Send + 'static,
{
    thread::Builder::new()
        .name("control-listener".into())
        .spawn(move || match listen(reader, &tx) {
            Ok(()) => debug!("Event loop is gone, control listener stopping"),
            Err(err) => error!(
                "Reading the control pipe failed, commands will no longer be relayed: {}",
                err
            ),
        })
}

/// Sends every line read from `reader` as an [`Event::Command`].
///
/// End-of-data does not end the listener. A partial line left by the
/// writer that just disconnected is sent as a line of its own, then the
/// listener waits on [`Resume::resume`] and scans again. Returns `Ok(())`
/// only once the receiving side of `tx` is dropped.
pub fn listen<R: Resume>(reader: R, tx: &Sender<Event>) -> io::Result<()> {
    let mut reader = BufReader::new(reader);
    loop {
        if !scan(&mut reader, tx)? {
            return Ok(());
        }
        trace!("No writers on the control pipe, waiting for the next one");
        reader.get_mut().resume()?;
    }
}

// Ok(true) at end-of-data, Ok(false) when nobody receives events anymore.
fn scan<R: BufRead>(reader: &mut R, tx: &Sender<Event>) -> io::Result<bool> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(true);
        }

        let line = to_line(&buf);
        trace!("Read command {:?}", line);
        if tx.send(Event::Command(line)).is_err() {
            return Ok(false);
        }
    }
}

fn to_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
