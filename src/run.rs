use std::io::{self, Write};
use std::process::ExitStatus;
use std::sync::mpsc::{channel, Receiver};

use crate::config::Config;
use crate::error::Result;
use crate::signal::{self, Signal};
use crate::{listener, pipe, process};

/// Everything the event loop reacts to. All sources feed a single channel,
/// so arrival order is processing order.
#[derive(Debug, Eq, PartialEq)]
pub enum Event {
    /// A line read from the control pipe, without its terminator.
    Command(String),
    /// The host asked the supervisor to terminate.
    Signal(Signal),
    /// The child terminated. `None` if its status couldn't be collected.
    ChildExited(Option<ExitStatus>),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum State {
    Running,
    ShuttingDown,
    Terminated,
}

/// Why the supervisor stopped. Both are successful exits.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The child exited on its own.
    ChildExited,
    /// A signal started the shutdown and the child has since exited.
    Shutdown,
}

/// Relays events to the child's stdin, one at a time.
///
/// The loop is the only writer of `input`. Once shutdown has begun, commands
/// and further signals are dropped; only the child's exit matters.
pub struct EventLoop<W: Write> {
    input: Option<W>,
    state: State,
    stop_command: String,
    echo: bool,
}

impl<W: Write> EventLoop<W> {
    pub fn new(input: W, stop_command: impl Into<String>, echo: bool) -> Self {
        Self {
            input: Some(input),
            state: State::Running,
            stop_command: stop_command.into(),
            echo,
        }
    }

    pub const fn state(&self) -> State {
        self.state
    }

    /// Blocks on `events` until the loop terminates.
    pub fn run(mut self, events: &Receiver<Event>) -> Outcome {
        loop {
            let event = match events.recv() {
                Ok(event) => event,
                Err(_) => {
                    warn!("All event sources are gone, stopping");
                    self.state = State::Terminated;
                    return Outcome::ChildExited;
                }
            };

            if let Some(outcome) = self.handle(event) {
                return outcome;
            }
        }
    }

    /// Applies a single event. Returns the outcome once the loop is done.
    pub fn handle(&mut self, event: Event) -> Option<Outcome> {
        match (self.state, event) {
            (State::Running, Event::Command(line)) => {
                self.relay(&line);
                None
            }
            (State::Running, Event::Signal(sig)) => {
                println!("Signal exit");
                debug!("{:?} received, sending {:?}", sig, self.stop_command);
                self.begin_shutdown();
                None
            }
            (State::Running, Event::ChildExited(_)) => {
                println!("Console exit");
                self.state = State::Terminated;
                Some(Outcome::ChildExited)
            }
            (State::ShuttingDown, Event::ChildExited(_)) => {
                debug!("Child exited after shutdown request");
                self.state = State::Terminated;
                Some(Outcome::Shutdown)
            }
            (State::ShuttingDown, event) => {
                debug!("Shutting down, dropping {:?}", event);
                None
            }
            (State::Terminated, event) => {
                debug!("Already terminated, dropping {:?}", event);
                None
            }
        }
    }

    fn relay(&mut self, line: &str) {
        if self.echo {
            println!("{}:", line);
        }

        if let Some(input) = self.input.as_mut() {
            if let Err(err) = write_line(input, line) {
                warn!("Couldn't relay {:?} to the child: {}", line, err);
            }
        }
    }

    fn begin_shutdown(&mut self) {
        self.state = State::ShuttingDown;

        // Dropping the handle closes the child's stdin.
        if let Some(mut input) = self.input.take() {
            if let Err(err) = write_line(&mut input, &self.stop_command) {
                warn!("Couldn't send {:?} to the child: {}", self.stop_command, err);
            }
        }
    }
}

fn write_line<W: Write>(w: &mut W, line: &str) -> io::Result<()> {
    let mut buf = Vec::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.push(b'\n');
    w.write_all(&buf)?;
    w.flush()
}

/// Opens the control pipe, starts the child and relays commands until the
/// child is gone.
///
/// The control pipe is checked before anything else happens: if it can't be
/// used, no child is started. Signal handling is set up before any thread
/// exists so that every thread inherits the signal mask.
pub fn run(config: Config) -> Result<Outcome> {
    let pipe = pipe::acquire(&config.control_path, config.control_mode)?;
    info!("Reading commands from {:?}", pipe.path());

    let (tx, rx) = channel();
    signal::install(tx.clone())?;

    let child = process::spawn(&config.cmd, config.new_session, tx.clone())?;
    debug!("Started child {}", child.pid);

    listener::spawn(pipe, tx)?;
    println!("Started");

    Ok(EventLoop::new(child.stdin, config.stop_command, config.echo).run(&rx))
}

#[cfg(test)]
mod tests {
    use super::{Event, EventLoop, Outcome, State};
    use crate::signal::Signal;
    use std::cell::{Cell, RefCell};
    use std::io::{self, Write};
    use std::rc::Rc;
    use std::sync::mpsc::channel;

    /// Stands in for the child's stdin.
    #[derive(Clone, Default)]
    struct Sink {
        written: Rc<RefCell<Vec<u8>>>,
        closed: Rc<Cell<bool>>,
    }

    impl Sink {
        fn contents(&self) -> String {
            String::from_utf8(self.written.borrow().clone()).unwrap()
        }
    }

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for Sink {
        fn drop(&mut self) {
            self.closed.set(true);
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "child is gone"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn command(line: &str) -> Event {
        Event::Command(line.to_string())
    }

    #[test]
    fn relays_commands_in_order() {
        let sink = Sink::default();
        let mut el = EventLoop::new(sink.clone(), "stop", false);

        assert_eq!(el.handle(command("say hello")), None);
        assert_eq!(el.handle(command("")), None);
        assert_eq!(el.handle(command("time set day")), None);

        assert_eq!(sink.contents(), "say hello\n\ntime set day\n");
        assert_eq!(el.state(), State::Running);
        assert!(!sink.closed.get());
    }

    #[test]
    fn signal_sends_stop_once_then_waits_for_exit() {
        let sink = Sink::default();
        let mut el = EventLoop::new(sink.clone(), "stop", false);

        assert_eq!(el.handle(command("save-all")), None);
        assert_eq!(el.handle(Event::Signal(Signal::Terminate)), None);
        assert_eq!(el.state(), State::ShuttingDown);
        assert!(sink.closed.get());

        assert_eq!(el.handle(command("say too late")), None);
        assert_eq!(el.handle(Event::Signal(Signal::Interrupt)), None);
        assert_eq!(el.state(), State::ShuttingDown);

        assert_eq!(el.handle(Event::ChildExited(None)), Some(Outcome::Shutdown));
        assert_eq!(el.state(), State::Terminated);
        assert_eq!(sink.contents(), "save-all\nstop\n");
    }

    #[test]
    fn child_exit_terminates_without_stop() {
        let sink = Sink::default();
        let mut el = EventLoop::new(sink.clone(), "stop", true);

        assert_eq!(el.handle(command("list")), None);
        assert_eq!(el.handle(Event::ChildExited(None)), Some(Outcome::ChildExited));
        assert_eq!(el.state(), State::Terminated);

        assert_eq!(el.handle(Event::Signal(Signal::Terminate)), None);
        assert_eq!(sink.contents(), "list\n");
    }

    #[test]
    fn uses_configured_stop_command() {
        let sink = Sink::default();
        let mut el = EventLoop::new(sink.clone(), "end", false);

        el.handle(Event::Signal(Signal::Interrupt));
        assert_eq!(sink.contents(), "end\n");
    }

    #[test]
    fn write_failures_do_not_stop_the_loop() {
        let mut el = EventLoop::new(Broken, "stop", false);

        assert_eq!(el.handle(command("say hi")), None);
        assert_eq!(el.state(), State::Running);
        assert_eq!(el.handle(Event::Signal(Signal::Terminate)), None);
        assert_eq!(el.handle(Event::ChildExited(None)), Some(Outcome::Shutdown));
    }

    #[test]
    fn run_processes_events_in_arrival_order() {
        let sink = Sink::default();
        let (tx, rx) = channel();
        for event in vec![
            command("a"),
            command("b"),
            Event::Signal(Signal::Terminate),
            command("c"),
            Event::Signal(Signal::Terminate),
            Event::ChildExited(None),
            command("d"),
        ] {
            tx.send(event).unwrap();
        }

        let outcome = EventLoop::new(sink.clone(), "stop", false).run(&rx);
        assert_eq!(outcome, Outcome::Shutdown);
        assert_eq!(sink.contents(), "a\nb\nstop\n");
    }

    #[test]
    fn run_ends_when_every_source_is_gone() {
        let (tx, rx) = channel();
        tx.send(command("a")).unwrap();
        drop(tx);

        let sink = Sink::default();
        let outcome = EventLoop::new(sink.clone(), "stop", false).run(&rx);
        assert_eq!(outcome, Outcome::ChildExited);
        assert_eq!(sink.contents(), "a\n");
    }
}
