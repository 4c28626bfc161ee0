//! Standard input/output terminal.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::domain::{AppError, CancelFlag, Result, Terminal};

const INTERRUPT_POLL: Duration = Duration::from_millis(100);

/// Console terminal backed by stdout and stdin.
///
/// A pending prompt returns `Cancelled` as soon as the run is interrupted.
#[derive(Debug, Default)]
pub struct StdTerminal {
    cancel: CancelFlag,
}

impl StdTerminal {
    #[must_use]
    pub const fn new(cancel: CancelFlag) -> Self {
        Self { cancel }
    }
}

impl Terminal for StdTerminal {
    fn show(&self, content: &str) {
        println!("{content}");
    }

    fn ask(&self, prompt: &str) -> Result<Option<String>> {
        self.cancel.check()?;

        let mut stdout = io::stdout().lock();
        write!(stdout, "{prompt} ")
            .and_then(|()| stdout.flush())
            .map_err(|e| AppError::io("Failed to write prompt", e))?;
        drop(stdout);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut line = String::new();
            let read = io::stdin().lock().read_line(&mut line).map(|n| (n, line));
            let _ = tx.send(read);
        });

        loop {
            self.cancel.check()?;
            match rx.recv_timeout(INTERRUPT_POLL) {
                Ok(Ok((0, _))) | Err(RecvTimeoutError::Disconnected) => return Ok(None),
                Ok(Ok((_, line))) => {
                    return Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()));
                }
                Ok(Err(e)) => return Err(AppError::io("Failed to read answer", e)),
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}
