//! Keyboard controls for live capture.
//!
//! A reader thread turns stdin lines into [`Command`]s on a crossbeam
//! channel so the capture loop can `select!` on them next to audio frames:
//! - Enter (or `r`): toggle recording
//! - `q`: stop capture, freeze the recording and export it

use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::{Receiver, unbounded};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleRecording,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "r" => Some(Command::ToggleRecording),
        "q" | "quit" => Some(Command::Quit),
        _ => None,
    }
}

/// Spawns the stdin reader. The channel disconnects when stdin reaches
/// end of file.
pub fn spawn_stdin_commands() -> Receiver<Command> {
    let (tx, rx) = unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None => tracing::warn!(input = %line.trim(), "unknown command (Enter toggles recording, q stops)"),
            }
        }
        tracing::debug!("stdin closed, keyboard controls off");
    });
    rx
}
