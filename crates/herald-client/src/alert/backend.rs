//! Sound output capability.

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender};
use std::time::Duration;

use tracing::{debug, warn};

use super::tone::{SAMPLE_RATE, Tone};
use crate::errors::SoundError;

/// Plays a [`Tone`]. Implementations must not block for the tone's length.
#[cfg_attr(test, mockall::automock)]
pub trait SoundBackend: Send + Sync {
    /// Start playing `tone`.
    fn play(&self, tone: &Tone) -> Result<(), SoundError>;
}

/// Longest time [`CommandBackend::play`] blocks waiting for the player to start.
pub const SPAWN_REPORT_WAIT: Duration = Duration::from_millis(250);

/// Backend that plays nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentBackend;

impl SoundBackend for SilentBackend {
    fn play(&self, tone: &Tone) -> Result<(), SoundError> {
        debug!(frequency_hz = tone.frequency_hz, "silent backend, tone skipped");
        Ok(())
    }
}

/// Pipes rendered PCM to an external raw-audio player.
///
/// The player must read mono little-endian `f32` at [`SAMPLE_RATE`] from
/// stdin, e.g. `aplay -q -t raw -f FLOAT_LE -r 44100 -c 1`.
#[derive(Clone, Debug)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    /// Build from a command line. The first element is the program.
    pub fn from_command(command: &[String]) -> Result<Self, SoundError> {
        let (program, args) = command.split_first().ok_or(SoundError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(SoundError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// The player executable.
    pub fn program(&self) -> &str {
        &self.program
    }
}

impl CommandBackend {
    /// Helper thread body: start the player, report the outcome, stream the
    /// tone and reap the child.
    fn run(&self, tone: Tone, started: &SyncSender<Result<(), SoundError>>) {
        let spawned = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        let mut child = match spawned {
            Ok(child) => {
                let _ = started.send(Ok(()));
                child
            }
            Err(source) => {
                let err = SoundError::Spawn {
                    program: self.program.clone(),
                    source,
                };
                // The caller stopped waiting; nobody else will report it.
                if let Err(unsent) = started.send(Err(err)) {
                    if let Err(e) = unsent.0 {
                        warn!(error = %e, "failed to start player");
                    }
                }
                return;
            }
        };

        let pcm = tone.render_le_bytes(SAMPLE_RATE);
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&pcm) {
                warn!(program = %self.program, error = %e, "failed to stream tone to player");
            }
        }
        match child.wait() {
            Ok(status) if !status.success() => {
                warn!(program = %self.program, %status, "player exited with failure");
            }
            Ok(_) => {}
            Err(e) => warn!(program = %self.program, error = %e, "failed to wait for player"),
        }
    }
}

impl SoundBackend for CommandBackend {
    /// The player is started, fed and reaped on a dedicated thread, so no
    /// child process exists unless that thread does. The caller waits at most
    /// [`SPAWN_REPORT_WAIT`] to learn whether the player started.
    fn play(&self, tone: &Tone) -> Result<(), SoundError> {
        let (started_tx, started_rx) = mpsc::sync_channel(1);
        let player = self.clone();
        let tone = *tone;
        let _ = std::thread::Builder::new()
            .name("herald-tone".into())
            .spawn(move || player.run(tone, &started_tx))
            .map_err(|e| SoundError::Unavailable(e.to_string()))?;

        match started_rx.recv_timeout(SPAWN_REPORT_WAIT) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                debug!(program = %self.program, "player still starting");
                Ok(())
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(SoundError::Unavailable("player thread exited early".into()))
            }
        }
    }
}
