use std::io::{self, Write};

/// Plays the alert tone when the sound timer runs out.
pub trait Audio {
    fn tone(&mut self);
}

pub struct Mute;

impl Audio for Mute {
    fn tone(&mut self) {}
}

/// Rings the terminal bell.
pub struct Bell;

impl Audio for Bell {
    fn tone(&mut self) {
        let mut stdout = io::stdout();
        if let Err(err) = stdout.write_all(b"\x07").and_then(|_| stdout.flush()) {
            tracing::debug!("could not ring terminal bell: {}", err);
        }
    }
}
