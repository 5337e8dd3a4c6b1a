use super::Clipboard;
use base64::{Engine, engine::general_purpose::STANDARD};
use std::io::Write;

/// Copies text through the terminal using the OSC 52 escape sequence.
#[derive(Debug, Default, Clone, Copy)]
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    /// The escape sequence that copies `text`.
    pub fn sequence(text: &str) -> String {
        format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
    }
}

impl Clipboard for Osc52Clipboard {
    fn write_text(&self, text: &str) -> eyre::Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(Self::sequence(text).as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}
