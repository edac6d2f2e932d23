//! Capabilities the driver reports its final diagnostics through.
use std::borrow::Cow;

use log::Level;

/// Receives diagnostic messages.
pub trait LogListener {
    fn write(&mut self, level: Level, channel: &str, message: &str);
}

/// Translates user-visible message texts.
pub trait Translator {
    fn translate<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Forwards messages to the `log` facade, using the channel as target.
#[derive(Debug, Default)]
pub struct LogCrateListener;

impl LogListener for LogCrateListener {
    fn write(&mut self, level: Level, channel: &str, message: &str) {
        log!(target: channel, level, "{}", message);
    }
}

/// Leaves every text untranslated.
#[derive(Debug, Default)]
pub struct NullTranslator;

impl Translator for NullTranslator {
    fn translate<'a>(&self, text: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_translator() {
        assert_eq!(NullTranslator.translate("undefined element"), "undefined element");
    }
}
