//! Built-in transforms.
//!
//! All of them are pure string functions except `logger` and `typewriter`,
//! which also echo each record to an output stream.

use crate::stage::Transform;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

/// Per-character delay used by [`Typewriter::new`]
pub const TYPEWRITER_DELAY: Duration = Duration::from_millis(100);

/// Passes every record through unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct Identity;

impl Transform for Identity {
    fn apply(&mut self, _input: &str) -> Option<String> {
        None
    }

    fn name(&self) -> &str {
        "identity"
    }
}

/// Prints `[logger] <record>` and passes the record through
pub struct Logger {
    out: Box<dyn Write + Send>,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Logger {
    fn apply(&mut self, input: &str) -> Option<String> {
        // Echo failures must not stop the stream
        let _ = writeln!(self.out, "[logger] {}", input);
        None
    }

    fn on_shutdown(&mut self) {
        let _ = self.out.flush();
    }

    fn name(&self) -> &str {
        "logger"
    }
}

/// Prints `[typewriter] <record>` one character at a time and passes the
/// record through
pub struct Typewriter {
    out: Box<dyn Write + Send>,
    delay: Duration,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::with_writer(io::stdout(), TYPEWRITER_DELAY)
    }

    pub fn with_writer(out: impl Write + Send + 'static, delay: Duration) -> Self {
        Self {
            out: Box::new(out),
            delay,
        }
    }

    fn type_out(&mut self, input: &str) -> io::Result<()> {
        write!(self.out, "[typewriter] ")?;
        let mut utf8 = [0u8; 4];
        for c in input.chars() {
            self.out.write_all(c.encode_utf8(&mut utf8).as_bytes())?;
            self.out.flush()?;
            if !self.delay.is_zero() {
                thread::sleep(self.delay);
            }
        }
        writeln!(self.out)?;
        self.out.flush()
    }
}

impl Default for Typewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for Typewriter {
    fn apply(&mut self, input: &str) -> Option<String> {
        let _ = self.type_out(input);
        None
    }

    fn name(&self) -> &str {
        "typewriter"
    }
}

/// Converts to upper case
#[derive(Debug, Default, Clone, Copy)]
pub struct Uppercaser;

impl Transform for Uppercaser {
    fn apply(&mut self, input: &str) -> Option<String> {
        Some(input.to_uppercase())
    }

    fn name(&self) -> &str {
        "uppercaser"
    }
}

/// Moves the last character to the front: `hello` becomes `ohell`
#[derive(Debug, Default, Clone, Copy)]
pub struct Rotator;

impl Transform for Rotator {
    fn apply(&mut self, input: &str) -> Option<String> {
        let mut chars = input.chars();
        let Some(last) = chars.next_back() else {
            return Some(String::new());
        };
        let mut out = String::with_capacity(input.len());
        out.push(last);
        out.push_str(chars.as_str());
        Some(out)
    }

    fn name(&self) -> &str {
        "rotator"
    }
}

/// Reverses the characters
#[derive(Debug, Default, Clone, Copy)]
pub struct Flipper;

impl Transform for Flipper {
    fn apply(&mut self, input: &str) -> Option<String> {
        Some(input.chars().rev().collect())
    }

    fn name(&self) -> &str {
        "flipper"
    }
}

/// Puts a single space between characters: `abc` becomes `a b c`
#[derive(Debug, Default, Clone, Copy)]
pub struct Expander;

impl Transform for Expander {
    fn apply(&mut self, input: &str) -> Option<String> {
        let mut out = String::with_capacity(input.len() * 2);
        for (i, c) in input.chars().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push(c);
        }
        Some(out)
    }

    fn name(&self) -> &str {
        "expander"
    }
}

/// A named transform backed by a closure
pub struct FnTransform<F>
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    name: String,
    func: F,
}

impl<F> FnTransform<F>
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Transform for FnTransform<F>
where
    F: FnMut(&str) -> Option<String> + Send + 'static,
{
    fn apply(&mut self, input: &str) -> Option<String> {
        (self.func)(input)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_flipper() {
        assert_eq!(Flipper.apply("abc"), Some("cba".to_string()));
        assert_eq!(Flipper.apply(""), Some(String::new()));
        assert_eq!(Flipper.apply("héllo"), Some("olléh".to_string()));
    }

    #[test]
    fn test_uppercaser() {
        assert_eq!(Uppercaser.apply("Hello, World"), Some("HELLO, WORLD".to_string()));
    }

    #[test]
    fn test_rotator() {
        assert_eq!(Rotator.apply("hello"), Some("ohell".to_string()));
        assert_eq!(Rotator.apply("a"), Some("a".to_string()));
        assert_eq!(Rotator.apply(""), Some(String::new()));
    }

    #[test]
    fn test_expander() {
        assert_eq!(Expander.apply("abc"), Some("a b c".to_string()));
        assert_eq!(Expander.apply("x"), Some("x".to_string()));
        assert_eq!(Expander.apply(""), Some(String::new()));
    }

    #[test]
    fn test_identity_passes_through() {
        assert_eq!(Identity.apply("same"), None);
    }

    #[test]
    fn test_logger_echoes_and_passes_through() {
        let buf = SharedBuf::default();
        let mut logger = Logger::with_writer(buf.clone());
        assert_eq!(logger.apply("first"), None);
        assert_eq!(logger.apply("second"), None);
        assert_eq!(buf.contents(), "[logger] first\n[logger] second\n");
    }

    #[test]
    fn test_typewriter_echoes_and_passes_through() {
        let buf = SharedBuf::default();
        let mut typewriter = Typewriter::with_writer(buf.clone(), Duration::ZERO);
        assert_eq!(typewriter.apply("hi"), None);
        assert_eq!(buf.contents(), "[typewriter] hi\n");
    }

    #[test]
    fn test_fn_transform() {
        let mut count = 0;
        let mut stage = FnTransform::new("numbered", move |line: &str| {
            count += 1;
            Some(format!("{}:{}", count, line))
        });
        assert_eq!(stage.name(), "numbered");
        assert_eq!(stage.apply("a"), Some("1:a".to_string()));
        assert_eq!(stage.apply("b"), Some("2:b".to_string()));
    }
}
