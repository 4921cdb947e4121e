use std::cell::RefCell;
use std::io::{Result as IoResult, Write};
use std::rc::Rc;

/// Memory-backed writer for capturing what a session prints.
///
/// Cloning the handle returned by [`MemWriter::with_handle`] lets a caller read
/// the bytes after the writer has been moved into a [`Session`](crate::Session).
#[derive(Debug, Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer and return it with a handle to its buffer.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let writer = MemWriter::new();
        let handle = writer.buf.clone();
        (writer, handle)
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(handle: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&handle.borrow()).into_owned()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_sees_writes() {
        let (mut writer, handle) = MemWriter::with_handle();
        write!(writer, "hello ").unwrap();
        writeln!(writer, "world").unwrap();
        assert_eq!(MemWriter::contents(&handle), "hello world\n");
    }
}
