//! Descriptor consumers.

use std::io::Write;

use crate::{metadata::MemoDescriptor, Result};

/// Receives one descriptor per memoized function.
pub trait MetadataSink: Send {
    /// Consumes a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor cannot be recorded.
    fn emit(&mut self, descriptor: &MemoDescriptor) -> Result<()>;

    /// Flushes buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps descriptors in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    descriptors: Vec<MemoDescriptor>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected descriptors in emission order.
    #[must_use]
    pub fn descriptors(&self) -> &[MemoDescriptor] {
        &self.descriptors
    }

    /// Consumes the sink and returns the descriptors.
    #[must_use]
    pub fn into_descriptors(self) -> Vec<MemoDescriptor> {
        self.descriptors
    }
}

impl MetadataSink for CollectingSink {
    fn emit(&mut self, descriptor: &MemoDescriptor) -> Result<()> {
        self.descriptors.push(descriptor.clone());
        Ok(())
    }
}

/// Writes each descriptor as one JSON object per line.
///
/// # Example
///
/// ```rust
/// use memoscope::metadata::{JsonLinesSink, MemoDescriptor, MetadataSink};
///
/// # fn main() -> memoscope::Result<()> {
/// let mut sink = JsonLinesSink::new(Vec::new());
/// sink.emit(&MemoDescriptor {
///     original_name: "f".into(),
///     memoized_name: "_memoized__f".into(),
///     parameter_order: Vec::new(),
///     constant_key_fragments: vec!["5".into()],
///     call_sites: 1,
/// })?;
///
/// let text = String::from_utf8(sink.into_inner()).unwrap();
/// assert_eq!(text.lines().count(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Returns the number of descriptors written.
    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> MetadataSink for JsonLinesSink<W> {
    fn emit(&mut self, descriptor: &MemoDescriptor) -> Result<()> {
        serde_json::to_writer(&mut self.writer, descriptor)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
