//! Chunk-fed decoding for streaming transports.

use tracing::trace;

use crate::decoder::Progress;
use crate::serializer::Serializer;
use crate::{PackError, Value};

/// Buffers network chunks and yields each value once all of its bytes have
/// arrived.
///
/// Values may span any number of chunks and one chunk may carry many values.
/// A fatal error means the stream is corrupt: the offending bytes stay
/// buffered and every later call reports the same error. Byte offsets in
/// errors count from the start of the stream.
#[derive(Debug)]
pub struct StreamDecoder<'s> {
    serializer: &'s Serializer,
    buf: Vec<u8>,
    /// Start of the first undecoded byte in `buf`.
    x: usize,
    /// Stream position of `buf[0]`.
    base: usize,
}

impl<'s> StreamDecoder<'s> {
    pub fn new(serializer: &'s Serializer) -> Self {
        Self {
            serializer,
            buf: Vec::new(),
            x: 0,
            base: 0,
        }
    }

    /// Appends a chunk.
    pub fn push(&mut self, chunk: &[u8]) {
        if self.x > 0 && self.x * 2 >= self.buf.len() {
            self.buf.drain(..self.x);
            self.base += self.x;
            self.x = 0;
        }
        self.buf.extend_from_slice(chunk);
    }

    /// The next complete value, or `Ok(None)` until more bytes arrive.
    pub fn next_value(&mut self) -> Result<Option<Value>, PackError> {
        if self.buffered() == 0 {
            return Ok(None);
        }
        let base = self.base;
        let progress = self
            .serializer
            .try_decode(&self.buf, self.x)
            .map_err(|err| err.offset_by(base))?;
        match progress {
            Progress::Complete { value, consumed } => {
                trace!(offset = base + self.x, consumed, "decoded stream frame");
                self.x += consumed;
                Ok(Some(value))
            }
            Progress::Incomplete => Ok(None),
        }
    }

    /// Bytes received but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Malformed;

    #[test]
    fn value_split_across_chunks() {
        let serializer = Serializer::new();
        let bytes = serializer
            .encode(&Value::Array(vec![Value::from("hello"), Value::Integer(300)]))
            .unwrap();
        let mut stream = serializer.stream();
        for chunk in bytes.chunks(2) {
            assert_eq!(stream.next_value(), Ok(None));
            stream.push(chunk);
        }
        assert_eq!(
            stream.next_value(),
            Ok(Some(Value::Array(vec![
                Value::from("hello"),
                Value::Integer(300)
            ])))
        );
        assert_eq!(stream.buffered(), 0);
        assert_eq!(stream.next_value(), Ok(None));
    }

    #[test]
    fn many_values_in_one_chunk() {
        let serializer = Serializer::new();
        let mut stream = serializer.stream();
        stream.push(&[0x01, 0xc0, 0xc3, 0xcd, 0x01]);
        assert_eq!(stream.next_value(), Ok(Some(Value::Integer(1))));
        assert_eq!(stream.next_value(), Ok(Some(Value::Null)));
        assert_eq!(stream.next_value(), Ok(Some(Value::Bool(true))));
        assert_eq!(stream.next_value(), Ok(None));
        assert_eq!(stream.buffered(), 2);
        stream.push(&[0x00]);
        assert_eq!(stream.next_value(), Ok(Some(Value::Integer(256))));
        assert_eq!(stream.buffered(), 0);
    }

    #[test]
    fn corrupt_stream_stays_failed() {
        let serializer = Serializer::new();
        let mut stream = serializer.stream();
        stream.push(&[0x05, 0xc1, 0x06]);
        assert_eq!(stream.next_value(), Ok(Some(Value::Integer(5))));
        let err = Err(PackError::MalformedInput(Malformed::UnknownMarker {
            marker: 0xc1,
            offset: 1,
        }));
        assert_eq!(stream.next_value(), err);
        assert_eq!(stream.next_value(), err);
        assert_eq!(stream.buffered(), 2);
    }

    #[test]
    fn error_offsets_count_from_stream_start() {
        let serializer = Serializer::new();
        let mut stream = serializer.stream();
        stream.push(&[0x01; 10]);
        for _ in 0..10 {
            assert_eq!(stream.next_value(), Ok(Some(Value::Integer(1))));
        }
        // Compacts the ten consumed bytes away.
        stream.push(&[0x02, 0xc1]);
        assert_eq!(stream.buffered(), 2);
        assert_eq!(stream.next_value(), Ok(Some(Value::Integer(2))));
        assert_eq!(
            stream.next_value(),
            Err(PackError::MalformedInput(Malformed::UnknownMarker {
                marker: 0xc1,
                offset: 11,
            }))
        );
        // Later compaction keeps the reported position.
        stream.push(&[0x03]);
        assert_eq!(
            stream.next_value(),
            Err(PackError::MalformedInput(Malformed::UnknownMarker {
                marker: 0xc1,
                offset: 11,
            }))
        );
    }
}
