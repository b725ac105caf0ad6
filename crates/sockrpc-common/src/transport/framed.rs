use crate::protocol::{TransportError, TransportErrorKind};
use crate::transport::Channel;

/// Maximum inbound frame size (100 MB).
///
/// A length prefix above this is rejected before any allocation.
pub const MAX_FRAME_SIZE: usize = 100 * 1024 * 1024;

/// Size of the big-endian length prefix.
const LENGTH_PREFIX_SIZE: usize = 4;

/// Length-prefixed framing over any [`Channel`].
///
/// # Wire Protocol
///
/// ```text
/// [4-byte length as u32 big-endian] [payload]
/// ```
///
/// Writes accumulate locally until [`flush`](Channel::flush), which sends the
/// prefix and the accumulated bytes as one unit. Reads are served from a
/// single buffered frame; a new frame is fetched only once the buffered one
/// has been consumed. A `read(n)` never spans two frames: asking for more than
/// the current frame holds returns only what is left of it.
///
/// # Example
///
/// ```no_run
/// use sockrpc_common::endpoint::{Endpoint, TimeoutSpec};
/// use sockrpc_common::transport::{Channel, FramedTransport, RawSocketTransport};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let socket = RawSocketTransport::new(Endpoint::inet("127.0.0.1", 9090), TimeoutSpec::default())?;
/// let mut framed = FramedTransport::new(socket);
/// framed.open()?;
///
/// framed.write(b"hello")?;
/// framed.flush()?; // sends [0, 0, 0, 5] ++ "hello"
///
/// let head = framed.read(3)?; // first three bytes of the reply frame
/// let rest = framed.read_frame()?; // whatever is left of that frame
/// # Ok(())
/// # }
/// ```
pub struct FramedTransport<C> {
    inner: C,
    write_buf: Vec<u8>,
    pending: Option<Vec<u8>>,
    cursor: usize,
}

impl<C: Channel> FramedTransport<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            write_buf: Vec::new(),
            pending: None,
            cursor: 0,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Returns the unread remainder of the current frame, fetching a new
    /// frame first if none is buffered.
    pub fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        self.read(usize::MAX)
    }

    /// Bytes of the buffered frame not yet handed out.
    pub fn buffered_len(&self) -> usize {
        self.pending
            .as_ref()
            .map(|frame| frame.len() - self.cursor)
            .unwrap_or(0)
    }

    fn reset_buffers(&mut self) {
        self.write_buf.clear();
        self.pending = None;
        self.cursor = 0;
    }

    fn fetch_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        let header = self.inner.read(LENGTH_PREFIX_SIZE)?;
        let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
        len_buf.copy_from_slice(&header);
        let len = u32::from_be_bytes(len_buf) as usize;

        if len == 0 {
            return Err(TransportError::connection_reset(
                "Received empty frame",
                self.inner.domain(),
            ));
        }
        if len > MAX_FRAME_SIZE {
            return Err(TransportError::new(
                TransportErrorKind::FrameTooLarge,
                format!("Frame of {} bytes exceeds limit of {} bytes", len, MAX_FRAME_SIZE),
                self.inner.domain(),
            ));
        }

        self.inner.read(len)
    }
}

impl<C: Channel> Channel for FramedTransport<C> {
    fn open(&mut self) -> Result<(), TransportError> {
        self.inner.open()
    }

    /// Closes the underlying channel and discards any partial frame state.
    fn close(&mut self) {
        self.reset_buffers();
        self.inner.close();
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn read(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
        if len == 0 {
            return Ok(Vec::new());
        }

        if self.pending.is_none() {
            let frame = self.fetch_frame()?;
            self.pending = Some(frame);
            self.cursor = 0;
        }

        let Some(frame) = self.pending.as_ref() else {
            return Ok(Vec::new());
        };
        let remaining = frame.len() - self.cursor;

        if len >= remaining {
            let out = frame[self.cursor..].to_vec();
            self.pending = None;
            self.cursor = 0;
            Ok(out)
        } else {
            let out = frame[self.cursor..self.cursor + len].to_vec();
            self.cursor += len;
            Ok(out)
        }
    }

    /// Appends to the outgoing frame; nothing reaches the channel until `flush`.
    fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.write_buf.extend_from_slice(buf);
        Ok(())
    }

    /// Sends the accumulated bytes as one frame and clears the accumulator.
    ///
    /// With nothing accumulated only the underlying channel is flushed; an
    /// empty frame would read as a reset on the other side.
    fn flush(&mut self) -> Result<(), TransportError> {
        let payload = std::mem::take(&mut self.write_buf);
        if payload.is_empty() {
            return self.inner.flush();
        }

        let len = u32::try_from(payload.len()).map_err(|_| {
            TransportError::new(
                TransportErrorKind::FrameTooLarge,
                format!("Outgoing frame of {} bytes does not fit a u32 length", payload.len()),
                self.inner.domain(),
            )
        })?;

        let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
        frame.extend_from_slice(&len.to_be_bytes());
        frame.extend_from_slice(&payload);

        self.inner.write(&frame)?;
        self.inner.flush()
    }

    /// Replaces the connection; any buffered frame is discarded so the next
    /// call starts from a clean state.
    fn reconnect(&mut self) -> Result<(), TransportError> {
        self.reset_buffers();
        self.inner.reconnect()
    }

    fn domain(&self) -> String {
        self.inner.domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// In-memory channel: reads drain `input`, writes append to `output`.
    #[derive(Default)]
    struct ScriptedChannel {
        input: VecDeque<u8>,
        output: Vec<u8>,
        open: bool,
        reads: usize,
    }

    impl ScriptedChannel {
        fn with_input(bytes: &[u8]) -> Self {
            Self {
                input: bytes.iter().copied().collect(),
                open: true,
                ..Default::default()
            }
        }
    }

    impl Channel for ScriptedChannel {
        fn open(&mut self) -> Result<(), TransportError> {
            self.open = true;
            Ok(())
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn is_open(&self) -> bool {
            self.open
        }

        fn read(&mut self, len: usize) -> Result<Vec<u8>, TransportError> {
            self.reads += 1;
            if self.input.len() < len {
                return Err(TransportError::connection_reset("script exhausted", "mem"));
            }
            Ok(self.input.drain(..len).collect())
        }

        fn write(&mut self, buf: &[u8]) -> Result<(), TransportError> {
            self.output.extend_from_slice(buf);
            Ok(())
        }

        fn flush(&mut self) -> Result<(), TransportError> {
            Ok(())
        }

        fn domain(&self) -> String {
            "mem".to_string()
        }
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut out = (payload.len() as u32).to_be_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn test_split_read_of_single_frame() {
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&frame(b"hello")));

        assert_eq!(framed.read(3).unwrap(), b"hel");
        assert_eq!(framed.buffered_len(), 2);
        assert_eq!(framed.read(2).unwrap(), b"lo");
        assert_eq!(framed.buffered_len(), 0);
        assert_eq!(framed.inner().reads, 2);

        // Buffer is exhausted: the next read must go back to the channel
        let err = framed.read(1).unwrap_err();
        assert!(err.is_connection_reset());
        assert_eq!(framed.inner().reads, 3);
    }

    #[test]
    fn test_read_never_crosses_frame_boundary() {
        let mut input = frame(b"abc");
        input.extend(frame(b"defgh"));
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&input));

        assert_eq!(framed.read(100).unwrap(), b"abc");
        assert_eq!(framed.read(2).unwrap(), b"de");
        assert_eq!(framed.read_frame().unwrap(), b"fgh");
    }

    #[test]
    fn test_chunked_reads_reassemble_payload() {
        let payload: Vec<u8> = (0..1000u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&frame(&payload)));

        let mut collected = Vec::new();
        for chunk in [1, 7, 64, 3, 500, 1000] {
            if collected.len() == payload.len() {
                break;
            }
            collected.extend(framed.read(chunk).unwrap());
        }
        assert_eq!(collected, payload);
    }

    #[test]
    fn test_empty_frame_is_connection_reset() {
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&[0, 0, 0, 0]));
        let err = framed.read(4).unwrap_err();
        assert!(err.is_connection_reset());
    }

    #[test]
    fn test_oversized_frame_rejected() {
        let header = ((MAX_FRAME_SIZE + 1) as u32).to_be_bytes();
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&header));
        let err = framed.read(4).unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::FrameTooLarge);
    }

    #[test]
    fn test_writes_are_buffered_until_flush() {
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&[]));
        framed.write(b"hel").unwrap();
        framed.write(b"lo").unwrap();
        assert!(framed.inner().output.is_empty());

        framed.flush().unwrap();
        assert_eq!(framed.inner().output, frame(b"hello"));

        // Accumulator is cleared after flush
        framed.flush().unwrap();
        assert_eq!(framed.inner().output, frame(b"hello"));
    }

    #[test]
    fn test_reconnect_discards_buffered_frame() {
        let mut input = frame(b"stale");
        input.extend(frame(b"fresh"));
        let mut framed = FramedTransport::new(ScriptedChannel::with_input(&input));

        assert_eq!(framed.read(2).unwrap(), b"st");
        framed.write(b"half-written").unwrap();
        framed.reconnect().unwrap();

        assert_eq!(framed.buffered_len(), 0);
        assert_eq!(framed.read_frame().unwrap(), b"fresh");
        framed.flush().unwrap();
        assert!(framed.inner().output.is_empty());
    }

    #[test]
    fn test_write_flush_read_round_trip() {
        let mut writer = FramedTransport::new(ScriptedChannel::with_input(&[]));
        let payload = br#"{"method":"add","args":[1,2]}"#;
        writer.write(payload).unwrap();
        writer.flush().unwrap();

        let wire = writer.into_inner().output;
        let mut reader = FramedTransport::new(ScriptedChannel::with_input(&wire));
        assert_eq!(reader.read_frame().unwrap(), payload);
    }
}
