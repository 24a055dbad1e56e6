use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Reads top-level JSON objects from an unbounded byte stream.
///
/// The host does not delimit documents: consecutive objects may arrive
/// back-to-back (`}{`) or separated by whitespace. Objects are split at a
/// closing brace whose next non-whitespace byte opens a new object; at the
/// top level that pattern cannot occur inside a single valid document
/// outside of string literals.
///
/// A chunk produced by such a split that does not parse means the stream
/// itself is corrupt. That error is unrecoverable: the caller is expected
/// to exit and let the host restart the plugin.
pub struct JsonReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R> JsonReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// The next object in the stream, or `None` once the host closed it.
    pub async fn read_object(&mut self) -> Result<Option<serde_json::Value>> {
        loop {
            if let Some(value) = self.take_object()? {
                return Ok(Some(value));
            }

            let mut chunk = [0u8; 4096];
            let n = self
                .reader
                .read(&mut chunk)
                .await
                .context("Failed to read from the host stream")?;

            if n == 0 {
                if self.buffer.iter().all(|b| b.is_ascii_whitespace()) {
                    return Ok(None);
                }
                let value = serde_json::from_slice(&self.buffer)
                    .context("Host stream ended inside a JSON object")?;
                self.buffer.clear();
                return Ok(Some(value));
            }

            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }

    fn take_object(&mut self) -> Result<Option<serde_json::Value>> {
        if let Some(end) = find_boundary(&self.buffer) {
            let head: Vec<u8> = self.buffer.drain(..end).collect();
            let value = serde_json::from_slice(&head)
                .context("Failed to parse a JSON object split from the host stream")?;
            return Ok(Some(value));
        }

        // No boundary in sight; the buffer may still hold exactly one
        // complete object (e.g. the last one before the host pauses).
        match serde_json::from_slice::<serde_json::Value>(&self.buffer) {
            Ok(value) => {
                self.buffer.clear();
                Ok(Some(value))
            }
            Err(err) if err.is_eof() => Ok(None),
            Err(err) => {
                Err(err).context("Failed to parse a JSON object from the host stream")
            }
        }
    }
}

/// Index one past the `}` that ends the first object, if the bytes after it
/// (ignoring whitespace) already open the next one.
fn find_boundary(buffer: &[u8]) -> Option<usize> {
    for (i, byte) in buffer.iter().enumerate() {
        if *byte != b'}' {
            continue;
        }
        let mut next = i + 1;
        while next < buffer.len() && buffer[next].is_ascii_whitespace() {
            next += 1;
        }
        if next < buffer.len() && buffer[next] == b'{' {
            return Some(i + 1);
        }
    }
    None
}

/// Writes one JSON object per call, flushing immediately.
///
/// The flush is not optional: the host watches response latency, and a
/// buffered response looks identical to a hung plugin.
pub struct JsonWriter<W> {
    writer: W,
}

impl<W> JsonWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_object(&mut self, value: &serde_json::Value) -> Result<()> {
        let mut payload = serde_json::to_vec(value).context("Failed to serialize JSON object")?;
        payload.extend_from_slice(b"\n\n");

        self.writer
            .write_all(&payload)
            .await
            .context("Failed to write to the host stream")?;
        self.writer
            .flush()
            .await
            .context("Failed to flush the host stream")?;
        Ok(())
    }
}
