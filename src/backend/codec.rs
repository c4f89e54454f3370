//! On-disk record formats.
//!
//! Three layouts are in use across the portal's data files:
//!
//! * [`DelimitedCodec`]: one record per line, fields joined by `|`.
//! * [`BlockCodec`]: one field per line, each record closed by `--END--`.
//! * [`FixedCodec`]: raw fixed-size slots with no header; the record count is
//!   the file length divided by the slot size.
//!
//! Decoding never fails. Records that cannot be parsed are counted and
//! skipped, and records past the store capacity are counted and dropped.

pub const DELIMITER: char = '|';
pub const BLOCK_SENTINEL: &str = "--END--";

/// Records stored as an ordered list of text fields.
pub trait TextFields: Sized {
    const FIELD_COUNT: usize;

    fn to_fields(&self) -> Vec<String>;

    /// `fields.len()` is always `FIELD_COUNT`. Return `None` to reject the
    /// record, e.g. when a number does not parse.
    fn from_fields(fields: &[&str]) -> Option<Self>;
}

/// Records stored as a fixed-size byte slot.
pub trait FixedLayout: Sized {
    const SIZE: usize;

    fn write_slot(&self, slot: &mut SlotWriter);

    fn read_slot(slot: &mut SlotReader<'_>) -> Option<Self>;
}

#[derive(Debug)]
pub struct Decoded<R> {
    pub records: Vec<R>,
    /// Malformed records that were passed over.
    pub skipped: usize,
    /// Well-formed records left out because the store was full.
    pub dropped: usize,
}

impl<R> Default for Decoded<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: 0,
            dropped: 0,
        }
    }
}

impl<R> Decoded<R> {
    fn admit(&mut self, record: Option<R>, capacity: usize) {
        match record {
            None => self.skipped += 1,
            Some(_) if self.records.len() >= capacity => self.dropped += 1,
            Some(r) => self.records.push(r),
        }
    }
}

pub trait Codec<R> {
    fn decode(&self, bytes: &[u8], capacity: usize) -> Decoded<R>;

    /// Encodes `records` so that concatenating two encodings yields the
    /// encoding of both lists. Append-only stores depend on this.
    fn encode(&self, records: &[R]) -> Vec<u8>;

    /// Byte every encoded record ends with, if any. An append has to start
    /// after one.
    fn terminator(&self) -> Option<u8> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct BlockCodec;

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCodec;

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|l| l.trim_end_matches('\r').to_owned())
        .collect()
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

// A field that would read back as the sentinel gets one extra leading space,
// which the reader takes off again.
fn escape_block_line(line: String) -> String {
    if line.trim_start_matches(' ') == BLOCK_SENTINEL {
        format!(" {}", line)
    } else {
        line
    }
}

fn unescape_block_line(line: &str) -> &str {
    match line.strip_prefix(' ') {
        Some(rest) if rest.trim_start_matches(' ') == BLOCK_SENTINEL => rest,
        _ => line,
    }
}

impl<R: TextFields> Codec<R> for DelimitedCodec {
    fn decode(&self, bytes: &[u8], capacity: usize) -> Decoded<R> {
        let mut out = Decoded::default();

        for line in lines(bytes) {
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(DELIMITER).collect();
            let record = if fields.len() == R::FIELD_COUNT {
                R::from_fields(&fields)
            } else {
                None
            };

            out.admit(record, capacity);
        }

        out
    }

    fn encode(&self, records: &[R]) -> Vec<u8> {
        let mut out = String::new();

        for record in records {
            let fields: Vec<String> = record
                .to_fields()
                .iter()
                .map(|f| single_line(f).replace(DELIMITER, " "))
                .collect();
            out.push_str(&fields.join("|"));
            out.push('\n');
        }

        out.into_bytes()
    }

    fn terminator(&self) -> Option<u8> {
        Some(b'\n')
    }
}

impl<R: TextFields> Codec<R> for BlockCodec {
    fn decode(&self, bytes: &[u8], capacity: usize) -> Decoded<R> {
        let mut out = Decoded::default();
        let all = lines(bytes);
        let mut lines = all.iter().map(String::as_str);

        'records: while let Some(key) = lines.next() {
            if key.trim().is_empty() || key == BLOCK_SENTINEL {
                continue;
            }

            let mut fields = vec![unescape_block_line(key)];
            while fields.len() < R::FIELD_COUNT {
                match lines.next() {
                    Some(BLOCK_SENTINEL) => {
                        // closed early, the reader is already at the next record
                        out.skipped += 1;
                        continue 'records;
                    }
                    Some(line) => fields.push(unescape_block_line(line)),
                    None => {
                        out.skipped += 1;
                        break 'records;
                    }
                }
            }

            match lines.next() {
                // a missing sentinel on the final record is tolerated
                Some(BLOCK_SENTINEL) | None => out.admit(R::from_fields(&fields), capacity),
                Some(_) => {
                    out.skipped += 1;
                    for line in lines.by_ref() {
                        if line == BLOCK_SENTINEL {
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    fn encode(&self, records: &[R]) -> Vec<u8> {
        let mut out = String::new();

        for record in records {
            for field in record.to_fields() {
                out.push_str(&escape_block_line(single_line(&field)));
                out.push('\n');
            }
            out.push_str(BLOCK_SENTINEL);
            out.push('\n');
        }

        out.into_bytes()
    }

    fn terminator(&self) -> Option<u8> {
        Some(b'\n')
    }
}

impl<R: FixedLayout> Codec<R> for FixedCodec {
    fn decode(&self, bytes: &[u8], capacity: usize) -> Decoded<R> {
        let mut out = Decoded::default();

        for chunk in bytes.chunks_exact(R::SIZE) {
            if out.records.len() >= capacity {
                // slots past capacity are not read at all
                out.dropped += 1;
                continue;
            }

            let mut reader = SlotReader::new(chunk);
            out.admit(R::read_slot(&mut reader), capacity);
        }

        out
    }

    fn encode(&self, records: &[R]) -> Vec<u8> {
        let mut out = Vec::with_capacity(records.len() * R::SIZE);

        for record in records {
            let mut slot = SlotWriter::new(R::SIZE);
            record.write_slot(&mut slot);
            out.extend_from_slice(&slot.finish());
        }

        out
    }
}

/// Sequential writer over one zero-filled slot.
pub struct SlotWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl SlotWriter {
    fn new(size: usize) -> Self {
        Self {
            buf: vec![0; size],
            pos: 0,
        }
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        self.bytes(&value.to_le_bytes())
    }

    /// Writes `value` into a `width` byte field, NUL padded. At most
    /// `width - 1` bytes of text are kept so the field stays terminated.
    pub fn str(&mut self, value: &str, width: usize) -> &mut Self {
        let mut end = value.len().min(width.saturating_sub(1));
        while !value.is_char_boundary(end) {
            end -= 1;
        }

        let mut field = vec![0u8; width];
        field[..end].copy_from_slice(&value.as_bytes()[..end]);
        self.bytes(&field)
    }

    fn bytes(&mut self, data: &[u8]) -> &mut Self {
        let end = (self.pos + data.len()).min(self.buf.len());
        let n = end - self.pos;
        self.buf[self.pos..end].copy_from_slice(&data[..n]);
        self.pos = end;
        self
    }

    /// Skips alignment padding.
    pub fn pad(&mut self, n: usize) -> &mut Self {
        self.pos = (self.pos + n).min(self.buf.len());
        self
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Sequential reader over one slot.
pub struct SlotReader<'a> {
    slot: &'a [u8],
    pos: usize,
}

impl<'a> SlotReader<'a> {
    fn new(slot: &'a [u8]) -> Self {
        Self { slot, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let slot: &'a [u8] = self.slot;
        let bytes = slot.get(self.pos..self.pos + n)?;
        self.pos += n;
        Some(bytes)
    }

    pub fn i32(&mut self) -> Option<i32> {
        let bytes = self.take(4)?;
        Some(i32::from_le_bytes(bytes.try_into().ok()?))
    }

    /// Reads a NUL-terminated string from a `width` byte field. Invalid
    /// UTF-8 rejects the whole record.
    pub fn str(&mut self, width: usize) -> Option<String> {
        let field = self.take(width)?;
        let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
        std::str::from_utf8(&field[..len]).ok().map(str::to_owned)
    }

    pub fn pad(&mut self, n: usize) -> Option<()> {
        self.take(n).map(|_| ())
    }
}

/// Strict integer field: surrounding whitespace is allowed, anything else
/// rejects the record.
pub fn int_field<T: std::str::FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

/// Lenient integer parse for form input: blank or garbage becomes `default`.
pub fn int_or<T: std::str::FromStr>(text: &str, default: T) -> T {
    text.trim().parse().unwrap_or(default)
}
