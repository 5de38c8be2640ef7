//! Transaction log reader with corruption detection
//!
//! Zero tolerance:
//! - the first malformed record stops the read
//! - the first record whose sequence does not advance stops the read
//! - no records are skipped and nothing is repaired
//!
//! A record is only complete once its `\n` terminator is on disk. A final
//! line without one is a torn write and reads as a parse error.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::errors::{TxLogError, TxLogResult};
use super::event::Event;

/// Sequential reader over a transaction log.
pub struct TxLogReader<R = BufReader<File>> {
    reader: R,
    /// Lines accepted so far
    line: u64,
    /// Bytes accepted so far
    offset: u64,
    /// Last accepted sequence number
    last_sequence: u64,
}

impl TxLogReader<BufReader<File>> {
    /// Opens a log file for reading from its first record.
    ///
    /// # Errors
    ///
    /// Returns `KV_TXLOG_IO` if the file cannot be opened.
    pub fn open(path: &Path) -> TxLogResult<Self> {
        let file = File::open(path).map_err(|e| {
            TxLogError::io(
                format!("cannot open transaction log file {}", path.display()),
                e,
            )
        })?;
        Ok(Self::new(BufReader::new(file), 0))
    }
}

impl<R: BufRead> TxLogReader<R> {
    /// Wraps a buffered reader.
    ///
    /// Every record must carry a sequence strictly greater than
    /// `last_sequence`.
    pub fn new(reader: R, last_sequence: u64) -> Self {
        Self {
            reader,
            line: 0,
            offset: 0,
            last_sequence,
        }
    }

    /// Returns the last accepted sequence number.
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence
    }

    /// Returns the byte offset just past the last accepted record.
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Returns the number of records accepted so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }

    /// Reads the next record.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))` for an accepted record
    /// - `Ok(None)` on clean end of file
    ///
    /// # Errors
    ///
    /// - `KV_TXLOG_PARSE` for a malformed, non UTF-8 or unterminated record
    /// - `KV_TXLOG_SEQUENCE` if the sequence does not exceed the last one
    /// - `KV_TXLOG_IO` if the underlying read fails
    pub fn read_next(&mut self) -> TxLogResult<Option<Event>> {
        let mut buf = Vec::new();
        let n = self
            .reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| TxLogError::io("transaction log read failure", e))?;

        if n == 0 {
            return Ok(None);
        }

        let line_number = self.line + 1;

        if buf.pop() != Some(b'\n') {
            return Err(TxLogError::parse(
                line_number,
                "truncated record: missing line terminator",
            ));
        }

        let line = String::from_utf8(buf)
            .map_err(|_| TxLogError::parse(line_number, "record is not valid UTF-8"))?;

        let event = Event::decode(&line, line_number)?;

        if event.sequence <= self.last_sequence {
            return Err(TxLogError::Sequence {
                line: line_number,
                sequence: event.sequence,
                last: self.last_sequence,
            });
        }

        self.line = line_number;
        self.offset += n as u64;
        self.last_sequence = event.sequence;

        Ok(Some(event))
    }

    /// Reads every remaining record, failing on the first bad one.
    pub fn read_all(&mut self) -> TxLogResult<Vec<Event>> {
        let mut events = Vec::new();
        while let Some(event) = self.read_next()? {
            events.push(event);
        }
        Ok(events)
    }
}

/// Iterator adapter for TxLogReader.
///
/// Stops on the first error, which is kept for the caller to inspect.
pub struct TxLogIterator<R> {
    reader: TxLogReader<R>,
    error: Option<TxLogError>,
}

impl<R: BufRead> TxLogIterator<R> {
    /// Returns the error if iteration stopped early.
    pub fn error(&self) -> Option<&TxLogError> {
        self.error.as_ref()
    }

    /// Returns the last accepted sequence number.
    pub fn last_sequence_number(&self) -> u64 {
        self.reader.last_sequence_number()
    }

    /// Returns the byte offset just past the last accepted record.
    pub fn current_offset(&self) -> u64 {
        self.reader.current_offset()
    }

    /// Returns the number of records accepted so far.
    pub fn lines_read(&self) -> u64 {
        self.reader.lines_read()
    }

    /// Consumes the iterator and returns the error if any.
    pub fn into_error(self) -> Option<TxLogError> {
        self.error
    }
}

impl<R: BufRead> Iterator for TxLogIterator<R> {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() {
            return None;
        }

        match self.reader.read_next() {
            Ok(event) => event,
            Err(e) => {
                self.error = Some(e);
                None
            }
        }
    }
}

impl<R: BufRead> IntoIterator for TxLogReader<R> {
    type Item = Event;
    type IntoIter = TxLogIterator<R>;

    fn into_iter(self) -> Self::IntoIter {
        TxLogIterator {
            reader: self,
            error: None,
        }
    }
}
