//! Transaction log events and their line encoding
//!
//! Each event is one text line:
//!
//! ```text
//! <sequence>\t<kind>\t<key>\t<value>\n
//! ```
//!
//! - sequence: decimal u64, assigned by the writer
//! - kind: decimal, 1 = Delete, 2 = Put (wire values, never renumbered)
//! - key, value: raw strings, no escaping
//!
//! Because there is no escaping, keys and values containing tab, CR or LF
//! cannot be represented. `Event::validate` refuses them before they reach
//! the writer.

use std::fmt;

use super::errors::{TxLogError, TxLogResult};

/// Kind of mutation recorded by an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventType {
    /// Key removed
    Delete = 1,
    /// Key set to a value
    Put = 2,
}

impl EventType {
    /// Convert from the wire value, returns None for unknown kinds
    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            1 => Some(EventType::Delete),
            2 => Some(EventType::Put),
            _ => None,
        }
    }

    /// Convert to the wire value
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Delete => write!(f, "DELETE"),
            EventType::Put => write!(f, "PUT"),
        }
    }
}

/// A single mutation event.
///
/// `sequence` is 0 until the writer loop stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub sequence: u64,
    pub kind: EventType,
    pub key: String,
    pub value: String,
}

impl Event {
    /// Create an unstamped Put event
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create an unstamped Delete event
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Return this event stamped with a sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Checks that the event can be written without corrupting the line format.
    pub fn validate(&self) -> TxLogResult<()> {
        validate_key(&self.key)?;
        if self.kind == EventType::Put {
            validate_value(&self.value)?;
        }
        Ok(())
    }

    /// Encode as one `\n`-terminated line.
    ///
    /// Delete events always encode an empty value.
    pub fn encode(&self) -> String {
        let value = match self.kind {
            EventType::Put => self.value.as_str(),
            EventType::Delete => "",
        };
        format!(
            "{}\t{}\t{}\t{}\n",
            self.sequence,
            self.kind.as_u8(),
            self.key,
            value
        )
    }

    /// Decode one line, without its terminator.
    ///
    /// `line_number` is 1-based and only used for error context.
    ///
    /// # Errors
    ///
    /// `KV_TXLOG_PARSE` on wrong field count, non-numeric sequence or kind,
    /// unknown kind, or empty key.
    pub fn decode(line: &str, line_number: u64) -> TxLogResult<Self> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 4 {
            return Err(TxLogError::parse(
                line_number,
                format!("expected 4 tab-separated fields, found {}", fields.len()),
            ));
        }

        let sequence: u64 = fields[0].parse().map_err(|_| {
            TxLogError::parse(
                line_number,
                format!("sequence is not an unsigned integer: {:?}", fields[0]),
            )
        })?;

        let raw_kind: u64 = fields[1].parse().map_err(|_| {
            TxLogError::parse(
                line_number,
                format!("event kind is not an unsigned integer: {:?}", fields[1]),
            )
        })?;
        let kind = EventType::from_u64(raw_kind).ok_or_else(|| {
            TxLogError::parse(line_number, format!("unknown event kind: {}", raw_kind))
        })?;

        if fields[2].is_empty() {
            return Err(TxLogError::parse(line_number, "empty key"));
        }

        let value = match kind {
            EventType::Put => fields[3].to_string(),
            EventType::Delete => String::new(),
        };

        Ok(Self {
            sequence,
            kind,
            key: fields[2].to_string(),
            value,
        })
    }
}

/// Checks a key against the line format: non-empty, no tab/CR/LF.
pub fn validate_key(key: &str) -> TxLogResult<()> {
    if key.is_empty() {
        return Err(TxLogError::InvalidEvent("key must not be empty".into()));
    }
    if has_separator(key) {
        return Err(TxLogError::InvalidEvent(
            "key must not contain tab or newline characters".into(),
        ));
    }
    Ok(())
}

/// Checks a value against the line format: no tab/CR/LF.
pub fn validate_value(value: &str) -> TxLogResult<()> {
    if has_separator(value) {
        return Err(TxLogError::InvalidEvent(
            "value must not contain tab or newline characters".into(),
        ));
    }
    Ok(())
}

fn has_separator(s: &str) -> bool {
    s.contains(['\t', '\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values_are_fixed() {
        assert_eq!(EventType::Delete.as_u8(), 1);
        assert_eq!(EventType::Put.as_u8(), 2);
        assert_eq!(EventType::from_u64(1), Some(EventType::Delete));
        assert_eq!(EventType::from_u64(2), Some(EventType::Put));
        assert_eq!(EventType::from_u64(0), None);
        assert_eq!(EventType::from_u64(3), None);
    }

    #[test]
    fn test_encode_put() {
        let event = Event::put("x", "1").with_sequence(1);
        assert_eq!(event.encode(), "1\t2\tx\t1\n");
    }

    #[test]
    fn test_encode_delete_has_empty_value() {
        let mut event = Event::delete("x").with_sequence(3);
        event.value = "ignored".into();
        assert_eq!(event.encode(), "3\t1\tx\t\n");
    }

    #[test]
    fn test_decode_put_and_delete() {
        let put = Event::decode("1\t2\tx\t1", 1).unwrap();
        assert_eq!(put, Event::put("x", "1").with_sequence(1));

        let delete = Event::decode("3\t1\tx\t", 3).unwrap();
        assert_eq!(delete, Event::delete("x").with_sequence(3));
    }

    #[test]
    fn test_decode_put_with_empty_value() {
        let event = Event::decode("4\t2\tk\t", 1).unwrap();
        assert_eq!(event.kind, EventType::Put);
        assert_eq!(event.value, "");
    }

    #[test]
    fn test_decode_value_with_spaces() {
        let event = Event::decode("9\t2\tgreeting\thello big world", 1).unwrap();
        assert_eq!(event.value, "hello big world");
    }

    #[test]
    fn test_decode_rejects_wrong_field_count() {
        let err = Event::decode("1\t2\tx", 5).unwrap_err();
        assert_eq!(err.code(), "KV_TXLOG_PARSE");
        assert!(err.to_string().contains("line 5"));

        assert!(Event::decode("1\t2\tx\ty\tz", 1).is_err());
        assert!(Event::decode("", 1).is_err());
    }

    #[test]
    fn test_decode_rejects_non_numeric_fields() {
        assert!(matches!(
            Event::decode("one\t2\tx\t1", 1),
            Err(TxLogError::Parse { .. })
        ));
        assert!(matches!(
            Event::decode("1\tput\tx\t1", 1),
            Err(TxLogError::Parse { .. })
        ));
        assert!(matches!(
            Event::decode("-1\t2\tx\t1", 1),
            Err(TxLogError::Parse { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_kind() {
        let err = Event::decode("1\t7\tx\t1", 1).unwrap_err();
        assert!(err.to_string().contains("unknown event kind"));
    }

    #[test]
    fn test_decode_rejects_empty_key() {
        assert!(Event::decode("1\t2\t\tv", 1).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Event::put("k", "v").validate().is_ok());
        assert!(Event::put("k", "").validate().is_ok());
        assert!(Event::put("", "v").validate().is_err());
        assert!(Event::put("a\tb", "v").validate().is_err());
        assert!(Event::put("k", "line1\nline2").validate().is_err());
        assert!(Event::put("k", "cr\r").validate().is_err());
        assert!(Event::delete("k").validate().is_ok());
        assert!(Event::delete("k\n").validate().is_err());
    }
}
