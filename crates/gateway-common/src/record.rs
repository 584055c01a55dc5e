//! Decoded rows and the messages built from them
//!
//! A [`Record`] is one data row of an uploaded table, keyed by column name.
//! Each record becomes one [`OutboundMessage`] carrying its JSON encoding, and
//! the messages of one upload are collected, in decode order, into a
//! [`MessageBatch`] that is published as a single unit.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One decoded data row: column name to cell value, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Set a column value.
    ///
    /// A repeated column keeps the position of its first occurrence and the
    /// value of its last one.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// A record encoded for the message bus. Messages carry no key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    payload: String,
}

impl OutboundMessage {
    pub fn from_record(record: &Record) -> crate::Result<Self> {
        Ok(Self {
            payload: serde_json::to_string(record)?,
        })
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }
}

/// Ordered messages produced by one ingestion request
#[derive(Debug, Clone, Default)]
pub struct MessageBatch {
    messages: Vec<OutboundMessage>,
}

impl MessageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `record` and append it to the end of the batch
    pub fn push_record(&mut self, record: &Record) -> crate::Result<()> {
        self.messages.push(OutboundMessage::from_record(record)?);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_in_header_order() {
        let mut record = Record::new();
        record.insert("population", "2000000");
        record.insert("name", "Paris");

        let encoded = serde_json::to_string(&record).unwrap();
        assert_eq!(encoded, r#"{"population":"2000000","name":"Paris"}"#);
    }

    #[test]
    fn test_duplicate_column_keeps_last_value() {
        let mut record = Record::new();
        record.insert("city", "Lyon");
        record.insert("code", "69");
        record.insert("city", "Paris");

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("city"), Some("Paris"));
        let columns: Vec<_> = record.iter().map(|(name, _)| name).collect();
        assert_eq!(columns, vec!["city", "code"]);
    }

    #[test]
    fn test_batch_preserves_order_and_decodes_back() {
        let mut batch = MessageBatch::new();
        for (name, population) in [("Paris", "2000000"), ("Lyon", "500000")] {
            let mut record = Record::new();
            record.insert("name", name);
            record.insert("population", population);
            batch.push_record(&record).unwrap();
        }

        assert_eq!(batch.len(), 2);
        let decoded: Vec<serde_json::Value> = batch
            .messages()
            .iter()
            .map(|m| serde_json::from_str(m.payload()).unwrap())
            .collect();
        assert_eq!(decoded[0], json!({"name": "Paris", "population": "2000000"}));
        assert_eq!(decoded[1], json!({"name": "Lyon", "population": "500000"}));
    }

    #[test]
    fn test_empty_batch() {
        let batch = MessageBatch::new();
        assert!(batch.is_empty());
        assert!(batch.messages().is_empty());
    }
}
