//! Incremental decoding of delimited tabular uploads
//!
//! [`TabularDecoder`] pulls rows from any async byte source and yields one
//! [`Record`] per data row, keyed by the header row. Input is read only as
//! fast as records are requested, and a decoder makes a single pass.
//!
//! Two kinds of failure are kept apart:
//!
//! - stream failures (I/O errors, an undecodable header) end decoding with a
//!   [`DecodeError`]
//! - row problems (wrong cell count, invalid UTF-8 cell) are handled by the
//!   configured [`MalformedRowPolicy`] and recorded as [`RowIssue`]s

use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use gateway_common::{GatewayError, Record};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::warn;

const UTF8_BOM: &str = "\u{feff}";

/// What to do with a data row that does not fit the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Drop the row and record the issue
    #[default]
    Skip,
    /// Fill missing cells with "" and ignore extra cells.
    /// Rows with invalid UTF-8 are still dropped.
    Pad,
    /// Fail the whole stream on the first malformed row
    Reject,
}

#[derive(Debug, Error)]
#[error("Unknown malformed row policy '{0}' (expected skip, pad or reject)")]
pub struct UnknownPolicy(String);

impl std::str::FromStr for MalformedRowPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" | "drop" => Ok(Self::Skip),
            "pad" => Ok(Self::Pad),
            "reject" | "strict" => Ok(Self::Reject),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Decoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    pub delimiter: u8,
    pub malformed_rows: MalformedRowPolicy,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            malformed_rows: MalformedRowPolicy::Skip,
        }
    }
}

/// Why a row could not be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowProblem {
    CellCount { expected: usize, found: usize },
    InvalidUtf8 { column: usize },
}

/// A malformed data row, located by its line in the source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {problem}")]
pub struct RowIssue {
    pub line: u64,
    pub problem: RowProblem,
}

impl std::fmt::Display for RowProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowProblem::CellCount { expected, found } => {
                write!(f, "expected {} cells, found {}", expected, found)
            },
            RowProblem::InvalidUtf8 { column } => write!(f, "cell {} is not valid UTF-8", column),
        }
    }
}

/// Stream-level decoding failures
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to open upload: {0}")]
    Open(#[from] std::io::Error),

    #[error("Failed to read CSV stream: {0}")]
    Stream(#[from] csv_async::Error),

    #[error("Header cell {column} is not valid UTF-8")]
    Header { column: usize },

    #[error("Malformed row rejected: {0}")]
    MalformedRow(RowIssue),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] GatewayError),
}

/// Single-pass, pull-based record decoder
pub struct TabularDecoder<R> {
    reader: AsyncReader<R>,
    policy: MalformedRowPolicy,
    headers: Option<Vec<String>>,
    row: ByteRecord,
    issues: Vec<RowIssue>,
}

impl<R> TabularDecoder<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(input: R, options: DecoderOptions) -> Self {
        let reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(options.delimiter)
            .create_reader(input);

        Self {
            reader,
            policy: options.malformed_rows,
            headers: None,
            row: ByteRecord::new(),
            issues: Vec::new(),
        }
    }

    /// Pull the next record, or `None` at end of input
    pub async fn next_record(&mut self) -> Result<Option<Record>, DecodeError> {
        if self.headers.is_none() {
            self.headers = Some(self.read_headers().await?);
        }
        let headers = self.headers.as_deref().unwrap_or_default();
        if headers.is_empty() {
            return Ok(None);
        }

        loop {
            if !self.reader.read_byte_record(&mut self.row).await? {
                return Ok(None);
            }

            let issue = match decode_row(headers, &self.row, self.policy) {
                Ok(record) => return Ok(Some(record)),
                Err(problem) => RowIssue {
                    line: self.row.position().map(|p| p.line()).unwrap_or_default(),
                    problem,
                },
            };

            if self.policy == MalformedRowPolicy::Reject {
                return Err(DecodeError::MalformedRow(issue));
            }
            warn!(line = issue.line, problem = %issue.problem, "Skipping malformed row");
            self.issues.push(issue);
        }
    }

    /// Rows dropped so far
    pub fn issues(&self) -> &[RowIssue] {
        &self.issues
    }

    async fn read_headers(&mut self) -> Result<Vec<String>, DecodeError> {
        let raw = self.reader.byte_headers().await?;
        raw.iter()
            .enumerate()
            .map(|(column, cell)| {
                let name = std::str::from_utf8(cell).map_err(|_| DecodeError::Header { column })?;
                let name = if column == 0 {
                    name.strip_prefix(UTF8_BOM).unwrap_or(name)
                } else {
                    name
                };
                Ok(name.to_string())
            })
            .collect()
    }
}

fn decode_row(
    headers: &[String],
    row: &ByteRecord,
    policy: MalformedRowPolicy,
) -> Result<Record, RowProblem> {
    if row.len() != headers.len() && policy != MalformedRowPolicy::Pad {
        return Err(RowProblem::CellCount {
            expected: headers.len(),
            found: row.len(),
        });
    }

    let mut record = Record::with_capacity(headers.len());
    for (column, name) in headers.iter().enumerate() {
        let cell = row.get(column).unwrap_or_default();
        let value = std::str::from_utf8(cell).map_err(|_| RowProblem::InvalidUtf8 { column })?;
        record.insert(name.as_str(), value);
    }
    Ok(record)
}
