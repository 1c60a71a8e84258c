//! Binary wire codec for command requests and responses.
//!
//! All integers are big-endian. Strings are written as a 4-byte byte-length
//! prefix followed by their UTF-8 bytes.
//!
//! Request layout:
//! ```text
//! [8: seconds][4: nanos]
//! [4: len][N: team_id] [4: len][N: team_domain]
//! [4: len][N: channel_id] [4: len][N: channel_name]
//! [4: len][N: user_id] [4: len][N: user_name]
//! [4: len][N: command] [4: len][N: arguments, empty when absent]
//! ```
//!
//! Response layout:
//! ```text
//! [4: result ordinal][4: message_len][N: message]
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::request::{CommandRequest, ValidationError};
use crate::response::{CommandResponse, ResultCode};

/// Errors raised while decoding a wire buffer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("buffer truncated reading {field}: need {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    #[error("unknown result code ordinal: {0}")]
    UnknownResultCode(u32),

    #[error("timestamp out of range: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: u32 },

    #[error("{0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("decoded request is invalid: {0}")]
    Validation(#[from] ValidationError),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Cursor over a wire buffer that never reads past its end
struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, needed: usize, field: &'static str) -> CodecResult<&'a [u8]> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(CodecError::Truncated {
                field,
                needed,
                remaining,
            });
        }
        let bytes = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> CodecResult<[u8; N]> {
        let bytes = self.take(N, field)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_u32(&mut self, field: &'static str) -> CodecResult<u32> {
        Ok(u32::from_be_bytes(self.take_array(field)?))
    }

    fn read_i64(&mut self, field: &'static str) -> CodecResult<i64> {
        Ok(i64::from_be_bytes(self.take_array(field)?))
    }

    fn read_string(&mut self, field: &'static str) -> CodecResult<String> {
        let len = self.read_u32(field)? as usize;
        let bytes = self.take(len, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8 { field })
    }

    fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_be_bytes());
    buf.extend_from_slice(value.as_bytes());
}

impl CommandRequest {
    /// Encode the request into its wire representation
    pub fn encode(&self) -> Vec<u8> {
        let timestamp = self.timestamp();
        let fields = [
            self.team_id(),
            self.team_domain(),
            self.channel_id(),
            self.channel_name(),
            self.user_id(),
            self.user_name(),
            self.command(),
            self.arguments().unwrap_or(""),
        ];

        let capacity = 12 + fields.iter().map(|f| 4 + f.len()).sum::<usize>();
        let mut buf = Vec::with_capacity(capacity);

        buf.extend_from_slice(&timestamp.timestamp().to_be_bytes());
        buf.extend_from_slice(&timestamp.timestamp_subsec_nanos().to_be_bytes());
        for field in fields {
            write_string(&mut buf, field);
        }

        buf
    }

    /// Decode a request from its wire representation
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let mut reader = WireReader::new(data);

        let seconds = reader.read_i64("timestamp seconds")?;
        let nanos = reader.read_u32("timestamp nanos")?;
        let timestamp: DateTime<Utc> =
            DateTime::from_timestamp(seconds, nanos).ok_or(CodecError::InvalidTimestamp { seconds, nanos })?;

        let team_id = reader.read_string("team identifier")?;
        let team_domain = reader.read_string("team domain")?;
        let channel_id = reader.read_string("channel identifier")?;
        let channel_name = reader.read_string("channel name")?;
        let user_id = reader.read_string("user identifier")?;
        let user_name = reader.read_string("user name")?;
        let command = reader.read_string("command")?;
        let arguments = reader.read_string("arguments")?;
        reader.finish()?;

        let request = CommandRequest::builder()
            .timestamp(timestamp)
            .team_id(team_id)
            .team_domain(team_domain)
            .channel_id(channel_id)
            .channel_name(channel_name)
            .user_id(user_id)
            .user_name(user_name)
            .command(command)
            .arguments(arguments)
            .build()?;

        Ok(request)
    }
}

impl CommandResponse {
    /// Encode the response into its wire representation
    pub fn encode(&self) -> Vec<u8> {
        let message = self.message().unwrap_or("");
        let mut buf = Vec::with_capacity(8 + message.len());

        buf.extend_from_slice(&self.code().ordinal().to_be_bytes());
        write_string(&mut buf, message);

        buf
    }

    /// Decode a response from its wire representation
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let mut reader = WireReader::new(data);

        let ordinal = reader.read_u32("result code")?;
        let code = ResultCode::from_ordinal(ordinal).ok_or(CodecError::UnknownResultCode(ordinal))?;
        let message = reader.read_string("message")?;
        reader.finish()?;

        Ok(CommandResponse::new(code, Some(message)))
    }
}
