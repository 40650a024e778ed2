//! Variable-width integer and NUL-terminated string codec used by Cube2 UDP
//! info replies, plus the fixed-order reply parser described in the
//! protocol's query format.

use thiserror::Error;

use super::cube2;

/// The literal 5-byte UDP info-probe request.
pub const PROBE_REQUEST: [u8; 5] = [0x81, 0xEC, 0x04, 0x01, 0x00];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("short read: expected {expected} more byte(s), {available} available")]
    ShortRead { expected: usize, available: usize },
    #[error("string was not NUL-terminated before the end of the buffer")]
    UnterminatedString,
}

/// A cursor over a query-reply byte buffer.
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], QueryError> {
        if self.remaining() < n {
            return Err(QueryError::ShortRead {
                expected: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Decode one variable-width signed integer.
    fn next_int(&mut self) -> Result<i64, QueryError> {
        let first = self.take(1)?[0] as i8;
        match first {
            -128 => {
                let raw = self.take(2)?;
                Ok(i16::from_le_bytes([raw[0], raw[1]]) as i64)
            }
            -127 => {
                let raw = self.take(4)?;
                Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64)
            }
            other => Ok(other as i64),
        }
    }

    /// Decode one NUL-terminated, Cube2-encoded string.
    fn next_string(&mut self) -> Result<String, QueryError> {
        let start = self.pos;
        let nul_offset = self.bytes[start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or(QueryError::UnterminatedString)?;
        let raw = &self.bytes[start..start + nul_offset];
        self.pos = start + nul_offset + 1;
        Ok(cube2::decode(raw))
    }
}

/// The fully parsed contents of a UDP info reply, after skipping the 5-byte
/// request echo.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct QueryReply {
    pub players_count: i64,
    pub protocol: i64,
    pub game_mode: i64,
    pub mutators: i64,
    pub time_remaining: i64,
    pub max_slots: i64,
    pub mastermode: i64,
    pub modification_percentage: i64,
    pub number_of_game_vars: i64,
    pub version_major: i64,
    pub version_minor: i64,
    pub version_patch: i64,
    pub version_platform: i64,
    pub version_arch: i64,
    pub game_state: i64,
    pub time_left: i64,
    pub map_name: String,
    pub description: String,
    pub versionbuild: Option<String>,
    pub versionbranch: Option<String>,
    pub players: Vec<String>,
    pub accounts: Vec<String>,
}

const MAX_DESCRIPTION_LEN: usize = 80;
const FIXED_INT_COUNT: usize = 15;

impl QueryReply {
    /// Parse a full UDP reply datagram, including its 5-byte request echo.
    pub fn parse(datagram: &[u8]) -> Result<Self, QueryError> {
        if datagram.len() < 5 {
            return Err(QueryError::ShortRead {
                expected: 5,
                available: datagram.len(),
            });
        }
        Self::parse_payload(&datagram[5..])
    }

    /// Parse the reply payload, i.e. everything after the 5-byte echo.
    fn parse_payload(payload: &[u8]) -> Result<Self, QueryError> {
        let mut r = ByteReader::new(payload);

        let players_count = r.next_int()?;
        let number_of_ints = r.next_int()?.max(0) as usize;

        let mut ints = [0i64; FIXED_INT_COUNT];
        let present = number_of_ints.min(FIXED_INT_COUNT);
        for slot in ints.iter_mut().take(present) {
            *slot = r.next_int()?;
        }
        // Tolerate newer protocols: skip any ints beyond the 15 we understand.
        for _ in FIXED_INT_COUNT..number_of_ints {
            r.next_int()?;
        }

        let map_name = r.next_string()?;
        let description: String = r.next_string()?.chars().take(MAX_DESCRIPTION_LEN).collect();

        let version_major = ints[8];
        let version_minor = ints[9];
        let version_patch = ints[10];

        let versionbuild = if version_major >= 1 && version_minor >= 6 {
            r.next_string().ok()
        } else {
            None
        };

        let versionbranch = if version_major >= 1 && (version_minor, version_patch) > (5, 3) {
            // Malformed or truncated branch strings are tolerated silently.
            r.next_string().ok()
        } else {
            None
        };

        let player_count_usize = players_count.max(0) as usize;
        let mut players = Vec::with_capacity(player_count_usize);
        for _ in 0..player_count_usize {
            players.push(r.next_string()?);
        }

        let mut accounts = Vec::with_capacity(player_count_usize);
        for _ in 0..player_count_usize {
            accounts.push(r.next_string()?.trim().to_string());
        }

        Ok(Self {
            players_count,
            protocol: ints[0],
            game_mode: ints[1],
            mutators: ints[2],
            time_remaining: ints[3],
            max_slots: ints[4],
            mastermode: ints[5],
            modification_percentage: ints[6],
            number_of_game_vars: ints[7],
            version_major,
            version_minor,
            version_patch,
            version_platform: ints[11],
            version_arch: ints[12],
            game_state: ints[13],
            time_left: ints[14],
            map_name,
            description,
            versionbuild,
            versionbranch,
            players,
            accounts,
        })
    }
}
