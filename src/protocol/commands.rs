//! Line parsing for the TCP master protocol.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}

/// A dispatched command from a connection's first (or subsequent, inside the
/// server-session loop) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Update,
    Server {
        port: u16,
        serverip: String,
        version: i64,
        info: String,
        extra: i64,
        branch: String,
    },
    ReqAuth {
        reqid: i64,
        user: String,
        userip: String,
    },
    ConfAuth {
        reqid: i64,
        reply: String,
    },
}

fn server_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^server\s+([0-9a-fA-F+-]+)\s+(\S+)\s+([0-9a-fA-F+-]+)\s+"([^"]*)"\s+([0-9a-fA-F+-]+)\s+"([^"]*)"\s*$"#,
        )
        .expect("server command regex is a valid, fixed pattern")
    })
}

fn reqauth_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^reqauth\s+([0-9a-fA-F+-]+)\s+(\S+)\s+(\S+)\s*$"#)
            .expect("reqauth command regex is a valid, fixed pattern")
    })
}

fn confauth_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^confauth\s+([0-9a-fA-F+-]+)\s+(\S+)\s*$"#)
            .expect("confauth command regex is a valid, fixed pattern")
    })
}

/// Parse a decimal or hex integer, with an optional leading sign. The wire
/// format's grammar admits hex digits in these fields even though most
/// values in practice are decimal; only a string that is neither is
/// rejected.
fn parse_flexible_int(raw: &str) -> Option<i64> {
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let value = digits
        .parse::<i64>()
        .or_else(|_| i64::from_str_radix(digits, 16))
        .ok()?;
    Some(if negative { -value } else { value })
}

/// Parse one already-trimmed, non-empty protocol line into a `Command`.
pub fn parse_line(line: &str) -> Result<Command, CommandError> {
    if line == "update" {
        return Ok(Command::Update);
    }

    if let Some(first_word) = line.split_whitespace().next() {
        match first_word {
            "server" => return parse_server(line),
            "reqauth" => return parse_reqauth(line),
            "confauth" => return parse_confauth(line),
            _ => {}
        }
    }

    Err(CommandError::UnknownCommand(line.to_string()))
}

fn parse_server(line: &str) -> Result<Command, CommandError> {
    let caps = server_regex()
        .captures(line)
        .ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;

    let port = parse_flexible_int(&caps[1])
        .and_then(|v| u16::try_from(v).ok())
        .ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;
    let serverip = caps[2].to_string();
    let version =
        parse_flexible_int(&caps[3]).ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;
    let info = caps[4].to_string();
    let extra =
        parse_flexible_int(&caps[5]).ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;
    let branch = caps[6].to_string();

    Ok(Command::Server {
        port,
        serverip,
        version,
        info,
        extra,
        branch,
    })
}

fn parse_reqauth(line: &str) -> Result<Command, CommandError> {
    let caps = reqauth_regex()
        .captures(line)
        .ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;

    let reqid =
        parse_flexible_int(&caps[1]).ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;

    Ok(Command::ReqAuth {
        reqid,
        user: caps[2].to_string(),
        userip: caps[3].to_string(),
    })
}

fn parse_confauth(line: &str) -> Result<Command, CommandError> {
    let caps = confauth_regex()
        .captures(line)
        .ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;

    let reqid =
        parse_flexible_int(&caps[1]).ok_or_else(|| CommandError::InvalidCommand(line.to_string()))?;

    Ok(Command::ConfAuth {
        reqid,
        reply: caps[2].to_string(),
    })
}
