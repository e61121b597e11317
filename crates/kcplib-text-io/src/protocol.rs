//! KCP text-line frame codec.
//!
//! Every frame is one line of ASCII tokens separated by spaces and
//! terminated by CR LF.
//!
//! # Request format
//!
//! ```text
//! <command>[ <arg>]*\r\n
//! ```
//!
//! # Response format
//!
//! ```text
//! <command> <status>[ <arg>]*\r\n
//! ```
//!
//! - `status`: one of `A` (accepted), `B` (begun), `L` (logical error),
//!   `I` (internal error).
//! - If the second token is not a status tag the line is an *untagged data
//!   frame*, as sent by a balance in continuous-transmission mode
//!   (`S S     100.00 g`). Its arguments are all tokens after the command.
//!
//! Arguments that contain spaces, or are empty, travel in double quotes
//! (`U L "invalid unit"`). Quotes, CR and LF cannot appear inside an
//! argument. Blank lines are ignored. A bare LF terminator is accepted on
//! receive.
//!
//! The device address of a [`RequestFrame`] is not encoded: the text
//! protocol runs over point-to-point links.

use bytes::{BufMut, BytesMut};

use kcplib_core::error::{Error, Result};
use kcplib_core::frame::{RequestFrame, ResponseFrame, ResponseStatus};

/// Line terminator appended to every encoded frame.
pub const TERMINATOR: &[u8] = b"\r\n";

const QUOTE: u8 = b'"';

/// Result of attempting to decode one response line from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete frame was decoded.
    Response {
        /// The decoded frame.
        frame: ResponseFrame,
        /// Number of bytes consumed from the input buffer, including any
        /// blank lines before the frame and the terminator.
        consumed: usize,
    },

    /// A complete line was found but it is not a valid frame (unterminated
    /// quote, non-ASCII command token). The `usize` is the number of bytes
    /// to discard.
    Malformed(usize),

    /// The buffer does not yet contain a complete line. More data is needed.
    Incomplete,
}

/// Encode a request into raw bytes ready for transmission.
///
/// A continuation request encodes to nothing: it only asks the connection
/// for the next frame the instrument sends.
///
/// # Example
///
/// ```
/// use kcplib_core::frame::RequestFrame;
/// use kcplib_text_io::protocol::encode_request;
///
/// let bytes = encode_request(&RequestFrame::new(None, "U", &["g"])).unwrap();
/// assert_eq!(bytes, b"U g\r\n");
///
/// let bytes = encode_request(&RequestFrame::continuation(None)).unwrap();
/// assert!(bytes.is_empty());
/// ```
pub fn encode_request(request: &RequestFrame) -> Result<Vec<u8>> {
    if request.is_continuation() {
        return Ok(Vec::new());
    }
    check_command(&request.command_id)?;

    let capacity = request.command_id.len()
        + request
            .arguments
            .iter()
            .map(|a| a.len() + 3)
            .sum::<usize>()
        + TERMINATOR.len();
    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_slice(request.command_id.as_bytes());
    for arg in &request.arguments {
        buf.put_u8(b' ');
        put_argument(&mut buf, arg.as_bytes())?;
    }
    buf.put_slice(TERMINATOR);
    Ok(buf.to_vec())
}

/// Encode a response frame into raw bytes.
///
/// Used by simulated instruments and tests. An untagged frame whose first
/// argument reads as a status tag cannot be told apart from a tagged frame
/// on the wire and is rejected.
pub fn encode_response(frame: &ResponseFrame) -> Result<Vec<u8>> {
    check_command(&frame.command_id)?;
    if frame.status.is_none() {
        if let Some(first) = frame.arguments.first() {
            let ambiguous = std::str::from_utf8(first)
                .ok()
                .and_then(ResponseStatus::from_token)
                .is_some();
            if ambiguous {
                return Err(Error::InvalidParameter(format!(
                    "untagged {} frame starts with a status token",
                    frame.command_id
                )));
            }
        }
    }

    let mut buf = BytesMut::with_capacity(64);
    buf.put_slice(frame.command_id.as_bytes());
    if let Some(status) = frame.status {
        buf.put_u8(b' ');
        buf.put_slice(status.token().as_bytes());
    }
    for arg in &frame.arguments {
        buf.put_u8(b' ');
        put_argument(&mut buf, arg)?;
    }
    buf.put_slice(TERMINATOR);
    Ok(buf.to_vec())
}

/// Attempt to decode one response frame from a byte buffer.
///
/// Returns the first complete frame found, skipping blank lines, or
/// [`DecodeResult::Incomplete`] if no complete non-blank line is available.
///
/// # Example
///
/// ```
/// use kcplib_core::frame::ResponseStatus;
/// use kcplib_text_io::protocol::{decode_response, DecodeResult};
///
/// match decode_response(b"I4 A \"123\"\r\n") {
///     DecodeResult::Response { frame, consumed } => {
///         assert_eq!(frame.command_id, "I4");
///         assert_eq!(frame.status, Some(ResponseStatus::Accepted));
///         assert_eq!(frame.arguments, vec![b"123".to_vec()]);
///         assert_eq!(consumed, 12);
///     }
///     other => panic!("expected Response, got {other:?}"),
/// }
/// ```
pub fn decode_response(buf: &[u8]) -> DecodeResult {
    let mut start = 0;

    loop {
        let rest = &buf[start..];
        let lf = match rest.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None => return DecodeResult::Incomplete,
        };
        let consumed = start + lf + 1;
        let line = rest[..lf].strip_suffix(b"\r").unwrap_or(&rest[..lf]);

        let tokens = match tokenize(line) {
            Some(tokens) => tokens,
            None => return DecodeResult::Malformed(consumed),
        };
        if tokens.is_empty() {
            start = consumed;
            continue;
        }

        return match frame_from_tokens(tokens) {
            Some(frame) => DecodeResult::Response { frame, consumed },
            None => DecodeResult::Malformed(consumed),
        };
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn frame_from_tokens(tokens: Vec<Vec<u8>>) -> Option<ResponseFrame> {
    let mut tokens = tokens.into_iter();
    let command = tokens.next()?;
    if command.is_empty() || !command.iter().all(u8::is_ascii_graphic) {
        return None;
    }
    let command_id = String::from_utf8(command).ok()?;

    let mut arguments: Vec<Vec<u8>> = tokens.collect();
    let status = arguments
        .first()
        .and_then(|t| std::str::from_utf8(t).ok())
        .and_then(ResponseStatus::from_token);
    if status.is_some() {
        arguments.remove(0);
    }

    Some(ResponseFrame {
        command_id,
        status,
        arguments,
    })
}

/// Split a line into tokens. Returns `None` on an unterminated quote.
fn tokenize(line: &[u8]) -> Option<Vec<Vec<u8>>> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < line.len() {
        match line[i] {
            b' ' | b'\t' => i += 1,
            QUOTE => {
                let body = &line[i + 1..];
                let close = body.iter().position(|&b| b == QUOTE)?;
                tokens.push(body[..close].to_vec());
                i += close + 2;
            }
            _ => {
                let end = line[i..]
                    .iter()
                    .position(|&b| b == b' ' || b == b'\t')
                    .map_or(line.len(), |p| i + p);
                tokens.push(line[i..end].to_vec());
                i = end;
            }
        }
    }

    Some(tokens)
}

fn check_command(command: &str) -> Result<()> {
    if command.is_empty() || !command.bytes().all(|b| b.is_ascii_graphic() && b != QUOTE) {
        return Err(Error::InvalidParameter(format!(
            "invalid command token: {command:?}"
        )));
    }
    Ok(())
}

fn put_argument(buf: &mut BytesMut, arg: &[u8]) -> Result<()> {
    if arg.iter().any(|&b| matches!(b, QUOTE | b'\r' | b'\n')) {
        return Err(Error::InvalidParameter(format!(
            "argument cannot contain quotes or line breaks: {:?}",
            String::from_utf8_lossy(arg)
        )));
    }
    let needs_quotes = arg.is_empty() || arg.iter().any(|&b| b == b' ' || b == b'\t');
    if needs_quotes {
        buf.put_u8(QUOTE);
        buf.put_slice(arg);
        buf.put_u8(QUOTE);
    } else {
        buf.put_slice(arg);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoded(buf: &[u8]) -> (ResponseFrame, usize) {
        match decode_response(buf) {
            DecodeResult::Response { frame, consumed } => (frame, consumed),
            other => panic!("expected Response, got {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // encode_request
    // -----------------------------------------------------------------------

    #[test]
    fn encode_set_unit() {
        let bytes = encode_request(&RequestFrame::new(None, "U", &["g"])).unwrap();
        assert_eq!(bytes, b"U g\r\n");
    }

    #[test]
    fn encode_without_arguments() {
        let bytes = encode_request(&RequestFrame::new(None, "I4", &[])).unwrap();
        assert_eq!(bytes, b"I4\r\n");
    }

    #[test]
    fn encode_ignores_address() {
        let bytes = encode_request(&RequestFrame::new(Some(3), "SIR", &["1000"])).unwrap();
        assert_eq!(bytes, b"SIR 1000\r\n");
    }

    #[test]
    fn encode_quotes_spaces_and_empty() {
        let bytes = encode_request(&RequestFrame::new(None, "IBIM", &["PCB 250", ""])).unwrap();
        assert_eq!(bytes, b"IBIM \"PCB 250\" \"\"\r\n");
    }

    #[test]
    fn encode_continuation_is_empty() {
        assert!(encode_request(&RequestFrame::continuation(None)).unwrap().is_empty());
    }

    #[test]
    fn encode_rejects_bad_tokens() {
        assert!(matches!(
            encode_request(&RequestFrame::new(None, "U", &["a\"b"])),
            Err(Error::InvalidParameter(_))
        ));
        assert!(encode_request(&RequestFrame::new(None, "U", &["a\r\nT"])).is_err());
        assert!(encode_request(&RequestFrame::new(None, "S I", &[])).is_err());
    }

    // -----------------------------------------------------------------------
    // decode_response
    // -----------------------------------------------------------------------

    #[test]
    fn decode_empty_buffer() {
        assert_eq!(decode_response(b""), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_no_terminator() {
        assert_eq!(decode_response(b"U A"), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_accepted_without_arguments() {
        let (frame, consumed) = decoded(b"U A\r\n");
        assert_eq!(frame, ResponseFrame::accepted("U", &[]));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn decode_begun() {
        let (frame, _) = decoded(b"I4 B\r\n");
        assert_eq!(frame.status, Some(ResponseStatus::Begun));
    }

    #[test]
    fn decode_logical_error_with_quoted_diagnostic() {
        let (frame, _) = decoded(b"U L \"invalid unit\"\r\n");
        assert_eq!(
            frame,
            ResponseFrame::tagged("U", ResponseStatus::LogicalError, &[b"invalid unit"])
        );
    }

    #[test]
    fn decode_weight_frame_is_untagged() {
        let (frame, _) = decoded(b"S S     100.00 g\r\n");
        assert_eq!(frame.status, None);
        assert_eq!(frame.command_id, "S");
        assert_eq!(
            frame.arguments,
            vec![b"S".to_vec(), b"100.00".to_vec(), b"g".to_vec()]
        );
    }

    #[test]
    fn decode_accepts_bare_lf() {
        let (frame, consumed) = decoded(b"@ A\n");
        assert_eq!(frame, ResponseFrame::accepted("@", &[]));
        assert_eq!(consumed, 4);
    }

    #[test]
    fn decode_skips_blank_lines() {
        let (frame, consumed) = decoded(b"\r\n  \r\nT A\r\n");
        assert_eq!(frame.command_id, "T");
        assert_eq!(consumed, 11);
    }

    #[test]
    fn decode_only_blank_lines_is_incomplete() {
        assert_eq!(decode_response(b"\r\n\r\n"), DecodeResult::Incomplete);
    }

    #[test]
    fn decode_multiple_in_buffer() {
        let buf = b"SIR A\r\nS D 1.5 g\r\n";
        let (first, consumed) = decoded(buf);
        assert_eq!(first.command_id, "SIR");
        assert_eq!(consumed, 7);
        let (second, _) = decoded(&buf[consumed..]);
        assert_eq!(second.status, None);
    }

    #[test]
    fn decode_complete_plus_incomplete() {
        let (frame, consumed) = decoded(b"Z A\r\nS S 1");
        assert_eq!(frame.command_id, "Z");
        assert_eq!(consumed, 5);
    }

    #[test]
    fn decode_unterminated_quote_is_malformed() {
        assert_eq!(decode_response(b"U L \"oops\r\n"), DecodeResult::Malformed(11));
    }

    #[test]
    fn decode_non_ascii_command_is_malformed() {
        let buf = [0xFF, b' ', b'A', b'\r', b'\n'];
        assert_eq!(decode_response(&buf), DecodeResult::Malformed(5));
    }

    #[test]
    fn decode_keeps_non_utf8_arguments() {
        let (frame, _) = decoded(b"I5 A \xC3\x28\r\n");
        assert_eq!(frame.arguments, vec![vec![0xC3, 0x28]]);
    }

    // -----------------------------------------------------------------------
    // encode_response
    // -----------------------------------------------------------------------

    #[test]
    fn response_round_trip() {
        let frames = [
            ResponseFrame::accepted("U", &[]),
            ResponseFrame::begun("I4", &[]),
            ResponseFrame::accepted("I4", &[b"123"]),
            ResponseFrame::tagged("U", ResponseStatus::LogicalError, &[b"invalid unit"]),
            ResponseFrame::tagged("@", ResponseStatus::InternalError, &[b""]),
            ResponseFrame::untagged("S", &[b"D", b"-0.25", b"g"]),
        ];
        for frame in frames {
            let bytes = encode_response(&frame).unwrap();
            let (back, consumed) = decoded(&bytes);
            assert_eq!(back, frame);
            assert_eq!(consumed, bytes.len());
        }
    }

    #[test]
    fn encode_response_rejects_ambiguous_untagged() {
        let frame = ResponseFrame::untagged("S", &[b"A", b"1.0", b"g"]);
        assert!(matches!(
            encode_response(&frame),
            Err(Error::InvalidParameter(_))
        ));
    }
}
