//! Unit tests for NDJSON line framing.
//!
//! Covers:
//! - a single complete line decodes without its terminator
//! - several lines in one delivery decode one by one
//! - a line split across deliveries is held until its newline arrives
//! - emitted lines are independent of how the input is chunked
//! - the unterminated trailing fragment is released at EOF
//! - no line length limit applies
//! - invalid UTF-8 is replaced and does not stop later lines

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use issue_search::tool::codec::ToolCodec;

/// Feed `input` to a fresh codec in `chunks`, draining after every delivery,
/// then flush at EOF.
fn decode_in_chunks(chunks: &[&[u8]]) -> Vec<String> {
    let mut codec = ToolCodec::new();
    let mut buf = BytesMut::new();
    let mut lines = Vec::new();

    for chunk in chunks {
        buf.extend_from_slice(chunk);
        while let Some(line) = codec.decode(&mut buf).expect("decode must not fail") {
            lines.push(line);
        }
    }
    while let Some(line) = codec.decode_eof(&mut buf).expect("decode_eof must not fail") {
        lines.push(line);
    }
    lines
}

#[test]
fn single_line_decodes_without_terminator() {
    let mut codec = ToolCodec::new();
    let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}\n");

    let line = codec.decode(&mut buf).expect("decode must succeed");

    assert_eq!(
        line.as_deref(),
        Some("{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}")
    );
    assert!(codec.decode(&mut buf).expect("empty buffer").is_none());
}

#[test]
fn batched_lines_are_each_decoded() {
    let lines = decode_in_chunks(&[b"{\"a\":1}\n{\"b\":2}\nnoise\n"]);
    assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "noise"]);
}

#[test]
fn partial_line_is_buffered_until_newline() {
    let mut codec = ToolCodec::new();
    let mut buf = BytesMut::from("{\"jsonrpc\":\"2.0\"");

    assert!(
        codec.decode(&mut buf).expect("partial decode").is_none(),
        "an unterminated fragment must not be emitted"
    );

    buf.extend_from_slice(b",\"id\":2,\"result\":{}}\n");
    assert_eq!(
        codec.decode(&mut buf).expect("complete decode").as_deref(),
        Some("{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{}}")
    );
}

#[test]
fn framing_is_independent_of_chunk_boundaries() {
    let input = "{\"id\":1,\"result\":{}}\n\nnot json at all\n{\"text\":\"caf\u{e9} \u{2014} ok\"}\n{\"id\":2}\n";
    let expected: Vec<String> = input
        .strip_suffix('\n')
        .expect("input ends with newline")
        .split('\n')
        .map(str::to_owned)
        .collect();
    let bytes = input.as_bytes();

    for size in 1..=bytes.len() {
        let chunks: Vec<&[u8]> = bytes.chunks(size).collect();
        assert_eq!(
            decode_in_chunks(&chunks),
            expected,
            "chunk size {size} changed the decoded lines"
        );
    }

    for cut in 0..=bytes.len() {
        let (head, tail) = bytes.split_at(cut);
        assert_eq!(
            decode_in_chunks(&[head, tail]),
            expected,
            "split at byte {cut} changed the decoded lines"
        );
    }
}

#[test]
fn trailing_fragment_is_released_at_eof() {
    let lines = decode_in_chunks(&[b"first\nsecond-without-newline"]);
    assert_eq!(lines, vec!["first", "second-without-newline"]);
}

#[test]
fn invalid_utf8_line_does_not_stop_decoding() {
    let input: &[u8] = b"{\"id\":0}\n\xff\xfe diagnostic\n{\"id\":1,\"result\":{}}\r\n";

    for size in 1..=input.len() {
        let chunks: Vec<&[u8]> = input.chunks(size).collect();
        let lines = decode_in_chunks(&chunks);
        assert_eq!(lines.len(), 3, "chunk size {size}: {lines:?}");
        assert_eq!(lines[0], "{\"id\":0}");
        assert_eq!(lines[1], "\u{fffd}\u{fffd} diagnostic");
        assert_eq!(lines[2], "{\"id\":1,\"result\":{}}");
    }
}

#[test]
fn invalid_utf8_fragment_is_released_at_eof() {
    let lines = decode_in_chunks(&[&b"ok\n"[..], &b"tail \xc3"[..]]);
    assert_eq!(lines, vec!["ok".to_owned(), "tail \u{fffd}".to_owned()]);
}

#[test]
fn very_long_lines_are_not_rejected() {
    let long = "x".repeat(4 * 1024 * 1024);
    let input = format!("{long}\n");
    let lines = decode_in_chunks(&[input.as_bytes()]);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].len(), long.len());
}

#[test]
fn encoder_appends_newline() {
    let mut codec = ToolCodec::new();
    let mut dst = BytesMut::new();
    codec
        .encode("{\"jsonrpc\":\"2.0\"}".to_owned(), &mut dst)
        .expect("encode must succeed");
    assert_eq!(&dst[..], b"{\"jsonrpc\":\"2.0\"}\n");
}
