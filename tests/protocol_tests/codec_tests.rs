//! Codec Tests
//!
//! Tests for request parsing, line framing and response encoding.

use std::io::{BufReader, Cursor};

use regatron_bridge::protocol::{
    parse_command, read_line, read_response, write_request, write_response,
    Command, Line, Response, Verb, NACK,
};
use regatron_bridge::BridgeError;

// =============================================================================
// Request Parsing Tests
// =============================================================================

#[test]
fn test_parse_get() {
    assert_eq!(parse_command("get sysVoltageRef"), Command::Get { name: "sysVoltageRef" });
    assert_eq!(parse_command("get debug\n"), Command::Get { name: "debug" });
    assert_eq!(parse_command("get debug\r\n"), Command::Get { name: "debug" });
}

#[test]
fn test_parse_set() {
    assert_eq!(
        parse_command("set sysVoltageRef 12.5"),
        Command::Set { name: "sysVoltageRef", value: 12.5 }
    );
    assert_eq!(
        parse_command("set debug -1e-3\n"),
        Command::Set { name: "debug", value: -0.001 }
    );
}

#[test]
fn test_parse_unsupported() {
    for line in ["", "GET debug", "put debug 1", "get", "set", "getdebug", " get debug"] {
        assert_eq!(parse_command(line), Command::Unsupported, "line {:?}", line);
    }
}

#[test]
fn test_parse_get_trailing_content_is_malformed() {
    let command = parse_command("get debug extra");
    assert_eq!(command.verb(), Some(Verb::Get));
    assert_eq!(command.name(), None);
    assert!(matches!(command, Command::Malformed { verb: Verb::Get, .. }));

    assert!(matches!(parse_command("get "), Command::Malformed { .. }));
    assert!(matches!(parse_command("get debug "), Command::Malformed { .. }));
}

#[test]
fn test_parse_set_malformed_number() {
    for line in [
        "set debug abc",
        "set debug 1.0 extra",
        "set debug",
        "set debug ",
        "set debug  1",
        "set debug 1,5",
        "set debug inf",
        "set debug nan",
    ] {
        assert!(
            matches!(parse_command(line), Command::Malformed { verb: Verb::Set, .. }),
            "line {:?}",
            line
        );
    }
}

// =============================================================================
// Line Framing Tests
// =============================================================================

#[test]
fn test_read_lines_in_order() {
    let mut reader = BufReader::new(Cursor::new(b"get a\nset b 1\r\n".to_vec()));

    assert_eq!(read_line(&mut reader, 64).unwrap(), Line::Message("get a".to_string()));
    assert_eq!(read_line(&mut reader, 64).unwrap(), Line::Message("set b 1".to_string()));
    assert_eq!(read_line(&mut reader, 64).unwrap(), Line::Eof);
}

#[test]
fn test_read_line_drops_partial_line_at_eof() {
    let mut reader = BufReader::new(Cursor::new(b"get a\nget b".to_vec()));

    assert_eq!(read_line(&mut reader, 64).unwrap(), Line::Message("get a".to_string()));
    assert_eq!(read_line(&mut reader, 64).unwrap(), Line::Eof);
}

#[test]
fn test_read_line_oversized_then_recovers() {
    let mut input = vec![b'x'; 100];
    input.push(b'\n');
    input.extend_from_slice(b"get a\n");

    // Small buffer so the long line spans several fills
    let mut reader = BufReader::with_capacity(8, Cursor::new(input));

    assert_eq!(read_line(&mut reader, 16).unwrap(), Line::Oversized(100));
    assert_eq!(read_line(&mut reader, 16).unwrap(), Line::Message("get a".to_string()));
}

#[test]
fn test_read_line_exact_limit() {
    let mut reader = BufReader::new(Cursor::new(b"0123456789\n".to_vec()));
    assert_eq!(
        read_line(&mut reader, 10).unwrap(),
        Line::Message("0123456789".to_string())
    );
}

#[test]
fn test_read_line_non_utf8_is_lossy() {
    let mut reader = BufReader::new(Cursor::new(b"get \xff\n".to_vec()));
    match read_line(&mut reader, 64).unwrap() {
        Line::Message(line) => {
            assert!(line.starts_with("get "));
            assert!(line.contains('\u{fffd}'));
        }
        other => panic!("Expected message, got {:?}", other),
    }
}

// =============================================================================
// Response Tests
// =============================================================================

#[test]
fn test_response_encoding() {
    assert_eq!(Response::value("debug", "12.5").encode(), "debug 12.5\n");
    assert_eq!(Response::nack().encode(), format!("{}\n", NACK));
}

#[test]
fn test_response_decoding() {
    assert_eq!(Response::decode("NACK\n").unwrap(), Response::nack());
    assert_eq!(
        Response::decode("sysReadings [1,2,3,4,5]").unwrap(),
        Response::value("sysReadings", "[1,2,3,4,5]")
    );
    assert!(matches!(Response::decode("lonely"), Err(BridgeError::Protocol(_))));
    assert!(matches!(Response::decode(" 12"), Err(BridgeError::Protocol(_))));
}

#[test]
fn test_write_then_read_over_buffer() {
    let mut wire = Vec::new();
    write_request(&mut wire, "get debug").unwrap();
    assert_eq!(wire, b"get debug\n");

    let mut wire = Vec::new();
    write_response(&mut wire, &Response::value("debug", "3")).unwrap();
    write_response(&mut wire, &Response::nack()).unwrap();

    let mut reader = BufReader::new(Cursor::new(wire));
    assert_eq!(read_response(&mut reader, 64).unwrap().result(), Some("3"));
    assert!(read_response(&mut reader, 64).unwrap().is_nack());
    assert!(matches!(read_response(&mut reader, 64), Err(BridgeError::Io(_))));
}
