// crates/rps-protocol/tests/json_codec.rs
use rps_core::{Message, ResponseCode};
use rps_protocol::{decode_message, drain_frames, encode_to_vec, ProtocolError, DELIMITER};

#[test]
fn round_trips_every_code() {
    let samples = vec![
        Message::connect("alice"),
        Message::ack("Server"),
        Message::refuse("Server"),
        Message::play("bob", "Schere"),
        Message::solution("Server", "You Win!"),
        Message::end("bob"),
        Message::new(ResponseCode::Move),
        Message::new(ResponseCode::Solution).with_text("ünïcödé ✂"),
    ];

    for msg in samples {
        let bytes = encode_to_vec(&msg).unwrap();
        let decoded = decode_message(&bytes).unwrap();
        assert_eq!(decoded, Some(msg));
    }
}

#[test]
fn encoding_is_field_tagged_and_delimited() {
    let bytes = encode_to_vec(&Message::play("alice", "Stein")).unwrap();
    let text = String::from_utf8(bytes).unwrap();

    assert!(text.ends_with(DELIMITER));
    assert!(text.contains(r#""Text":"Stein""#));
    assert!(text.contains(r#""PlayerName":"alice""#));
    assert!(text.contains(r#""Code":"MES""#));
}

#[test]
fn empty_chunk_is_no_message() {
    assert_eq!(decode_message(b"").unwrap(), None);
    assert_eq!(decode_message(DELIMITER.as_bytes()).unwrap(), None);
}

#[test]
fn delimiter_is_stripped_wherever_it_occurs() {
    let chunk = format!(r#"{{"Code":"ACK",{}"PlayerName":"Server"}}{}"#, DELIMITER, DELIMITER);
    let msg = decode_message(chunk.as_bytes()).unwrap().unwrap();
    assert_eq!(msg, Message::ack("Server"));
}

#[test]
fn missing_fields_default_to_none() {
    let msg = decode_message(br#"{"Code":"END"}<|EOM|>"#).unwrap().unwrap();
    assert_eq!(msg.code, ResponseCode::End);
    assert_eq!(msg.text, None);
    assert_eq!(msg.player_name, None);
}

#[test]
fn unknown_code_decodes_to_unknown() {
    let msg = decode_message(br#"{"Code":"XYZ","Text":"hi"}<|EOM|>"#)
        .unwrap()
        .unwrap();
    assert_eq!(msg.code, ResponseCode::Unknown);
    assert!(msg.code.is_terminal());
}

#[test]
fn delimiter_inside_text_does_not_survive() {
    // Known protocol limitation: the delimiter is never escaped.
    let msg = Message::play("alice", format!("Stein{}", DELIMITER));
    let bytes = encode_to_vec(&msg).unwrap();
    let decoded = decode_message(&bytes).unwrap().unwrap();
    assert_ne!(decoded, msg);
    assert_eq!(decoded.text.as_deref(), Some("Stein"));
}

#[test]
fn garbage_is_a_protocol_error() {
    assert!(matches!(
        decode_message(b"not json<|EOM|>"),
        Err(ProtocolError::Json(_))
    ));
    assert!(matches!(
        decode_message(&[0xff, 0xfe, 0xfd]),
        Err(ProtocolError::Utf8(_))
    ));
}

#[test]
fn drain_frames_splits_coalesced_messages_and_keeps_the_tail() {
    let mut buffer = encode_to_vec(&Message::ack("Server")).unwrap();
    buffer.extend(encode_to_vec(&Message::solution("Server", "You Win!")).unwrap());
    buffer.extend_from_slice(br#"{"Code":"EN"#);

    let frames = drain_frames(&mut buffer);
    assert_eq!(frames.len(), 2);
    assert_eq!(
        decode_message(&frames[0]).unwrap(),
        Some(Message::ack("Server"))
    );
    assert_eq!(
        decode_message(&frames[1]).unwrap(),
        Some(Message::solution("Server", "You Win!"))
    );
    assert_eq!(buffer, br#"{"Code":"EN"#.to_vec());

    buffer.extend_from_slice(br#"D"}<|EOM|>"#);
    let frames = drain_frames(&mut buffer);
    assert_eq!(frames.len(), 1);
    assert_eq!(decode_message(&frames[0]).unwrap(), Some(Message::new(ResponseCode::End)));
    assert!(buffer.is_empty());
}
