use chrono::{Duration, TimeZone, Utc};
use uuid::Uuid;

use super::auth::{issue_token, verify_token};
use super::wire::{Frame, FrameDecoder, encode_frame};
use crate::broker::message::PingPayload;
use crate::broker::{CommentView, StreamEvent};

fn sample_comment() -> StreamEvent {
    StreamEvent::ExistingComment(CommentView {
        id: Uuid::nil(),
        topic_id: "post-1".into(),
        author_id: "u1".into(),
        author_name: "Ada".into(),
        body: "hi\nthere".into(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        comment_count: 1,
    })
}

#[test]
fn test_encode_frame_layout() {
    let frame = encode_frame(&StreamEvent::connected("post-1")).unwrap();
    assert_eq!(frame, "event: connected\ndata: {\"topic_id\":\"post-1\"}\n\n");
}

#[test]
fn test_encoded_payload_stays_on_one_line() {
    let frame = encode_frame(&sample_comment()).unwrap();
    assert_eq!(frame.matches('\n').count(), 3);
    assert!(frame.contains(r#""body":"hi\nthere""#));
}

#[test]
fn test_decoder_handles_split_chunks() {
    let mut decoder = FrameDecoder::new();
    let text = format!(
        "{}{}",
        encode_frame(&StreamEvent::connected("post-1")).unwrap(),
        encode_frame(&sample_comment()).unwrap()
    );
    let bytes = text.as_bytes();

    let mut frames = Vec::new();
    for chunk in bytes.chunks(7) {
        frames.extend(decoder.push(chunk));
    }

    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].event.as_deref(), Some("connected"));
    assert_eq!(
        frames[1].clone().into_stream_event().unwrap(),
        sample_comment()
    );
}

#[test]
fn test_decoder_accepts_crlf_comments_and_multiline_data() {
    let mut decoder = FrameDecoder::new();
    let frames = decoder.push(b": keep-alive\r\n\r\nevent: x\r\ndata: a\r\ndata:b\r\n\r\n");
    assert_eq!(
        frames,
        vec![Frame {
            event: Some("x".into()),
            data: "a\nb".into()
        }]
    );
}

#[test]
fn test_decoder_waits_for_blank_line() {
    let mut decoder = FrameDecoder::new();
    assert!(decoder.push(b"event: ping\ndata: {}\n").is_empty());
    assert_eq!(decoder.push(b"\n").len(), 1);
}

#[test]
fn test_ping_round_trips_through_wire() {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let ping = StreamEvent::Ping(PingPayload { at });
    let frames = FrameDecoder::new().push(encode_frame(&ping).unwrap().as_bytes());
    assert_eq!(frames[0].data, r#"{"at":"2024-01-02T03:04:05.000Z"}"#);
    assert_eq!(frames[0].clone().into_stream_event().unwrap(), ping);
}

#[test]
fn test_token_round_trip() {
    let token = issue_token("secret", "user-42", Duration::hours(1)).unwrap();
    let claims = verify_token("secret", &token).unwrap();
    assert_eq!(claims.sub, "user-42");
}

#[test]
fn test_token_rejected_with_wrong_secret_or_expired() {
    let token = issue_token("secret", "user-42", Duration::hours(1)).unwrap();
    assert!(verify_token("other", &token).is_err());

    let expired = issue_token("secret", "user-42", Duration::hours(-2)).unwrap();
    assert!(verify_token("secret", &expired).is_err());
    assert!(verify_token("secret", "not.a.token").is_err());
}
