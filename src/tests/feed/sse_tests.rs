    use super::*;
    use std::io::Cursor;

    fn stream(text: &str) -> SseStream<Cursor<Vec<u8>>> {
        SseStream::new(Cursor::new(text.as_bytes().to_vec()))
    }

    #[test]
    fn parses_named_events_separated_by_blank_lines() {
        let mut s = stream(
            "event: packets\ndata: {\"timestamp\":1,\"value\":10}\n\n\
             event: anomaly_data\r\ndata: {\"timestamp\":2,\"value\":1}\r\n\r\n",
        );
        assert_eq!(
            s.next_event().expect("read"),
            Some(RawEvent::new("packets", r#"{"timestamp":1,"value":10}"#))
        );
        assert_eq!(
            s.next_event().expect("read"),
            Some(RawEvent::new("anomaly_data", r#"{"timestamp":2,"value":1}"#))
        );
        assert_eq!(s.next_event().expect("read"), None);
    }

    #[test]
    fn skips_comments_and_joins_multiline_data() {
        let mut s = stream(": keep-alive\n\ndata: first\ndata:second\nid: 7\n\n");
        assert_eq!(
            s.next_event().expect("read"),
            Some(RawEvent::new("message", "first\nsecond"))
        );
    }

    #[test]
    fn event_without_data_is_not_dispatched() {
        let mut s = stream("event: packets\n\nevent: anomalies\ndata: {}\n\n");
        assert_eq!(
            s.next_event().expect("read"),
            Some(RawEvent::new("anomalies", "{}"))
        );
    }

    #[test]
    fn incomplete_trailing_event_is_dropped_at_eof() {
        let mut s = stream("event: packets\ndata: {}");
        assert_eq!(s.next_event().expect("read"), None);
    }

    #[test]
    fn invalid_utf8_is_replaced_instead_of_ending_the_stream() {
        let mut bytes = b"event: packets\ndata: {\"note\":\"".to_vec();
        bytes.push(0xff);
        bytes.extend_from_slice(b"\"}\n\nevent: anomalies\ndata: {}\n\n");
        let mut s = SseStream::new(Cursor::new(bytes));

        assert_eq!(
            s.next_event().expect("read"),
            Some(RawEvent::new("packets", "{\"note\":\"\u{fffd}\"}"))
        );
        assert_eq!(
            s.next_event().expect("read"),
            Some(RawEvent::new("anomalies", "{}"))
        );
        assert_eq!(s.next_event().expect("read"), None);
    }

    #[test]
    fn closer_is_exposed_only_when_given() {
        assert!(stream("").closer().is_none());

        let hits = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = hits.clone();
        let closer: StreamCloser = Arc::new(move || {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        });
        let s = SseStream::with_closer(Cursor::new(Vec::new()), closer);
        (s.closer().expect("closer"))();
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn transport_targets_events_path() {
        let t = SseTransport::new("http://127.0.0.1:4000/").expect("transport");
        assert_eq!(t.url(), "http://127.0.0.1:4000/events");
    }
