    use super::*;
    use crate::model::Sample;

    #[test]
    fn error_message_prefers_message_over_error() {
        let body = r#"{"status":"error","message":"IP not provided","error":"bad"}"#;
        assert_eq!(error_message(body).as_deref(), Some("IP not provided"));
    }

    #[test]
    fn error_message_falls_back_to_error_field() {
        let body = r#"{"error":"redis unavailable"}"#;
        assert_eq!(error_message(body).as_deref(), Some("redis unavailable"));
    }

    #[test]
    fn error_message_ignores_non_json_bodies() {
        assert_eq!(error_message("<html>502 Bad Gateway</html>"), None);
        assert_eq!(error_message(""), None);
    }

    #[test]
    fn samples_payload_accepts_bare_and_wrapped_shapes() {
        let bare: SamplesPayload =
            serde_json::from_str(r#"[{"timestamp":1,"value":2.5}]"#).expect("bare");
        assert_eq!(bare.into_samples(), vec![Sample::new(1, 2.5)]);

        let wrapped: SamplesPayload = serde_json::from_str(
            r#"{"anomalies":[{"timestamp":"2024-05-01T10:00:00","value":1}],"total":1,"page":1}"#,
        )
        .expect("wrapped");
        assert_eq!(
            wrapped.into_samples(),
            vec![Sample::new("2024-05-01T10:00:00", 1.0)]
        );
    }

    #[test]
    fn backups_payload_accepts_bare_and_wrapped_shapes() {
        let bare: BackupsPayload = serde_json::from_str(r#"["a.txt","b.txt"]"#).expect("bare");
        assert_eq!(bare.into_files(), vec!["a.txt", "b.txt"]);

        let wrapped: BackupsPayload =
            serde_json::from_str(r#"{"backups":["packets_1.json"]}"#).expect("wrapped");
        assert_eq!(wrapped.into_files(), vec!["packets_1.json"]);
    }

    #[test]
    fn status_error_display_includes_server_message() {
        let err = RequestError::Status {
            what: "add to blacklist".to_string(),
            status: 500,
            message: Some("disk full".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "add to blacklist: server returned 500 (disk full)"
        );
    }
