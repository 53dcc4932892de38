    use super::*;
    use crate::error::{FetchError, RequestError, ValidationError};

    fn state(capacity: usize) -> DashboardState {
        DashboardState::new(capacity, Vec::new(), Vec::new())
    }

    fn values(state: &DashboardState, channel: Channel) -> Vec<f64> {
        let view = state.view();
        match channel {
            Channel::Packets => view.packets.values.clone(),
            Channel::Anomalies => view.anomalies.values.clone(),
        }
    }

    fn fetch_failed(what: &str) -> FetchError {
        RequestError::Transport {
            what: what.to_string(),
            message: "connection refused".to_string(),
        }
        .into()
    }

    fn backfill() -> Vec<Sample> {
        vec![Sample::new(1, 10.0), Sample::new(2, 20.0)]
    }

    #[test]
    fn backfill_then_live_evicts_oldest_at_capacity() {
        let mut st = state(3);
        let generation = st.begin_load();
        st.apply_part(
            generation,
            SnapshotPart::Samples(Channel::Packets, Ok(backfill())),
        );

        st.push_live(Channel::Packets, Sample::new(3, 30.0));
        assert_eq!(values(&st, Channel::Packets), vec![10.0, 20.0, 30.0]);

        st.push_live(Channel::Packets, Sample::new(4, 40.0));
        assert_eq!(values(&st, Channel::Packets), vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn live_sample_before_backfill_is_kept_once() {
        let mut st = state(15);
        let generation = st.begin_load();
        st.push_live(Channel::Packets, Sample::new(3, 30.0));
        st.apply_part(
            generation,
            SnapshotPart::Samples(Channel::Packets, Ok(backfill())),
        );
        assert_eq!(values(&st, Channel::Packets), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn live_sample_already_in_backfill_is_not_duplicated() {
        let mut st = state(15);
        let generation = st.begin_load();
        st.push_live(Channel::Packets, Sample::new(2, 20.0));
        st.apply_part(
            generation,
            SnapshotPart::Samples(Channel::Packets, Ok(backfill())),
        );
        assert_eq!(values(&st, Channel::Packets), vec![10.0, 20.0]);
    }

    #[test]
    fn push_into_unseeded_window_succeeds() {
        let mut st = state(15);
        st.push_live(Channel::Anomalies, Sample::new(1, 1.0));
        assert_eq!(values(&st, Channel::Anomalies), vec![1.0]);
    }

    #[test]
    fn reload_resets_and_reseeds_instead_of_appending() {
        let mut st = state(15);
        let first = st.begin_load();
        st.apply_part(first, SnapshotPart::Samples(Channel::Packets, Ok(backfill())));
        st.push_live(Channel::Packets, Sample::new(3, 30.0));

        let second = st.begin_load();
        st.push_live(Channel::Packets, Sample::new(4, 40.0));
        st.apply_part(
            second,
            SnapshotPart::Samples(
                Channel::Packets,
                Ok(vec![
                    Sample::new(1, 10.0),
                    Sample::new(2, 20.0),
                    Sample::new(3, 30.0),
                ]),
            ),
        );
        assert_eq!(values(&st, Channel::Packets), vec![10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn failed_anomaly_fetch_leaves_anomaly_series_untouched() {
        let mut st = state(15);
        let generation = st.begin_load();
        st.apply_part(
            generation,
            SnapshotPart::Samples(Channel::Packets, Ok(backfill())),
        );
        st.apply_part(
            generation,
            SnapshotPart::Samples(Channel::Anomalies, Err(fetch_failed("fetch anomalies"))),
        );

        let view = st.view();
        assert_eq!(view.packets.values, vec![10.0, 20.0]);
        assert!(view.anomalies.is_empty());
        let notice = view.latest_notice().expect("notice");
        assert!(notice.is_error());
        assert!(notice.text.contains("fetch anomalies"), "{}", notice.text);
    }

    #[test]
    fn failed_backup_listing_keeps_previous_list() {
        let mut st = state(15);
        let first = st.begin_load();
        st.apply_part(
            first,
            SnapshotPart::Backups(BackupKind::Packet, Ok(vec!["a.txt".to_string()])),
        );
        let second = st.begin_load();
        st.apply_part(
            second,
            SnapshotPart::Backups(BackupKind::Packet, Err(fetch_failed("list packet backups"))),
        );
        assert_eq!(
            st.view().packet_backups.as_deref(),
            Some(&["a.txt".to_string()][..])
        );
    }

    #[test]
    fn stale_generation_parts_are_ignored() {
        let mut st = state(15);
        let old = st.begin_load();
        let _current = st.begin_load();
        st.apply_part(old, SnapshotPart::SystemInfo(Ok(serde_json::json!({"cpu": 1}))));
        assert_eq!(st.view().system_info, None);
    }

    #[test]
    fn loading_flag_follows_current_generation() {
        let mut st = state(15);
        let old = st.begin_load();
        let current = st.begin_load();
        assert!(st.view().loading);
        st.finish_load(old);
        assert!(st.view().loading);
        st.finish_load(current);
        assert!(!st.view().loading);
    }

    #[test]
    fn view_is_a_snapshot_not_a_live_reference() {
        let mut st = state(15);
        let before = st.view();
        st.push_live(Channel::Packets, Sample::new(1, 1.0));
        assert!(before.packets.is_empty());
        assert_eq!(st.view().packets.len(), 1);
    }

    #[test]
    fn acknowledged_list_edits_update_local_copy() {
        let mut st = DashboardState::new(15, vec!["10.0.0.1".to_string()], Vec::new());
        st.apply_list_edit(AccessList::Blacklist, ListEdit::Add, "10.0.0.2", Ok(()));
        st.apply_list_edit(AccessList::Blacklist, ListEdit::Add, "10.0.0.2", Ok(()));
        st.apply_list_edit(AccessList::Blacklist, ListEdit::Remove, "10.0.0.1", Ok(()));

        let view = st.view();
        assert_eq!(view.blacklist, vec!["10.0.0.2".to_string()]);
        assert!(view.whitelist.is_empty());
        assert_eq!(
            view.latest_notice().map(|n| n.text.as_str()),
            Some("removed 10.0.0.1 from blacklist")
        );
    }

    #[test]
    fn failed_list_edit_leaves_list_and_reports() {
        let mut st = state(15);
        st.apply_list_edit(
            AccessList::Whitelist,
            ListEdit::Add,
            "999.1.1.1",
            Err(ValidationError::MalformedIp("999.1.1.1".to_string()).into()),
        );
        let view = st.view();
        assert!(view.whitelist.is_empty());
        assert!(view.latest_notice().is_some_and(|n| n.is_error()));
    }

    #[test]
    fn command_outcomes_become_notices() {
        let mut st = state(15);
        st.apply_command(
            DeviceCommand::SaveBackup(BackupKind::Anomaly),
            Ok(ControlAck {
                message: None,
                backup_file: Some("anomalies_1.json".to_string()),
            }),
        );
        assert_eq!(
            st.view().latest_notice().map(|n| n.text.as_str()),
            Some("save anomaly backup accepted: anomalies_1.json")
        );

        st.apply_command(
            DeviceCommand::Reboot,
            Err(RequestError::Status {
                what: "reboot".to_string(),
                status: 500,
                message: Some("sudo failed".to_string()),
            }
            .into()),
        );
        let view = st.view();
        let notice = view.latest_notice().expect("notice");
        assert!(notice.is_error());
        assert_eq!(notice.text, "reboot: server returned 500 (sudo failed)");
    }

    #[test]
    fn notices_are_bounded() {
        let mut st = state(15);
        for i in 0..50 {
            st.notify(Notice::info(format!("n{}", i)));
        }
        let view = st.view();
        assert_eq!(view.notices.len(), NOTICES_KEEP_LAST);
        assert_eq!(view.notices.last().map(|n| n.text.as_str()), Some("n49"));
    }
