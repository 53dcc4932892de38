    use super::*;
    use std::time::Duration;

    use crate::feed::MemoryTransport;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn offline_app() -> App {
        let config = WiresConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            request_timeout_ms: 500,
            ..WiresConfig::default()
        };
        let (transport, _feed) = MemoryTransport::new();
        let dashboard = Dashboard::mount(&config, Arc::new(transport)).expect("mount");
        App::new(dashboard, &config)
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn list_prompt_submits_and_closes() {
        let mut app = offline_app();
        app.handle_key(key(KeyCode::Char('b')));
        assert!(matches!(
            app.modal,
            Some(Modal::ListEntry {
                list: AccessList::Blacklist,
                edit: ListEdit::Add,
                ..
            })
        ));

        type_text(&mut app, "999.1.1.1");
        app.handle_key(key(KeyCode::Enter));

        assert!(app.modal.is_none());
        let notice = app.view.latest_notice().expect("notice");
        assert!(notice.is_error());
        assert!(notice.text.contains("999.1.1.1"), "{}", notice.text);
    }

    #[test]
    fn list_prompt_only_accepts_address_characters() {
        let mut app = offline_app();
        app.handle_key(key(KeyCode::Char('W')));
        type_text(&mut app, "10.x0.0.1");
        app.handle_key(key(KeyCode::Backspace));

        match &app.modal {
            Some(Modal::ListEntry { input, .. }) => assert_eq!(input.buf, "10.0.0."),
            _ => panic!("expected list prompt"),
        }
        app.handle_key(key(KeyCode::Esc));
        assert!(app.modal.is_none());
        assert!(!app.quit);
    }

    #[test]
    fn destructive_commands_need_confirmation() {
        let mut app = offline_app();
        app.handle_key(key(KeyCode::Char('R')));
        assert!(matches!(
            app.modal,
            Some(Modal::Confirm {
                command: DeviceCommand::Reboot
            })
        ));
        app.handle_key(key(KeyCode::Char('n')));
        assert!(app.modal.is_none());

        // Nothing was sent, so no reboot outcome ever shows up.
        std::thread::sleep(Duration::from_millis(200));
        app.tick();
        assert!(
            !app.view
                .notices
                .iter()
                .any(|n| n.text.starts_with("reboot"))
        );
    }

    #[test]
    fn quit_keys() {
        let mut app = offline_app();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.quit);

        let mut app = offline_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.quit);
    }
