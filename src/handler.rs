use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::App;
use crate::tui::AppEvent;

const PAGE: u16 = 10;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
        }
        AppEvent::Reveal => app.on_reveal(),
        AppEvent::Stream { turn, fragment } => app.on_fragment(turn, fragment),
        AppEvent::StreamFinished { turn, result } => app.on_finished(turn, result),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
        return Ok(());
    }

    if ctrl {
        match key.code {
            KeyCode::Char('n') => app.new_question(),
            KeyCode::Char('t') => app.toggle_thoughts(),
            KeyCode::Char('l') => match app.client.list_models().await {
                Ok(models) => app.open_model_picker(models),
                Err(err) => {
                    tracing::warn!(error = %err, "could not list models");
                    app.turn_error = Some(format!("could not list models: {err}"));
                }
            },
            _ => {}
        }
        return Ok(());
    }

    match key.code {
        KeyCode::Esc => {
            if app.is_loading() {
                app.stop();
            }
        }
        KeyCode::Tab => app.skip_reveal(),

        // Chat scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(PAGE),
        KeyCode::PageDown => app.scroll_down(PAGE),

        KeyCode::Enter => app.submit(),
        _ => handle_query_editing(app, key),
    }
    Ok(())
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_model_picker = false;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.model_picker_nav_down();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.model_picker_nav_up();
        }
        KeyCode::Enter => {
            app.select_model();
        }
        _ => {}
    }
}

fn handle_query_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => {
            if app.query_cursor > 0 {
                app.query_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.query_input.chars().count();
            if app.query_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
                app.query_input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.query_cursor = app.query_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.query_input.chars().count();
            app.query_cursor = (app.query_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.query_cursor = 0;
        }
        KeyCode::End => {
            if app.query_input.is_empty() {
                app.scroll_to_bottom();
            } else {
                app.query_cursor = app.query_input.chars().count();
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.query_input, app.query_cursor);
            app.query_input.insert(byte_pos, c);
            app.query_cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{fragment, test_app};

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    async fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, press(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn test_editing_keys() {
        let (mut app, _rx) = test_app();
        type_str(&mut app, "héllo").await;
        assert_eq!(app.query_cursor, 5);

        handle_event(&mut app, press(KeyCode::Home)).await.unwrap();
        handle_event(&mut app, press(KeyCode::Delete)).await.unwrap();
        assert_eq!(app.query_input, "éllo");

        handle_event(&mut app, press(KeyCode::Right)).await.unwrap();
        handle_event(&mut app, press(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.query_input, "llo");
        assert_eq!(app.query_cursor, 0);

        handle_event(&mut app, press(KeyCode::End)).await.unwrap();
        assert_eq!(app.query_cursor, 3);
    }

    #[tokio::test]
    async fn test_enter_submits_and_esc_stops() {
        let (mut app, _rx) = test_app();
        type_str(&mut app, "why?").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert!(app.is_loading());

        let turn = app.turn;
        handle_event(&mut app, AppEvent::Stream { turn, fragment: fragment("partial") })
            .await
            .unwrap();
        handle_event(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert!(!app.is_loading());
        assert!(app.cancel.is_none());
        assert_eq!(app.conversation.messages()[1].content, "partial");
    }

    #[tokio::test]
    async fn test_blank_input_is_not_submitted() {
        let (mut app, _rx) = test_app();
        type_str(&mut app, "   ").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert!(!app.is_loading());
        assert!(app.conversation.messages().is_empty());
    }

    #[tokio::test]
    async fn test_control_keys() {
        let (mut app, _rx) = test_app();
        type_str(&mut app, "q").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();

        handle_event(&mut app, ctrl('t')).await.unwrap();
        assert!(!app.show_thoughts);

        handle_event(&mut app, ctrl('n')).await.unwrap();
        assert!(!app.is_loading());
        assert!(app.conversation.messages().is_empty());

        handle_event(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_model_list_failure_keeps_picker_closed() {
        let (mut app, _rx) = test_app();
        handle_event(&mut app, ctrl('l')).await.unwrap();
        assert!(!app.show_model_picker);
        assert!(app.turn_error.is_some());
    }

    #[tokio::test]
    async fn test_picker_captures_keys() {
        let (mut app, _rx) = test_app();
        app.open_model_picker(vec!["a".into(), "b".into()]);
        type_str(&mut app, "j").await;
        assert!(app.query_input.is_empty());
        assert_eq!(app.model_picker_state.selected(), Some(1));

        handle_event(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_model_picker);
    }

    #[tokio::test]
    async fn test_scroll_keys_release_follow() {
        let (mut app, _rx) = test_app();
        app.chat_scroll = 20;
        handle_event(&mut app, press(KeyCode::PageUp)).await.unwrap();
        assert_eq!(app.chat_scroll, 10);
        assert!(!app.follow_bottom);

        handle_event(&mut app, press(KeyCode::End)).await.unwrap();
        assert!(app.follow_bottom);
    }
}
