use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, Screen};
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick();
        }
    }
    app.poll_pending().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work on every screen
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen() {
        Screen::KeyGate => handle_key_gate(app, key),
        Screen::Chat => handle_chat(app, key),
    }
}

fn handle_key_gate(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.submit_key(),
        KeyCode::Esc => app.key_input.clear(),
        KeyCode::Backspace => app.key_input.backspace(),
        KeyCode::Delete => app.key_input.delete(),
        KeyCode::Left => app.key_input.left(),
        KeyCode::Right => app.key_input.right(),
        KeyCode::Home => app.key_input.home(),
        KeyCode::End => app.key_input.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.key_input.insert(c),
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Chat-wide shortcuts
    match key.code {
        KeyCode::Char('k') if ctrl => {
            app.change_key();
            return;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::BackTab => {
            app.focus = app.focus.next().next();
            return;
        }
        _ => {}
    }

    match app.focus {
        FocusPane::Question => handle_question(app, key),
        FocusPane::Knowledge => handle_knowledge(app, key),
        FocusPane::Transcript => handle_transcript(app, key),
    }
}

fn handle_question(app: &mut App, key: KeyEvent) {
    // Input is disabled while a reply is outstanding
    if app.is_sending() {
        return;
    }

    match key.code {
        KeyCode::Enter => app.send_question(),
        KeyCode::Backspace => app.question.backspace(),
        KeyCode::Delete => app.question.delete(),
        KeyCode::Left => app.question.left(),
        KeyCode::Right => app.question.right(),
        KeyCode::Home => app.question.home(),
        KeyCode::End => app.question.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => app.question.insert(c),
        _ => {}
    }
}

fn handle_knowledge(app: &mut App, key: KeyEvent) {
    let edited = match key.code {
        KeyCode::Esc => {
            app.focus = FocusPane::Question;
            false
        }
        KeyCode::Enter => {
            app.knowledge.insert('\n');
            true
        }
        KeyCode::Backspace => {
            app.knowledge.backspace();
            true
        }
        KeyCode::Delete => {
            app.knowledge.delete();
            true
        }
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.knowledge.insert(c);
            true
        }
        KeyCode::Left => {
            app.knowledge.left();
            false
        }
        KeyCode::Right => {
            app.knowledge.right();
            false
        }
        KeyCode::Up => {
            app.knowledge.up();
            false
        }
        KeyCode::Down => {
            app.knowledge.down();
            false
        }
        KeyCode::Home => {
            app.knowledge.home();
            false
        }
        KeyCode::End => {
            app.knowledge.end();
            false
        }
        _ => false,
    };

    app.knowledge_follow = true;
    if edited {
        app.sync_knowledge();
    }
}

fn handle_transcript(app: &mut App, key: KeyEvent) {
    let half_page = (app.chat_height / 2).max(1);

    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Esc => app.focus = FocusPane::Question,
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(half_page)
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(half_page)
        }
        KeyCode::PageDown => app.scroll_chat_down(half_page),
        KeyCode::PageUp => app.scroll_chat_up(half_page),
        KeyCode::Char('g') => app.scroll_chat_up(u16::MAX),
        KeyCode::Char('G') => {
            app.follow_chat = true;
            app.scroll_chat_to_bottom();
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    match app.screen() {
        Screen::KeyGate => app.key_input.insert_str(text),
        Screen::Chat => match app.focus {
            FocusPane::Question if !app.is_sending() => app.question.insert_str(text),
            FocusPane::Knowledge => {
                app.knowledge.insert_str(text);
                app.knowledge_follow = true;
                app.sync_knowledge();
            }
            _ => {}
        },
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen() != Screen::Chat {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;

    let in_knowledge = app.knowledge_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_chat {
                app.scroll_chat_down(3);
            } else if in_knowledge {
                app.knowledge_follow = false;
                app.knowledge_scroll = app.knowledge_scroll.saturating_add(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_chat {
                app.scroll_chat_up(3);
            } else if in_knowledge {
                app.knowledge_follow = false;
                app.knowledge_scroll = app.knowledge_scroll.saturating_sub(3);
            }
        }
        MouseEventKind::Down(_) => {
            if in_chat {
                app.focus = FocusPane::Transcript;
            } else if in_knowledge {
                app.focus = FocusPane::Knowledge;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::test_app;

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn ctrl(c: char) -> AppEvent {
        AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL))
    }

    async fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            handle_event(app, press(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_gate_ignores_blank_key() {
        let mut app = test_app("story", None);
        type_str(&mut app, "   ").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.screen(), Screen::KeyGate);

        handle_event(&mut app, press(KeyCode::Esc)).await.unwrap();
        type_str(&mut app, "my-key").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert_eq!(app.screen(), Screen::Chat);
        assert_eq!(app.session().credential().unwrap().expose(), "my-key");
    }

    #[tokio::test]
    async fn test_knowledge_edits_reach_session() {
        let mut app = test_app("", Some("k"));
        handle_event(&mut app, press(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.focus, FocusPane::Knowledge);

        type_str(&mut app, "Cats").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        type_str(&mut app, "purr").await;
        assert_eq!(app.session().knowledge(), "Cats\npurr");

        handle_event(&mut app, AppEvent::Paste("!".to_string())).await.unwrap();
        assert_eq!(app.session().knowledge(), "Cats\npurr!");
    }

    #[tokio::test]
    async fn test_typing_blocked_while_sending() {
        let mut app = test_app("story", Some("k"));
        type_str(&mut app, "first").await;
        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        assert!(app.is_sending());

        type_str(&mut app, "x").await;
        assert_eq!(app.question.as_str(), "");
    }

    #[tokio::test]
    async fn test_ctrl_k_revokes_and_ctrl_c_quits() {
        let mut app = test_app("story", Some("k"));
        handle_event(&mut app, ctrl('k')).await.unwrap();
        assert_eq!(app.screen(), Screen::KeyGate);
        assert!(app.session().transcript().is_empty());

        handle_event(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }
}
