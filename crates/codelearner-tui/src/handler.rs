use anyhow::Result;
use codelearner_core::{ExerciseMode, View};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, InputMode};
use crate::input::TextInput;
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::ClearSelection(ticket) => app.on_clear_selection(ticket),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    // Shell keys shared by every view
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('1') => return app.navigate(View::Chat),
        KeyCode::Char('2') => return app.navigate(View::WordSearch),
        KeyCode::Char('3') => return app.navigate(View::CodeExercise),
        KeyCode::Tab => return app.navigate(app.shell.view().next()),
        KeyCode::Char('t') => return app.toggle_theme(),
        _ => {}
    }

    match app.shell.view() {
        View::Chat => handle_chat_normal(app, key),
        View::WordSearch => handle_word_search_normal(app, key),
        View::CodeExercise => handle_exercise_normal(app, key),
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => {
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_chat_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }
        KeyCode::Char('G') => app.scroll_chat_to_bottom(),
        _ => {}
    }
}

fn handle_word_search_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('h') | KeyCode::Left => app.move_grid_cursor(0, -1),
        KeyCode::Char('l') | KeyCode::Right => app.move_grid_cursor(0, 1),
        KeyCode::Char('k') | KeyCode::Up => app.move_grid_cursor(-1, 0),
        KeyCode::Char('j') | KeyCode::Down => app.move_grid_cursor(1, 0),
        KeyCode::Char(' ') | KeyCode::Enter => {
            let cell = app.grid_cursor;
            app.select_cell(cell);
        }
        KeyCode::Char('+') | KeyCode::Char('=') => app.change_size(1),
        KeyCode::Char('-') => app.change_size(-1),
        KeyCode::Char('i') | KeyCode::Char('/') => {
            if !app.board.is_loading() {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Char('g') => app.generate_word_search(),
        _ => {}
    }
}

fn handle_exercise_normal(app: &mut App, key: KeyEvent) {
    match app.exercise.mode() {
        ExerciseMode::Preview => match key.code {
            KeyCode::Char('i') | KeyCode::Char('/') => {
                if !app.exercise.is_loading() {
                    app.input_mode = InputMode::Editing;
                }
            }
            KeyCode::Char('l') => app.cycle_language(),
            KeyCode::Char('e') => app.toggle_explanation(),
            KeyCode::Char('g') => app.generate_code(),
            KeyCode::Char('s') | KeyCode::Enter => app.start_exercise(),
            KeyCode::Char('j') | KeyCode::Down => {
                app.code_scroll = app.code_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                app.code_scroll = app.code_scroll.saturating_sub(1);
            }
            _ => {}
        },
        ExerciseMode::Exercise => match key.code {
            KeyCode::Char('i') | KeyCode::Enter => {
                app.input_mode = InputMode::Editing;
            }
            KeyCode::Char('c') => {
                if !app.attempt.is_blank() {
                    app.check_attempt();
                }
            }
            KeyCode::Char('r') => app.reset_exercise(),
            _ => {}
        },
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.shell.view() {
        View::Chat => handle_chat_editing(app, key),
        View::WordSearch => handle_topic_editing(app, key),
        View::CodeExercise => match app.exercise.mode() {
            ExerciseMode::Preview => handle_prompt_editing(app, key),
            ExerciseMode::Exercise => handle_attempt_editing(app, key),
        },
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => app.submit_chat(),
        // Input is frozen while a question is in flight
        _ if app.chat.is_loading() => {}
        _ => edit_line(&mut app.chat_input, key),
    }
}

fn handle_topic_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            app.generate_word_search();
        }
        _ => edit_line(&mut app.topic_input, key),
    }
}

fn handle_prompt_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            app.generate_code();
        }
        _ => edit_line(&mut app.prompt_input, key),
    }
}

fn handle_attempt_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        // Ctrl+S checks without leaving the editor
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if !app.attempt.is_blank() {
                app.check_attempt();
            }
        }
        KeyCode::Enter => app.attempt.insert('\n'),
        KeyCode::Tab => app.attempt.insert_str("    "),
        _ => edit_line(&mut app.attempt, key),
    }
}

/// Cursor movement and character editing shared by every text field.
fn edit_line(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if app.shell.view() == View::WordSearch {
                if let Some(cell) = app.cell_at(mouse.column, mouse.row) {
                    app.grid_cursor = cell;
                    app.select_cell(cell);
                }
            }
        }
        MouseEventKind::ScrollDown => match app.shell.view() {
            View::Chat => app.scroll_chat_down(3),
            View::CodeExercise => app.code_scroll = app.code_scroll.saturating_add(3),
            View::WordSearch => {}
        },
        MouseEventKind::ScrollUp => match app.shell.view() {
            View::Chat => app.scroll_chat_up(3),
            View::CodeExercise => app.code_scroll = app.code_scroll.saturating_sub(3),
            View::WordSearch => {}
        },
        _ => {}
    }
}
