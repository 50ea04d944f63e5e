use anyhow::anyhow;
use codelearner_core::word_search::{self, CLEAR_DELAY};
use codelearner_core::{
    ApiClient, ApiError, Cell, ChatSession, ClearTicket, CodeArtifact, CodeExerciseSession,
    Config, ExerciseMode, GenerateRequest, Language, SelectOutcome, ShellContext, Theme, View,
    WordSearchBoard, WordSearchPuzzle,
};
use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::input::TextInput;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Start-up overrides taken from the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub api_url: Option<String>,
    pub theme: Option<Theme>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub shell: ShellContext,
    pub input_mode: InputMode,
    pub api: ApiClient,

    // Chat state
    pub chat: ChatSession,
    pub chat_input: TextInput,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub chat_task: Option<JoinHandle<Result<String, ApiError>>>,

    // Word search state
    pub board: WordSearchBoard,
    pub topic_input: TextInput,
    pub size: u8,
    pub grid_cursor: Cell,
    pub word_search_task: Option<JoinHandle<Result<WordSearchPuzzle, ApiError>>>,
    pub clear_task: Option<JoinHandle<()>>,

    // Code exercise state
    pub exercise: CodeExerciseSession,
    pub prompt_input: TextInput,
    pub language: Language,
    pub explanation: bool,
    pub attempt: TextInput,
    pub code_scroll: u16,
    pub exercise_request: Option<GenerateRequest>,
    pub exercise_task: Option<JoinHandle<Result<CodeArtifact, ApiError>>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Grid area for mouse hit-testing (updated during render)
    pub grid_area: Option<Rect>,

    events: UnboundedSender<AppEvent>,
}

/// Width of one rendered grid cell, in terminal columns.
pub const CELL_WIDTH: u16 = 3;

impl App {
    pub fn new(config: &Config, overrides: Overrides, events: UnboundedSender<AppEvent>) -> Self {
        let base_url = overrides.api_url.unwrap_or_else(|| config.api_base_url());
        let api = ApiClient::with_timeout(&base_url, config.request_timeout());
        let theme = overrides.theme.unwrap_or_else(|| config.theme());

        info!(base_url = %api.base_url(), theme = theme.as_str(), "starting");

        Self {
            should_quit: false,
            shell: ShellContext::new(theme),
            input_mode: InputMode::Normal,
            api,

            chat: ChatSession::new(),
            chat_input: TextInput::default(),
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_task: None,

            board: WordSearchBoard::new(),
            topic_input: TextInput::new(config.default_topic()),
            size: config.default_size(),
            grid_cursor: Cell::new(0, 0),
            word_search_task: None,
            clear_task: None,

            exercise: CodeExerciseSession::new(),
            prompt_input: TextInput::new(config.default_prompt()),
            language: config.default_language(),
            explanation: config.explanation(),
            attempt: TextInput::default(),
            code_scroll: 0,
            exercise_request: None,
            exercise_task: None,

            animation_frame: 0,
            grid_area: None,

            events,
        }
    }

    pub fn navigate(&mut self, view: View) {
        self.input_mode = InputMode::Normal;
        let first_visit = self.shell.navigate(view);
        // The puzzle is fetched as soon as the view is first shown.
        if first_visit && view == View::WordSearch && self.board.puzzle().is_none() {
            self.generate_word_search();
        }
    }

    pub fn toggle_theme(&mut self) {
        let theme = self.shell.toggle_theme();
        debug!(theme = theme.as_str(), "theme toggled");
    }

    pub fn is_loading(&self) -> bool {
        match self.shell.view() {
            View::Chat => self.chat.is_loading(),
            View::WordSearch => self.board.is_loading(),
            View::CodeExercise => self.exercise.is_loading(),
        }
    }

    // Chat

    pub fn submit_chat(&mut self) {
        let Some(question) = self.chat.begin(self.chat_input.value()) else {
            return;
        };
        self.chat_input.clear();
        self.scroll_chat_to_bottom();

        let api = self.api.clone();
        self.chat_task = Some(tokio::spawn(async move { api.ask(&question).await }));
    }

    pub fn scroll_chat_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_chat_down(&mut self, lines: u16) {
        let max = self.chat_line_count().saturating_sub(self.chat_height.max(1));
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
    }

    /// Scroll chat to bottom so the newest message (or "Pensando...") is visible
    pub fn scroll_chat_to_bottom(&mut self) {
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        let total_lines = self.chat_line_count();
        self.chat_scroll = total_lines.saturating_sub(visible_height);
    }

    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: usize = 0;
        for msg in self.chat.messages() {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                // Character count, not byte length, for UTF-8
                let char_count = line.chars().count();
                total_lines += char_count / wrap_width + 1;
            }
            total_lines += 1; // Blank line after message
        }
        if self.chat.is_loading() {
            total_lines += 2;
        }

        total_lines.min(u16::MAX as usize) as u16
    }

    // Word search

    /// Requests a new puzzle with the topic exactly as typed.
    ///
    /// A pending selection clear keeps running until the new puzzle arrives,
    /// so a failed request still clears the last evaluated pair.
    pub fn generate_word_search(&mut self) {
        if !self.board.begin_generate() {
            return;
        }

        let api = self.api.clone();
        let topic = self.topic_input.value().to_string();
        let size = self.size;
        info!(topic = %topic, size, "generating word search");
        self.word_search_task = Some(tokio::spawn(async move {
            api.word_search(&topic, size).await
        }));
    }

    pub fn change_size(&mut self, delta: i64) {
        self.size = word_search::clamp_size(self.size as i64 + delta);
    }

    pub fn move_grid_cursor(&mut self, d_row: isize, d_col: isize) {
        let Some(puzzle) = self.board.puzzle() else {
            return;
        };
        let rows = puzzle.grid().len();
        if rows == 0 {
            return;
        }

        let row = (self.grid_cursor.row as isize + d_row).clamp(0, rows as isize - 1) as usize;
        let cols = puzzle.grid()[row].len().max(1);
        let col = (self.grid_cursor.col as isize + d_col).clamp(0, cols as isize - 1) as usize;
        self.grid_cursor = Cell::new(row, col);
    }

    pub fn select_cell(&mut self, cell: Cell) {
        let outcome = self.board.select_cell(cell);
        debug!(?cell, ?outcome, "cell selected");

        match outcome {
            SelectOutcome::Evaluated { ticket, .. } => self.schedule_clear(ticket),
            SelectOutcome::Ignored => {}
            SelectOutcome::Selected | SelectOutcome::Deselected => {
                if self.board.pending_clear().is_none() {
                    self.cancel_clear_task();
                }
            }
        }
    }

    /// Maps a terminal position to a grid cell using the last rendered grid area.
    pub fn cell_at(&self, x: u16, y: u16) -> Option<Cell> {
        let area = self.grid_area?;
        if x < area.x || y < area.y || x >= area.x + area.width || y >= area.y + area.height {
            return None;
        }

        let cell = Cell::new((y - area.y) as usize, ((x - area.x) / CELL_WIDTH) as usize);
        self.board.puzzle()?.contains(cell).then_some(cell)
    }

    fn schedule_clear(&mut self, ticket: ClearTicket) {
        self.cancel_clear_task();
        let events = self.events.clone();
        self.clear_task = Some(tokio::spawn(async move {
            tokio::time::sleep(CLEAR_DELAY).await;
            let _ = events.send(AppEvent::ClearSelection(ticket));
        }));
    }

    fn cancel_clear_task(&mut self) {
        if let Some(task) = self.clear_task.take() {
            task.abort();
        }
    }

    pub fn on_clear_selection(&mut self, ticket: ClearTicket) {
        if self.board.clear_selection(ticket) {
            self.clear_task = None;
        }
    }

    // Code exercise

    pub fn generate_code(&mut self) {
        if self.prompt_input.is_blank() || !self.exercise.begin_generate() {
            return;
        }

        let request = GenerateRequest {
            prompt: self.prompt_input.value().trim().to_string(),
            language: self.language,
            explanation: self.explanation,
        };
        info!(language = %request.language, explanation = request.explanation, "generating code");

        let api = self.api.clone();
        let task_request = request.clone();
        self.exercise_request = Some(request);
        self.exercise_task = Some(tokio::spawn(async move {
            api.generate_code(&task_request.prompt, task_request.language, task_request.explanation)
                .await
        }));
    }

    pub fn start_exercise(&mut self) {
        self.exercise.start_exercise();
        if self.exercise.mode() == ExerciseMode::Exercise {
            self.attempt.clear();
            self.input_mode = InputMode::Editing;
        }
    }

    pub fn reset_exercise(&mut self) {
        self.exercise.reset_exercise();
        self.attempt.clear();
        self.input_mode = InputMode::Normal;
    }

    pub fn check_attempt(&mut self) {
        *self.exercise.user_input_mut() = self.attempt.value().to_string();
        self.exercise.check();
    }

    pub fn cycle_language(&mut self) {
        self.language = self.language.next();
    }

    pub fn toggle_explanation(&mut self) {
        self.explanation = !self.explanation;
    }

    // Background tasks

    /// Collects finished requests and hands their results to the controllers.
    pub async fn poll_tasks(&mut self) {
        if let Some(result) = take_finished(&mut self.chat_task).await {
            self.chat.finish(result);
            self.scroll_chat_to_bottom();
        }

        if let Some(result) = take_finished(&mut self.word_search_task).await {
            if result.is_ok() {
                // The new puzzle invalidates the old ticket
                self.cancel_clear_task();
                self.grid_cursor = Cell::new(0, 0);
            }
            self.board.finish_generate(result);
        }

        if let Some(result) = take_finished(&mut self.exercise_task).await {
            match self.exercise_request.take() {
                Some(request) => {
                    let succeeded = result.is_ok();
                    self.exercise.finish_generate(request, result);
                    if succeeded {
                        self.attempt.clear();
                        self.code_scroll = 0;
                    }
                }
                None => warn!("code generation finished without a pending request"),
            }
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_loading() || self.board.is_loading() || self.exercise.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

/// Takes the task out of `slot` once it has finished and returns its result.
async fn take_finished<T>(
    slot: &mut Option<JoinHandle<Result<T, ApiError>>>,
) -> Option<anyhow::Result<T>> {
    if !slot.as_ref().is_some_and(|task| task.is_finished()) {
        return None;
    }
    let task = slot.take()?;

    Some(match task.await {
        Ok(result) => result.map_err(anyhow::Error::from),
        Err(e) => Err(anyhow!("background request aborted: {e}")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use codelearner_core::Answer;
    use tokio::sync::mpsc;

    fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let overrides = Overrides {
            api_url: Some("http://127.0.0.1:9".to_string()),
            theme: Some(Theme::Dark),
        };
        (App::new(&Config::new(), overrides, tx), rx)
    }

    fn load_cat_puzzle(app: &mut App) {
        app.board.load(WordSearchPuzzle::from_parts(
            "C A T\nD O G",
            vec![Answer {
                word: "CAT".to_string(),
                start: [1, 1],
                end: [1, 3],
                direction: "horizontal".to_string(),
            }],
        ));
    }

    #[tokio::test]
    async fn test_defaults_from_config() {
        let (app, _rx) = test_app();
        assert_eq!(app.topic_input.value(), "MongoDB");
        assert_eq!(app.size, 10);
        assert_eq!(app.language, Language::Python);
        assert!(app.explanation);
        assert_eq!(app.shell.view(), View::Chat);
    }

    #[tokio::test]
    async fn test_change_size_is_bounded() {
        let (mut app, _rx) = test_app();
        app.change_size(100);
        assert_eq!(app.size, word_search::MAX_SIZE);
        app.change_size(-100);
        assert_eq!(app.size, word_search::MIN_SIZE);
    }

    #[tokio::test]
    async fn test_blank_chat_input_sends_nothing() {
        let (mut app, _rx) = test_app();
        app.chat_input.insert_str("   ");
        app.submit_chat();
        assert!(app.chat.messages().is_empty());
        assert!(app.chat_task.is_none());
    }

    #[tokio::test]
    async fn test_cell_at_uses_grid_area() {
        let (mut app, _rx) = test_app();
        load_cat_puzzle(&mut app);
        app.grid_area = Some(Rect::new(10, 5, 9, 2));

        assert_eq!(app.cell_at(10, 5), Some(Cell::new(0, 0)));
        assert_eq!(app.cell_at(17, 6), Some(Cell::new(1, 2)));
        assert_eq!(app.cell_at(9, 5), None);
        assert_eq!(app.cell_at(10, 7), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_cleared_after_delay() {
        let (mut app, mut rx) = test_app();
        load_cat_puzzle(&mut app);

        app.select_cell(Cell::new(0, 0));
        app.select_cell(Cell::new(0, 2));
        assert!(app.board.is_found("CAT"));
        assert_eq!(app.board.selection().len(), 2);

        match rx.recv().await {
            Some(AppEvent::ClearSelection(ticket)) => app.on_clear_selection(ticket),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(app.board.selection().is_empty());
    }

    async fn poll_until_generated(app: &mut App) {
        tokio::time::timeout(Duration::from_secs(10), async {
            while app.board.is_loading() {
                tokio::time::sleep(Duration::from_millis(10)).await;
                app.poll_tasks().await;
            }
        })
        .await
        .expect("word search request should finish");
    }

    #[tokio::test]
    async fn test_new_puzzle_cancels_pending_clear() {
        let (mut app, _rx) = test_app();
        load_cat_puzzle(&mut app);
        app.select_cell(Cell::new(0, 0));
        app.select_cell(Cell::new(1, 2));
        assert!(app.clear_task.is_some());

        assert!(app.board.begin_generate());
        let puzzle = WordSearchPuzzle::from_parts("D O G\nX X X", Vec::new());
        app.word_search_task = Some(tokio::spawn(async move { Ok(puzzle) }));
        poll_until_generated(&mut app).await;

        assert!(app.clear_task.is_none());
        assert!(app.board.selection().is_empty());
        assert_eq!(app.board.pending_clear(), None);
    }

    #[tokio::test]
    async fn test_failed_regenerate_still_clears_selection() {
        let (mut app, mut rx) = test_app();
        load_cat_puzzle(&mut app);
        app.select_cell(Cell::new(0, 0));
        app.select_cell(Cell::new(1, 2));

        // Nothing listens on the test app's backend port
        app.generate_word_search();
        assert!(app.clear_task.is_some());
        poll_until_generated(&mut app).await;
        assert!(app.board.status().is_some());
        assert_eq!(app.board.selection().len(), 2);

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("clear event should arrive");
        match event {
            Some(AppEvent::ClearSelection(ticket)) => app.on_clear_selection(ticket),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(app.board.selection().is_empty());
        assert_eq!(app.board.pending_clear(), None);
    }

    #[tokio::test]
    async fn test_topic_sent_as_typed() {
        let (mut app, _rx) = test_app();
        app.topic_input.clear();
        app.topic_input.insert_str("   ");
        app.generate_word_search();
        assert!(app.board.is_loading());
        assert!(app.word_search_task.is_some());
    }

    #[tokio::test]
    async fn test_grid_cursor_stays_on_grid() {
        let (mut app, _rx) = test_app();
        load_cat_puzzle(&mut app);
        app.move_grid_cursor(5, 5);
        assert_eq!(app.grid_cursor, Cell::new(1, 2));
        app.move_grid_cursor(-9, -9);
        assert_eq!(app.grid_cursor, Cell::new(0, 0));
    }

    #[tokio::test]
    async fn test_exercise_requires_generated_code() {
        let (mut app, _rx) = test_app();
        app.navigate(View::CodeExercise);
        app.start_exercise();
        assert_eq!(app.exercise.mode(), ExerciseMode::Preview);
        assert_eq!(app.input_mode, InputMode::Normal);
    }
}
