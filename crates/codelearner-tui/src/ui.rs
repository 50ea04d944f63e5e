use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
};
use codelearner_core::shell::APP_NAME;
use codelearner_core::{Cell, ChatRole, ExerciseMode, ShellContext, Theme, View};
use crate::app::{App, InputMode, CELL_WIDTH};
use crate::input::TextInput;

/// Colours for one theme.
struct Palette {
    background: Color,
    text: Color,
    muted: Color,
    accent: Color,
    editing: Color,
    user: Color,
    assistant: Color,
    selected_bg: Color,
    found: Color,
    error: Color,
}

impl Palette {
    fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                background: Color::Reset,
                text: Color::White,
                muted: Color::DarkGray,
                accent: Color::Cyan,
                editing: Color::Yellow,
                user: Color::Cyan,
                assistant: Color::Yellow,
                selected_bg: Color::Blue,
                found: Color::Green,
                error: Color::Red,
            },
            Theme::Light => Self {
                background: Color::White,
                text: Color::Black,
                muted: Color::Gray,
                accent: Color::Blue,
                editing: Color::Magenta,
                user: Color::Blue,
                assistant: Color::Rgb(160, 90, 0),
                selected_bg: Color::LightBlue,
                found: Color::Rgb(0, 130, 0),
                error: Color::Rgb(190, 0, 0),
            },
        }
    }

    fn border(&self, active: bool) -> Style {
        Style::default().fg(if active { self.accent } else { self.muted })
    }
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("**") {
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("**") else {
            break;
        };
        if close == 0 {
            // "****" is literal
            spans.push(Span::raw(rest[..open + 4].to_string()));
            rest = &after_open[2..];
            continue;
        }

        if open > 0 {
            spans.push(Span::raw(rest[..open].to_string()));
        }
        spans.push(Span::styled(
            after_open[..close].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after_open[close + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    Line::from(spans)
}

fn loading_dots(app: &App) -> String {
    ".".repeat(app.animation_frame as usize + 1)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(app.shell.theme());

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        area,
    );

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(&app.shell, &palette, frame, header_area);

    match app.shell.view() {
        View::Chat => render_chat_view(app, &palette, frame, body_area),
        View::WordSearch => render_word_search_view(app, &palette, frame, body_area),
        View::CodeExercise => render_exercise_view(app, &palette, frame, body_area),
    }

    render_footer(app, &palette, frame, footer_area);
}

fn render_header(shell: &ShellContext, palette: &Palette, frame: &mut Frame, area: Rect) {
    let [brand_area, tabs_area, theme_area] = Layout::horizontal([
        Constraint::Length(APP_NAME.len() as u16 + 2),
        Constraint::Min(0),
        Constraint::Length(10),
    ])
    .areas(area);

    let brand = Paragraph::new(Span::styled(
        format!(" {} ", APP_NAME),
        Style::default().fg(palette.accent).bold(),
    ));
    frame.render_widget(brand, brand_area);

    let titles: Vec<Line> = View::all()
        .iter()
        .enumerate()
        .map(|(i, view)| Line::from(format!("{} {}", i + 1, view.title())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(shell.view().index())
        .style(Style::default().fg(palette.muted))
        .highlight_style(Style::default().fg(palette.accent).add_modifier(Modifier::BOLD))
        .divider(" | ");
    frame.render_widget(tabs, tabs_area);

    let theme_label = match shell.theme() {
        Theme::Dark => " ☾ oscuro ",
        Theme::Light => " ☀ claro ",
    };
    frame.render_widget(
        Paragraph::new(Span::styled(theme_label, Style::default().fg(palette.muted))),
        theme_area,
    );
}

fn render_footer(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(palette.editing).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDITAR ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(palette.text);

    let hints: Vec<(&str, &str)> = match (app.shell.view(), app.input_mode) {
        (View::Chat, InputMode::Normal) => vec![
            ("i", "escribir"),
            ("j/k", "desplazar"),
            ("1-3", "vistas"),
            ("t", "tema"),
            ("q", "salir"),
        ],
        (View::Chat, InputMode::Editing) => vec![("Enter", "enviar"), ("Esc", "terminar")],
        (View::WordSearch, InputMode::Normal) => vec![
            ("←↑↓→", "mover"),
            ("Espacio", "marcar"),
            ("i", "tema"),
            ("+/-", "tamaño"),
            ("g", "generar"),
            ("t", "tema visual"),
            ("q", "salir"),
        ],
        (View::WordSearch, InputMode::Editing) => vec![("Enter", "generar"), ("Esc", "terminar")],
        (View::CodeExercise, InputMode::Normal) => match app.exercise.mode() {
            ExerciseMode::Preview => vec![
                ("i", "prompt"),
                ("l", "lenguaje"),
                ("e", "explicación"),
                ("g", "generar"),
                ("s", "comenzar"),
                ("q", "salir"),
            ],
            ExerciseMode::Exercise => vec![
                ("i", "escribir"),
                ("c", "verificar"),
                ("r", "reiniciar"),
                ("q", "salir"),
            ],
        },
        (View::CodeExercise, InputMode::Editing) => match app.exercise.mode() {
            ExerciseMode::Preview => vec![("Enter", "generar"), ("Esc", "terminar")],
            ExerciseMode::Exercise => vec![("Ctrl+S", "verificar"), ("Esc", "terminar")],
        },
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    if app.is_loading() {
        spans.push(Span::styled(
            format!(" Cargando{}", loading_dots(app)),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Single-line input box with horizontal scrolling to keep the cursor visible.
fn render_line_input(
    input: &TextInput,
    title: &str,
    placeholder: &str,
    editing: bool,
    palette: &Palette,
    frame: &mut Frame,
    area: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { palette.editing } else { palette.muted }))
        .title(format!(" {} ", title));

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = input.cursor();
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let content = if input.value().is_empty() && !editing {
        Span::styled(placeholder.to_string(), Style::default().fg(palette.muted))
    } else {
        let visible: String = input.value().chars().skip(scroll_offset).take(inner_width).collect();
        Span::styled(visible, Style::default().fg(palette.user))
    };

    frame.render_widget(Paragraph::new(content).block(block), area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_chat_view(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(app.input_mode == InputMode::Normal))
        .title(" Chat Interactivo ");

    let chat_text = if app.chat.messages().is_empty() && !app.chat.is_loading() {
        Text::from(Span::styled(
            "Haz una pregunta para comenzar la conversación",
            Style::default().fg(palette.muted),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.chat.messages() {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "Tú:",
                        Style::default().fg(palette.user).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.content.as_str()));
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Asistente:",
                        Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.chat.is_loading() {
            lines.push(Line::from(Span::styled(
                "Asistente:",
                Style::default().fg(palette.assistant).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                format!("Pensando{}", loading_dots(app)),
                Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing && !app.chat.is_loading();
    render_line_input(
        &app.chat_input,
        "Pregunta",
        "Escribe tu pregunta...",
        editing,
        palette,
        frame,
        input_area,
    );
}

fn render_word_search_view(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let [form_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    let [topic_area, size_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(14),
    ])
    .areas(form_area);

    render_line_input(
        &app.topic_input,
        "Tema",
        "Ingresa un tema",
        app.input_mode == InputMode::Editing,
        palette,
        frame,
        topic_area,
    );

    let size = Paragraph::new(Line::from(vec![
        Span::styled("- ", Style::default().fg(palette.muted)),
        Span::styled(app.size.to_string(), Style::default().fg(palette.accent).bold()),
        Span::styled(" +", Style::default().fg(palette.muted)),
    ]))
    .centered()
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(palette.border(false))
            .title(" Tamaño "),
    );
    frame.render_widget(size, size_area);

    let [grid_area, words_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(28),
    ])
    .areas(body_area);

    let grid_block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(app.input_mode == InputMode::Normal))
        .title(" Sopa de Letras ");
    let grid_inner = grid_block.inner(grid_area);
    frame.render_widget(grid_block, grid_area);

    if app.board.is_loading() {
        app.grid_area = None;
        let loading = Paragraph::new(Span::styled(
            format!("Generando{}", loading_dots(app)),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        ))
        .centered();
        frame.render_widget(loading, grid_inner);
    } else if let Some(puzzle) = app.board.puzzle() {
        let found_cells = app.board.found_cells();
        let widest = puzzle.grid().iter().map(Vec::len).max().unwrap_or(0) as u16;
        let grid_width = (widest * CELL_WIDTH).min(grid_inner.width);
        let grid_height = (puzzle.grid().len() as u16).min(grid_inner.height);

        // Centre the grid and remember where it landed for mouse clicks
        let origin = Rect::new(
            grid_inner.x + (grid_inner.width - grid_width) / 2,
            grid_inner.y + (grid_inner.height - grid_height) / 2,
            grid_width,
            grid_height,
        );

        let lines: Vec<Line> = puzzle
            .grid()
            .iter()
            .enumerate()
            .map(|(row, cells)| {
                let spans: Vec<Span> = cells
                    .iter()
                    .enumerate()
                    .map(|(col, letter)| {
                        let cell = Cell::new(row, col);
                        let mut style = Style::default().fg(palette.text);
                        if found_cells.contains(&cell) {
                            style = style.fg(palette.found).add_modifier(Modifier::BOLD);
                        }
                        if app.board.is_selected(cell) {
                            style = style
                                .bg(palette.selected_bg)
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD);
                        }
                        if app.grid_cursor == cell && app.input_mode == InputMode::Normal {
                            style = style.add_modifier(Modifier::REVERSED);
                        }
                        Span::styled(format!(" {} ", letter), style)
                    })
                    .collect();
                Line::from(spans)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), origin);
        app.grid_area = Some(origin);
    } else {
        app.grid_area = None;
        let empty = Paragraph::new(Span::styled(
            "No se ha generado ninguna sopa de letras.",
            Style::default().fg(palette.muted),
        ))
        .centered()
        .wrap(Wrap { trim: true });
        frame.render_widget(empty, grid_inner);
    }

    // Words to find
    let items: Vec<ListItem> = app
        .board
        .puzzle()
        .map(|puzzle| {
            puzzle
                .answers()
                .iter()
                .map(|answer| {
                    if app.board.is_found(&answer.word) {
                        ListItem::new(Line::from(Span::styled(
                            format!(" ✓ {}", answer.word),
                            Style::default().fg(palette.found).bold(),
                        )))
                    } else {
                        ListItem::new(format!("   {}", answer.word))
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let words = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(palette.border(false))
            .title(" Palabras a encontrar "),
    );
    frame.render_widget(words, words_area);

    // Progress or the last error
    let status = if let Some(message) = app.board.status() {
        Span::styled(format!(" {}", message), Style::default().fg(palette.error))
    } else if app.board.puzzle().is_some() {
        let (found, total) = app.board.progress();
        let style = if app.board.is_complete() {
            Style::default().fg(palette.found).bold()
        } else {
            Style::default().fg(palette.text)
        };
        Span::styled(format!(" Encontradas: {} de {}", found, total), style)
    } else {
        Span::raw("")
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn render_exercise_view(app: &mut App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let show_form = app.exercise.mode() == ExerciseMode::Preview;

    let [form_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(if show_form { 3 } else { 0 }),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    if show_form {
        let [prompt_area, language_area, explanation_area] = Layout::horizontal([
            Constraint::Min(0),
            Constraint::Length(16),
            Constraint::Length(22),
        ])
        .areas(form_area);

        render_line_input(
            &app.prompt_input,
            "Prompt",
            "Describe el código que quieres generar",
            app.input_mode == InputMode::Editing,
            palette,
            frame,
            prompt_area,
        );

        let language = Paragraph::new(Span::styled(
            app.language.as_str(),
            Style::default().fg(palette.accent).bold(),
        ))
        .centered()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(palette.border(false))
                .title(" Lenguaje "),
        );
        frame.render_widget(language, language_area);

        let checkbox = if app.explanation { "[x]" } else { "[ ]" };
        let explanation = Paragraph::new(format!("{} Con explicación", checkbox))
            .block(Block::default().borders(Borders::ALL).border_style(palette.border(false)));
        frame.render_widget(explanation, explanation_area);
    }

    let body_block = Block::default()
        .borders(Borders::ALL)
        .border_style(palette.border(app.input_mode == InputMode::Normal))
        .title(" Ejercicio de Código ");

    if app.exercise.is_loading() {
        let loading = Paragraph::new(Span::styled(
            format!("Generando{}", loading_dots(app)),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        ))
        .centered()
        .block(body_block);
        frame.render_widget(loading, body_area);
    } else if let Some(artifact) = app.exercise.artifact() {
        match app.exercise.mode() {
            ExerciseMode::Preview => {
                let mut lines: Vec<Line> = artifact
                    .code
                    .lines()
                    .map(|line| Line::styled(line.to_string(), Style::default().fg(palette.accent)))
                    .collect();

                if let Some(explanation) = &artifact.explanation {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        "Explicación:",
                        Style::default().fg(palette.assistant).bold(),
                    )));
                    for line in explanation.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }

                let code = Paragraph::new(lines)
                    .block(body_block)
                    .wrap(Wrap { trim: false })
                    .scroll((app.code_scroll, 0));
                frame.render_widget(code, body_area);
            }
            ExerciseMode::Exercise => {
                render_attempt(app, palette, frame, body_area);
            }
        }
    } else {
        let empty = Paragraph::new(Span::styled(
            "Genera código para comenzar el ejercicio.",
            Style::default().fg(palette.muted),
        ))
        .centered()
        .block(body_block);
        frame.render_widget(empty, body_area);
    }

    let status = if let Some(message) = app.exercise.status() {
        Span::styled(format!(" {}", message), Style::default().fg(palette.error))
    } else {
        match app.exercise.verdict() {
            Some(true) => Span::styled(
                " ✓ ¡Correcto! Has escrito el código perfectamente.",
                Style::default().fg(palette.found).bold(),
            ),
            Some(false) => Span::styled(
                " ✗ Incorrecto. Hay diferencias con el código original.",
                Style::default().fg(palette.error).bold(),
            ),
            None => Span::raw(""),
        }
    };
    frame.render_widget(Paragraph::new(status), status_area);
}

fn render_attempt(app: &App, palette: &Palette, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Escribe el código de memoria ")
        .border_style(Style::default().fg(if editing { palette.editing } else { palette.muted }));

    let inner = block.inner(area);
    let (line, col) = app.attempt.line_col();
    let scroll = (line as u16).saturating_sub(inner.height.saturating_sub(1));

    let text = if app.attempt.value().is_empty() && !editing {
        Text::from(Span::styled("Escribe el código aquí...", Style::default().fg(palette.muted)))
    } else {
        Text::from(
            app.attempt
                .value()
                .split('\n')
                .map(|l| Line::from(l.to_string()))
                .collect::<Vec<_>>(),
        )
    };

    let attempt = Paragraph::new(text).block(block).scroll((scroll, 0));
    frame.render_widget(attempt, area);

    if editing {
        frame.set_cursor_position((
            inner.x + (col as u16).min(inner.width.saturating_sub(1)),
            inner.y + (line as u16).saturating_sub(scroll),
        ));
    }
}
