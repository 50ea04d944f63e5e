//! Navigation and theme state shared by every view.
//!
//! Created once at start-up and handed to the views explicitly; dropped on exit.

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "CodeLearner";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Chat,
    WordSearch,
    CodeExercise,
}

impl View {
    pub fn all() -> Vec<View> {
        vec![View::Chat, View::WordSearch, View::CodeExercise]
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Chat => "Chat",
            View::WordSearch => "Sopa de Letras",
            View::CodeExercise => "Ejercicio de Código",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            View::Chat => 0,
            View::WordSearch => 1,
            View::CodeExercise => 2,
        }
    }

    pub fn next(&self) -> View {
        match self {
            View::Chat => View::WordSearch,
            View::WordSearch => View::CodeExercise,
            View::CodeExercise => View::Chat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShellContext {
    view: View,
    theme: Theme,
    visited: Vec<View>,
}

impl ShellContext {
    pub fn new(theme: Theme) -> Self {
        Self {
            view: View::Chat,
            theme,
            visited: vec![View::Chat],
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Switches view. Returns `true` the first time `view` is entered.
    pub fn navigate(&mut self, view: View) -> bool {
        self.view = view;
        if self.visited.contains(&view) {
            false
        } else {
            self.visited.push(view);
            true
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}
