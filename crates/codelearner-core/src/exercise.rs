use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::ApiClient;

pub const DEFAULT_PROMPT: &str = "Función para calcular el factorial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    Python,
    JavaScript,
    Java,
    #[serde(rename = "C++")]
    Cpp,
}

impl Language {
    /// Name used on the wire and in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::Java => "Java",
            Language::Cpp => "C++",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" => Some(Language::Python),
            "javascript" => Some(Language::JavaScript),
            "java" => Some(Language::Java),
            "c++" | "cpp" => Some(Language::Cpp),
            _ => None,
        }
    }

    pub fn all() -> Vec<Language> {
        vec![Language::Python, Language::JavaScript, Language::Java, Language::Cpp]
    }

    pub fn next(&self) -> Language {
        match self {
            Language::Python => Language::JavaScript,
            Language::JavaScript => Language::Java,
            Language::Java => Language::Cpp,
            Language::Cpp => Language::Python,
        }
    }

    pub fn stripper(&self) -> &'static dyn CommentStripper {
        match self {
            Language::Python => &PythonComments,
            Language::JavaScript => &CStyleComments,
            Language::Java | Language::Cpp => &NoStripping,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Removes comment syntax from source code before it is compared.
pub trait CommentStripper: Sync {
    fn strip(&self, code: &str) -> String;
}

static PY_DOCSTRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)""".*?""""#).expect("valid docstring regex"));
static PY_LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)#.*$").expect("valid line comment regex"));
static C_BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid block comment regex"));
static C_LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)//.*$").expect("valid line comment regex"));

/// `"""…"""` blocks, then `#` to end of line.
pub struct PythonComments;

impl CommentStripper for PythonComments {
    fn strip(&self, code: &str) -> String {
        let code = PY_DOCSTRING.replace_all(code, "");
        PY_LINE_COMMENT.replace_all(&code, "").trim().to_string()
    }
}

/// `/*…*/` blocks, then `//` to end of line.
pub struct CStyleComments;

impl CommentStripper for CStyleComments {
    fn strip(&self, code: &str) -> String {
        let code = C_BLOCK_COMMENT.replace_all(code, "");
        C_LINE_COMMENT.replace_all(&code, "").trim().to_string()
    }
}

/// Used for languages without a stripper; returns the code unchanged.
pub struct NoStripping;

impl CommentStripper for NoStripping {
    fn strip(&self, code: &str) -> String {
        code.to_string()
    }
}

/// Collapses every whitespace run into a single space and trims the ends.
pub fn normalize_whitespace(code: &str) -> String {
    code.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compares typed code against the canonical code, ignoring whitespace layout
/// and, when `strip_comments` is set, the language's comments.
pub fn check_equivalence(
    canonical: &str,
    language: Language,
    strip_comments: bool,
    user_input: &str,
) -> bool {
    let expected = if strip_comments {
        language.stripper().strip(canonical)
    } else {
        canonical.to_string()
    };

    normalize_whitespace(&expected) == normalize_whitespace(user_input)
}

/// Generated code as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeArtifact {
    pub code: String,
    #[serde(default)]
    pub explanation: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub language: Language,
    pub explanation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExerciseMode {
    #[default]
    Preview,
    Exercise,
}

#[derive(Debug, Default)]
pub struct CodeExerciseSession {
    artifact: Option<CodeArtifact>,
    request: Option<GenerateRequest>,
    mode: ExerciseMode,
    user_input: String,
    verdict: Option<bool>,
    loading: bool,
    status: Option<String>,
}

impl CodeExerciseSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact(&self) -> Option<&CodeArtifact> {
        self.artifact.as_ref()
    }

    pub fn request(&self) -> Option<&GenerateRequest> {
        self.request.as_ref()
    }

    pub fn mode(&self) -> ExerciseMode {
        self.mode
    }

    pub fn user_input(&self) -> &str {
        &self.user_input
    }

    pub fn user_input_mut(&mut self) -> &mut String {
        &mut self.user_input
    }

    pub fn verdict(&self) -> Option<bool> {
        self.verdict
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn begin_generate(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.status = None;
        true
    }

    pub fn finish_generate<E: fmt::Display>(
        &mut self,
        request: GenerateRequest,
        result: Result<CodeArtifact, E>,
    ) {
        self.loading = false;
        match result {
            Ok(artifact) => {
                info!(
                    language = %request.language,
                    lines = artifact.code.lines().count(),
                    "code generated"
                );
                self.artifact = Some(artifact);
                self.request = Some(request);
                self.mode = ExerciseMode::Preview;
                self.user_input.clear();
                self.verdict = None;
            }
            Err(e) => {
                error!(error = %e, "error fetching code");
                self.status = Some(format!("No se pudo generar el código: {e}"));
            }
        }
    }

    pub async fn generate(&mut self, client: &ApiClient, request: GenerateRequest) {
        if self.begin_generate() {
            let result = client
                .generate_code(&request.prompt, request.language, request.explanation)
                .await;
            self.finish_generate(request, result);
        }
    }

    /// Hides the code and starts a fresh attempt. No-op without generated code.
    pub fn start_exercise(&mut self) {
        if self.artifact.is_none() {
            return;
        }
        self.mode = ExerciseMode::Exercise;
        self.user_input.clear();
        self.verdict = None;
    }

    pub fn reset_exercise(&mut self) {
        self.mode = ExerciseMode::Preview;
        self.user_input.clear();
        self.verdict = None;
    }

    /// Checks the current attempt and records the verdict.
    ///
    /// Returns `None` when there is nothing to check: no code yet or a blank attempt.
    pub fn check(&mut self) -> Option<bool> {
        let artifact = self.artifact.as_ref()?;
        let request = self.request.as_ref()?;
        if self.user_input.trim().is_empty() {
            return None;
        }

        let correct = check_equivalence(
            &artifact.code,
            request.language,
            request.explanation,
            &self.user_input,
        );
        info!(correct, "exercise checked");
        self.verdict = Some(correct);
        Some(correct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    fn session_with(code: &str, language: Language, explanation: bool) -> CodeExerciseSession {
        let mut session = CodeExerciseSession::new();
        session.begin_generate();
        session.finish_generate::<ApiError>(
            GenerateRequest {
                prompt: DEFAULT_PROMPT.to_string(),
                language,
                explanation,
            },
            Ok(CodeArtifact {
                code: code.to_string(),
                explanation: explanation.then(|| "Explicación".to_string()),
                language: language.as_str().to_string(),
            }),
        );
        session
    }

    #[test]
    fn test_language_names() {
        for language in Language::all() {
            assert_eq!(Language::from_str(language.as_str()), Some(language));
        }
        assert_eq!(Language::from_str("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_str("Rust"), None);
        assert_eq!(Language::Cpp.next(), Language::Python);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\n\n\tb   c \r\n"), "a b c");
        assert_eq!(normalize_whitespace(" \n "), "");
    }

    #[test]
    fn test_python_stripping() {
        let code = "def f():\n    \"\"\"Doc\n    string\"\"\"\n    return 1  # one\n# tail";
        assert_eq!(normalize_whitespace(&PythonComments.strip(code)), "def f(): return 1");
    }

    #[test]
    fn test_javascript_stripping() {
        let code = "/* header\n */\nfunction f() {\n  // body\n  return 1; /* inline */\n}";
        assert_eq!(
            normalize_whitespace(&CStyleComments.strip(code)),
            "function f() { return 1; }"
        );
    }

    #[test]
    fn test_unsupported_languages_keep_comments() {
        let code = "int f() { // one\n  return 1; }";
        assert_eq!(Language::Java.stripper().strip(code), code);
        assert_eq!(Language::Cpp.stripper().strip(code), code);
    }

    #[test]
    fn test_stripping_is_idempotent() {
        let samples = [
            (Language::Python, "x = 1 # a\n\"\"\"b\"\"\"\ny = '#'\n\"\"\"\"\"\"\"\""),
            (Language::Python, "\"\"\"a\"\"\" \"\"\" b\n# c \"\"\"\nz"),
            (Language::JavaScript, "/* a */ let x = 1; // b\n/* c // d */ y/* */*/"),
            (Language::Java, "class A { /* x */ }"),
        ];
        for (language, code) in samples {
            let once = language.stripper().strip(code);
            let twice = language.stripper().strip(&once);
            assert_eq!(once, twice, "{language}: {code:?}");
        }
    }

    #[test]
    fn test_equivalence_is_reflexive_on_normalized_code() {
        let code = "def f():\n    # comment\n    return 1";
        let normalized = normalize_whitespace(&Language::Python.stripper().strip(code));
        assert!(check_equivalence(code, Language::Python, true, &normalized));
    }

    #[test]
    fn test_equivalence_ignores_whitespace_layout() {
        let code = "function add(a, b) {\n  return a + b;\n}";
        assert!(check_equivalence(
            code,
            Language::JavaScript,
            false,
            "function add(a, b) { return a + b; }"
        ));
        assert!(check_equivalence(
            code,
            Language::JavaScript,
            false,
            "\n\nfunction   add(a, b)   {\n\n    return a + b;\n}\n\n"
        ));
        assert!(!check_equivalence(
            code,
            Language::JavaScript,
            false,
            "function add(a,b) { return a + b; }"
        ));
    }

    #[test]
    fn test_comments_only_stripped_when_explanation_requested() {
        let code = "def f():\n    # comment\n    return 1";
        assert!(check_equivalence(code, Language::Python, true, "def f():\n  return 1"));
        assert!(!check_equivalence(code, Language::Python, false, "def f():\n  return 1"));
    }

    #[test]
    fn test_session_check_flow() {
        let mut session =
            session_with("def f():\n    # comment\n    return 1", Language::Python, true);
        assert_eq!(session.mode(), ExerciseMode::Preview);

        session.start_exercise();
        assert_eq!(session.mode(), ExerciseMode::Exercise);
        assert_eq!(session.check(), None);

        session.user_input_mut().push_str("def f():\n  return 1");
        assert_eq!(session.check(), Some(true));
        assert_eq!(session.verdict(), Some(true));

        session.user_input_mut().push_str(" + 1");
        assert_eq!(session.check(), Some(false));

        session.reset_exercise();
        assert_eq!(session.mode(), ExerciseMode::Preview);
        assert!(session.user_input().is_empty());
        assert_eq!(session.verdict(), None);
    }

    #[test]
    fn test_start_exercise_requires_code() {
        let mut session = CodeExerciseSession::new();
        session.start_exercise();
        assert_eq!(session.mode(), ExerciseMode::Preview);
    }

    #[test]
    fn test_failed_generation_keeps_previous_artifact() {
        let mut session = session_with("print(1)", Language::Python, false);
        session.start_exercise();
        session.user_input_mut().push_str("print(");

        assert!(session.begin_generate());
        session.finish_generate(
            GenerateRequest {
                prompt: "otra".to_string(),
                language: Language::Java,
                explanation: true,
            },
            Err(ApiError::InvalidSize(0)),
        );

        assert_eq!(session.artifact().unwrap().code, "print(1)");
        assert_eq!(session.request().unwrap().language, Language::Python);
        assert_eq!(session.mode(), ExerciseMode::Exercise);
        assert_eq!(session.user_input(), "print(");
        assert!(session.status().is_some());
    }

    #[test]
    fn test_artifact_decodes_without_explanation() {
        let artifact: CodeArtifact =
            serde_json::from_str(r#"{"code":"print(1)","language":"Python"}"#).unwrap();
        assert_eq!(artifact.explanation, None);
    }
}
