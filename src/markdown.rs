//! Converts post bodies from markdown to HTML. Fenced code blocks are pulled
//! out of the [`pulldown_cmark`] event stream and replaced with HTML
//! highlighted by [`syntect`]; everything else goes through
//! [`pulldown_cmark::html::push_html`] untouched.

use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use std::fmt;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

/// The highlighting theme used when the project file doesn't name one.
pub const DEFAULT_THEME: &str = "InspiredGitHub";

/// Renders markdown documents to HTML fragments.
pub struct Renderer {
    options: Options,
    highlighter: Highlighter,
}

impl Renderer {
    /// Creates a renderer which highlights code with the named [`syntect`]
    /// theme. Fails if the theme isn't one of the bundled defaults.
    pub fn new(theme: &str) -> Result<Renderer, Error> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);

        Ok(Renderer {
            options,
            highlighter: Highlighter::new(theme)?,
        })
    }

    /// Converts `markdown` to HTML.
    pub fn render(&self, markdown: &str) -> String {
        // (language, source) of the code block being collected, if any.
        let mut code: Option<(Option<String>, String)> = None;
        let mut events: Vec<Event> = Vec::new();

        for ev in Parser::new_ext(markdown, self.options) {
            match ev {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code = Some((language(&kind), String::new()));
                }
                Event::Text(text) => match &mut code {
                    Some((_, source)) => source.push_str(&text),
                    None => events.push(Event::Text(text)),
                },
                Event::End(Tag::CodeBlock(_)) => {
                    if let Some((lang, source)) = code.take() {
                        let highlighted = self.highlighter.highlight(&source, lang.as_deref());
                        events.push(Event::Html(CowStr::from(highlighted)));
                    }
                }
                ev => events.push(ev),
            }
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

// Only the first word of an info string like `rust,ignore` or `js title=x`
// names the language.
fn language(kind: &CodeBlockKind) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split(|c: char| c == ',' || c.is_whitespace())
            .next()
            .filter(|lang| !lang.is_empty())
            .map(str::to_owned),
        CodeBlockKind::Indented => None,
    }
}

struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    fn new(theme: &str) -> Result<Highlighter, Error> {
        let mut theme_set = ThemeSet::load_defaults();
        match theme_set.themes.remove(theme) {
            Some(theme) => Ok(Highlighter {
                syntax_set: SyntaxSet::load_defaults_newlines(),
                theme,
            }),
            None => Err(Error::UnknownTheme {
                theme: theme.to_owned(),
                available: theme_set.themes.into_keys().collect(),
            }),
        }
    }

    /// Highlights `code`. Without a language hint the syntax is guessed from
    /// the first line (e.g. a shebang). Unknown languages are rendered as a
    /// plain, escaped `<pre><code>` block.
    fn highlight(&self, code: &str, lang: Option<&str>) -> String {
        let syntax = match lang {
            Some(lang) => self.syntax_set.find_syntax_by_token(lang),
            None => self.syntax_set.find_syntax_by_first_line(code),
        };

        match syntax {
            Some(syntax) => {
                match highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme) {
                    Ok(html) => html,
                    Err(_) => plain(code, lang),
                }
            }
            None => plain(code, lang),
        }
    }
}

fn plain(code: &str, lang: Option<&str>) -> String {
    let mut out = match lang {
        Some(lang) => format!("<pre><code class=\"language-{}\">", lang),
        None => String::from("<pre><code>"),
    };
    // Writing into a `String` can't fail.
    let _ = escape_html(&mut out, code);
    out.push_str("</code></pre>\n");
    out
}

/// Represents an error setting up the markdown [`Renderer`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the configured highlighting theme isn't bundled with
    /// [`syntect`].
    UnknownTheme {
        theme: String,
        available: Vec<String>,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownTheme { theme, available } => write!(
                f,
                "unknown highlight theme `{}` (available: {})",
                theme,
                available.join(", ")
            ),
        }
    }
}

impl std::error::Error for Error {}
