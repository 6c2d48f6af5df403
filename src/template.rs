//! Loads the site's templates and renders them with flat string contexts.
//!
//! Templates use [`gtmpl`] (Go `text/template`) syntax: a placeholder is
//! written `{{.title}}`. Values are inserted as-is, which is what we want for
//! pre-rendered HTML such as `content` and `postList`; templates that need an
//! escaped value can pipe it through `html` (`{{.title | html}}`).

use gtmpl::{Template, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The templates a site is built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TemplateName {
    /// The page shell. Receives `postList` and `content`.
    Master,

    /// The body of a post page. Receives `title` and `content`.
    Post,

    /// An archive entry. Receives `url`, `title`, `desc` and `date`.
    PostLink,

    /// A navigation entry. Receives `title` and `url`.
    PostListEntry,

    /// A post on the home page. Receives `title`, `content`, `url` and `date`.
    HomePost,
}

impl TemplateName {
    pub const ALL: [TemplateName; 5] = [
        TemplateName::Master,
        TemplateName::Post,
        TemplateName::PostLink,
        TemplateName::PostListEntry,
        TemplateName::HomePost,
    ];

    /// The name templates refer to each other by, e.g. `postLink`.
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateName::Master => "master",
            TemplateName::Post => "post",
            TemplateName::PostLink => "postLink",
            TemplateName::PostListEntry => "postListEntry",
            TemplateName::HomePost => "homePost",
        }
    }

    /// Candidate file names, in lookup order.
    fn file_names(self) -> &'static [&'static str] {
        match self {
            TemplateName::Master => &["master.html"],
            TemplateName::Post => &["post.html"],
            TemplateName::PostLink => &["postLink.html", "post-link.html"],
            TemplateName::PostListEntry => &["postListEntry.html", "post-list-entry.html"],
            TemplateName::HomePost => &["homePost.html", "home-post.html"],
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flat placeholder → value mapping for a single render call.
#[derive(Clone, Debug, Default)]
pub struct Context(HashMap<String, Value>);

impl Context {
    pub fn new() -> Context {
        Context::default()
    }

    /// Adds a value, replacing any previous value for `key`.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Context {
        self.0.insert(key.to_owned(), Value::String(value.into()));
        self
    }
}

impl From<Context> for Value {
    fn from(context: Context) -> Value {
        Value::Object(context.0)
    }
}

/// The loaded template set. Every template is parsed when loading, so a bad
/// template fails the build before anything is written.
pub struct Templates {
    parsed: HashMap<&'static str, Template>,
}

impl Templates {
    /// Loads every [`TemplateName`] from `directory`.
    pub fn load(directory: &Path) -> Result<Templates> {
        let mut parsed = HashMap::new();
        for name in TemplateName::ALL.iter().copied() {
            let path = find(directory, name)?;
            let text = std::fs::read_to_string(&path).map_err(|err| Error::Read {
                path: path.clone(),
                err,
            })?;
            tracing::debug!(template = %name, path = %path.display(), "loaded template");
            parsed.insert(name.as_str(), Templates::parse(&path, &text)?);
        }
        Ok(Templates { parsed })
    }

    /// Builds a template set from in-memory sources, parsing each one.
    pub fn from_sources(sources: &[(TemplateName, &str)]) -> Result<Templates> {
        let mut parsed = HashMap::new();
        for (name, text) in sources {
            let path = PathBuf::from(name.file_names()[0]);
            parsed.insert(name.as_str(), Templates::parse(&path, text)?);
        }

        match TemplateName::ALL
            .iter()
            .find(|name| !parsed.contains_key(name.as_str()))
        {
            Some(name) => Err(Error::Missing {
                name: *name,
                tried: name.file_names().iter().map(PathBuf::from).collect(),
            }),
            None => Ok(Templates { parsed }),
        }
    }

    // Functions have to be registered before parsing; the parser rejects
    // calls to unknown functions.
    fn parse(path: &Path, text: &str) -> Result<Template> {
        let mut template = Template::default();
        template.add_func("html", html);
        template.parse(text).map_err(|message| Error::Parse {
            path: path.to_owned(),
            message,
        })?;
        Ok(template)
    }

    /// Renders the template `name` with `context`.
    pub fn render(&self, name: TemplateName, context: Context) -> Result<String> {
        let render_error = |message: String| Error::Render { name, message };
        let template = self
            .parsed
            .get(name.as_str())
            .ok_or_else(|| render_error(String::from("template isn't loaded")))?;
        let context = gtmpl::Context::from(Value::from(context)).map_err(render_error)?;
        template.render(&context).map_err(render_error)
    }
}

impl fmt::Debug for Templates {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut names: Vec<&&str> = self.parsed.keys().collect();
        names.sort();
        f.debug_struct("Templates").field("parsed", &names).finish()
    }
}

// `{{.title | html}}`: escapes the piped value for use in HTML text or
// attributes.
fn html(args: &[Value]) -> std::result::Result<Value, String> {
    let text = match args.last() {
        Some(Value::String(s)) => s.clone(),
        Some(value) => value.to_string(),
        None => return Err(String::from("html expects an argument")),
    };
    let mut escaped = String::with_capacity(text.len());
    pulldown_cmark::escape::escape_html(&mut escaped, &text).map_err(|e| e.to_string())?;
    Ok(Value::String(escaped))
}

fn find(directory: &Path, name: TemplateName) -> Result<PathBuf> {
    let tried: Vec<PathBuf> = name
        .file_names()
        .iter()
        .map(|file_name| directory.join(file_name))
        .collect();
    match tried.iter().find(|path| path.is_file()) {
        Some(path) => Ok(path.clone()),
        None => Err(Error::Missing { name, tried }),
    }
}

/// The result of a template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading or rendering templates.
#[derive(Debug)]
pub enum Error {
    /// Returned when none of a template's candidate files exist.
    Missing {
        name: TemplateName,
        tried: Vec<PathBuf>,
    },

    /// Returned for I/O problems while reading a template file.
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when a template has a syntax error.
    Parse { path: PathBuf, message: String },

    /// Returned when rendering a template fails, e.g. because it refers to a
    /// placeholder that isn't provided.
    Render { name: TemplateName, message: String },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Missing { name, tried } => {
                let tried: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
                write!(
                    f,
                    "missing template `{}` (tried {})",
                    name,
                    tried.join(", ")
                )
            }
            Error::Read { path, err } => {
                write!(f, "reading template file '{}': {}", path.display(), err)
            }
            Error::Parse { path, message } => {
                write!(f, "parsing template file '{}': {}", path.display(), message)
            }
            Error::Render { name, message } => {
                write!(f, "rendering template `{}`: {}", name, message)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Read { err, .. } => Some(err),
            _ => None,
        }
    }
}
