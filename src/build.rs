//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading templates, collecting
//! the posts ([`crate::parser`]), clearing the output directory, rendering
//! pages ([`crate::write`]) and copying static files.

use crate::config::Config;
use crate::markdown::{Error as MarkdownError, Renderer};
use crate::parser::{Error as ParseError, Parser as PostParser, Posts};
use crate::template::{Error as TemplateError, Templates};
use crate::url::POSTS_PATH;
use crate::write::{Error as WriteError, Writer};
use std::fmt;
use std::path::{Path, PathBuf};

/// What a successful build produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// The number of published posts.
    pub posts: usize,

    /// The number of posts skipped because they aren't published.
    pub unpublished: usize,

    /// The number of HTML pages written.
    pub pages: usize,

    /// The number of static files copied.
    pub static_files: usize,
}

/// Builds the site described by a [`Config`].
///
/// Every input is read and validated before the output directory is touched,
/// so a failed build leaves the previous output in place. Once the inputs
/// check out, the output directory is deleted and regenerated from scratch.
pub fn build_site(config: &Config) -> Result<BuildStats> {
    tracing::info!(
        source = %config.source_directory.display(),
        output = %config.output_directory.display(),
        "building site"
    );

    let templates = Templates::load(&config.templates_directory)?;
    let renderer = Renderer::new(&config.highlight_theme)?;
    let Posts { posts, unpublished } =
        PostParser::new(&renderer).parse_posts(&config.posts_directory)?;

    for file in config.static_files.iter() {
        if !file.is_file() {
            return Err(Error::MissingStaticFile(file.clone()));
        }
    }

    rmdir(&config.output_directory)?;
    mkdir(&config.output_directory.join(POSTS_PATH))?;

    let writer = Writer {
        templates: &templates,
        output_directory: &config.output_directory,
    };
    let pages = writer.write_posts(&posts)?;

    for file in config.static_files.iter() {
        copy_static_file(file, &config.output_directory)?;
    }

    let stats = BuildStats {
        posts: posts.len(),
        unpublished,
        pages,
        static_files: config.static_files.len(),
    };
    tracing::info!(
        posts = stats.posts,
        unpublished = stats.unpublished,
        pages = stats.pages,
        static_files = stats.static_files,
        "site built"
    );
    Ok(stats)
}

fn copy_static_file(file: &Path, output_directory: &Path) -> Result<()> {
    // `Config` guarantees every static file path names a file.
    let destination = match file.file_name() {
        Some(name) => output_directory.join(name),
        None => return Err(Error::MissingStaticFile(file.to_owned())),
    };
    std::fs::copy(file, &destination).map_err(|err| Error::Copy {
        path: file.to_owned(),
        err,
    })?;
    tracing::debug!(from = %file.display(), to = %destination.display(), "copied static file");
    Ok(())
}

/// Removes `dir` and everything in it. A missing directory is fine.
fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

fn mkdir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|err| Error::Clean {
        path: dir.to_owned(),
        err,
    })
}

/// The result of a build.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during template loading,
/// parsing, writing, cleaning the output directory, and copying static files.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors loading templates.
    Template(TemplateError),

    /// Returned when the markdown renderer can't be set up.
    Markdown(MarkdownError),

    /// Returned for errors collecting posts.
    Parse(ParseError),

    /// Returned for errors writing pages to disk.
    Write(WriteError),

    /// Returned for I/O problems while cleaning or recreating the output
    /// directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when a configured static file doesn't exist.
    MissingStaticFile(PathBuf),

    /// Returned for I/O problems while copying a static file.
    Copy { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Markdown(err) => err.fmt(f),
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::MissingStaticFile(path) => {
                write!(f, "Static file '{}' does not exist", path.display())
            }
            Error::Copy { path, err } => {
                write!(f, "Copying static file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(err) => Some(err),
            Error::Markdown(err) => Some(err),
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::MissingStaticFile(_) => None,
            Error::Copy { path: _, err } => Some(err),
        }
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: TemplateError) -> Error {
        Error::Template(err)
    }
}

impl From<MarkdownError> for Error {
    /// Converts [`MarkdownError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: MarkdownError) -> Error {
        Error::Markdown(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}
