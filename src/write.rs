use crate::post::Post;
use crate::template::{self, Context, TemplateName, Templates};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// The file name of the archive page.
pub const ARCHIVE_PAGE: &str = "archives.html";

/// The file name of the home page.
pub const HOME_PAGE: &str = "index.html";

/// Responsible for templating and writing HTML pages to disk from [`Post`]s.
/// Every page is a `master` template wrapped around page-specific content,
/// and every page gets the same `postList` navigation fragment.
pub struct Writer<'a> {
    /// The loaded template set.
    pub templates: &'a Templates,

    /// The root of the generated site. Post pages go into
    /// `{output_directory}/posts/`, which must already exist.
    pub output_directory: &'a Path,
}

impl Writer<'_> {
    /// Writes the post pages, the archive page and the home page. Returns the
    /// number of pages written.
    pub fn write_posts(&self, posts: &[Post]) -> Result<usize> {
        let post_list = self.post_list(posts)?;
        self.write_post_pages(posts, &post_list)?;
        self.write_archive(posts, &post_list)?;
        self.write_home(posts, &post_list)?;
        Ok(posts.len() + 2)
    }

    /// Renders the navigation fragment: a `<ul>` with one `postListEntry` per
    /// post.
    pub fn post_list(&self, posts: &[Post]) -> Result<String> {
        let entries = self.concat(posts, |post| {
            self.templates.render(
                TemplateName::PostListEntry,
                Context::new()
                    .with("title", post.title.as_str())
                    .with("url", post.url.as_str()),
            )
        })?;
        Ok(format!("<ul>{}</ul>", entries))
    }

    /// Writes one page per post to `{output_directory}/{post.file_path}`.
    pub fn write_post_pages(&self, posts: &[Post], post_list: &str) -> Result<()> {
        for post in posts {
            let content = self.templates.render(
                TemplateName::Post,
                Context::new()
                    .with("title", post.title.as_str())
                    .with("content", post.body.as_str()),
            )?;
            self.write_page(&post.file_path, post_list, content)?;
        }
        Ok(())
    }

    /// Writes the archive page: one `postLink` per post, in order.
    pub fn write_archive(&self, posts: &[Post], post_list: &str) -> Result<()> {
        let content = self.concat(posts, |post| {
            self.templates.render(
                TemplateName::PostLink,
                Context::new()
                    .with("url", post.url.as_str())
                    .with("title", post.title.as_str())
                    .with("desc", post.desc.as_str())
                    .with("date", post.date.as_str()),
            )
        })?;
        self.write_page(Path::new(ARCHIVE_PAGE), post_list, content)
    }

    /// Writes the home page: every post in full, in order.
    pub fn write_home(&self, posts: &[Post], post_list: &str) -> Result<()> {
        let content = self.concat(posts, |post| {
            self.templates.render(
                TemplateName::HomePost,
                Context::new()
                    .with("title", post.title.as_str())
                    .with("content", post.body.as_str())
                    .with("url", post.url.as_str())
                    .with("date", post.date.as_str()),
            )
        })?;
        self.write_page(Path::new(HOME_PAGE), post_list, content)
    }

    // Renders one fragment per post and joins them.
    fn concat<F>(&self, posts: &[Post], fragment: F) -> Result<String>
    where
        F: Fn(&Post) -> template::Result<String>,
    {
        let fragments = posts
            .iter()
            .map(fragment)
            .collect::<template::Result<Vec<String>>>()?;
        Ok(fragments.concat())
    }

    // Wraps `content` in the master template and writes it to `relative_path`
    // under the output directory.
    fn write_page(&self, relative_path: &Path, post_list: &str, content: String) -> Result<()> {
        let html = self.templates.render(
            TemplateName::Master,
            Context::new()
                .with("postList", post_list)
                .with("content", content),
        )?;
        let path = self.output_directory.join(relative_path);
        std::fs::write(&path, html).map_err(|err| Error::Io { path: path.clone(), err })?;
        tracing::debug!(path = %path.display(), "wrote page");
        Ok(())
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error during templating.
    Template(template::Error),

    /// An error writing an output file.
    Io { path: PathBuf, err: io::Error },
}

impl From<template::Error> for Error {
    /// Converts a [`template::Error`] into an [`Error`]. This allows us to use
    /// the `?` operator for fallible template operations.
    fn from(err: template::Error) -> Error {
        Error::Template(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::Io { path, err } => write!(f, "writing '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(err) => Some(err),
            Error::Io { err, .. } => Some(err),
        }
    }
}
