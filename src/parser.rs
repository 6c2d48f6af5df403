//! Defines the [`Parser`] type, which turns a directory of post sources into
//! the ordered list of [`Post`]s every page is built from.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::markdown::Renderer;
use crate::post::{self, DatedPost, ParsedPost, Post};

const MARKDOWN_EXTENSIONS: [&str; 2] = ["md", "markdown"];

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// Renders post bodies.
    renderer: &'a Renderer,
}

/// The outcome of [`Parser::parse_posts`].
#[derive(Debug, Default)]
pub struct Posts {
    /// The published posts, most recent first.
    pub posts: Vec<Post>,

    /// The number of posts dropped because they aren't published.
    pub unpublished: usize,
}

impl<'a> Parser<'a> {
    pub fn new(renderer: &'a Renderer) -> Parser<'a> {
        Parser { renderer }
    }

    /// Reads every post in `source_directory` and returns the published ones
    /// sorted by date (most recent first) with their URLs assigned.
    ///
    /// Only regular files with a `.md` or `.markdown` extension are read;
    /// dotfiles and subdirectories are skipped. Any post that fails to parse,
    /// has an invalid date, or would share its URL with another post fails
    /// the whole operation.
    pub fn parse_posts(&self, source_directory: &Path) -> Result<Posts> {
        let mut parsed = Vec::new();
        for path in post_sources(source_directory)? {
            parsed.push(self.parse_post(&path)?);
        }

        let total = parsed.len();
        let mut dated: Vec<DatedPost> = parsed
            .into_iter()
            .filter(|post| {
                if !post.is_published() {
                    tracing::debug!(source = %post.source.display(), "skipping unpublished post");
                }
                post.is_published()
            })
            .map(|post| {
                let source = post.source.clone();
                post.date().map_err(|err| Error::post(source, err))
            })
            .collect::<Result<_>>()?;
        let unpublished = total - dated.len();

        // Stable, so posts sharing a date keep their file name order. Nothing
        // downstream relies on that beyond deterministic output.
        dated.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut posts = Vec::with_capacity(dated.len());
        // Keyed case-insensitively: on case-insensitive filesystems `A.html`
        // and `a.html` are the same file.
        let mut sources_by_url: HashMap<String, PathBuf> = HashMap::new();
        for post in dated {
            let source = post.post.source.clone();
            let post = post.locate().map_err(|err| Error::post(source, err))?;
            if let Some(first) =
                sources_by_url.insert(post.url.to_lowercase(), post.source.clone())
            {
                return Err(Error::UrlCollision {
                    url: post.url,
                    first,
                    second: post.source,
                });
            }
            posts.push(post);
        }

        tracing::info!(
            published = posts.len(),
            unpublished,
            directory = %source_directory.display(),
            "collected posts"
        );
        Ok(Posts { posts, unpublished })
    }

    fn parse_post(&self, path: &Path) -> Result<ParsedPost> {
        let input = std::fs::read_to_string(path).map_err(|err| Error::Read {
            path: path.to_owned(),
            err,
        })?;
        ParsedPost::parse(path, &input, self.renderer).map_err(|err| Error::post(path, err))
    }
}

// Lists candidate post files in file name order.
fn post_sources(source_directory: &Path) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for result in WalkDir::new(source_directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = result?;
        if is_post_source(&entry) {
            sources.push(entry.into_path());
        } else {
            tracing::debug!(path = %entry.path().display(), "skipping non-post file");
        }
    }
    Ok(sources)
}

fn is_post_source(entry: &DirEntry) -> bool {
    let hidden = entry.file_name().to_string_lossy().starts_with('.');
    let markdown = entry
        .path()
        .extension()
        .map_or(false, |ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|md| ext.eq_ignore_ascii_case(md))
        });
    entry.file_type().is_file() && !hidden && markdown
}

/// Represents the result of a [`Parser`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error collecting posts.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source is invalid.
    Post { path: PathBuf, err: post::Error },

    /// Returned when a post source can't be read (including when it isn't
    /// valid UTF-8).
    Read { path: PathBuf, err: std::io::Error },

    /// Returned when the posts directory can't be listed.
    WalkDir(walkdir::Error),

    /// Returned when two posts would be written to the same URL.
    UrlCollision {
        url: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl Error {
    fn post(path: impl Into<PathBuf>, err: post::Error) -> Error {
        Error::Post {
            path: path.into(),
            err,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Post { path, err } => write!(f, "parsing post '{}': {}", path.display(), err),
            Error::Read { path, err } => write!(f, "reading post '{}': {}", path.display(), err),
            Error::WalkDir(err) => write!(f, "listing posts: {}", err),
            Error::UrlCollision { url, first, second } => write!(
                f,
                "posts '{}' and '{}' would both be written to `{}`; change a title or date",
                first.display(),
                second.display(),
                url
            ),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Post { err, .. } => Some(err),
            Error::Read { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::UrlCollision { .. } => None,
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator while listing directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::DEFAULT_THEME;
    use std::fs;
    use tempfile::TempDir;

    fn post(title: &str, date: &str, extra: &str) -> String {
        format!(
            "---\ntitle: \"{}\"\ndate: {}\n{}---\nBody of {}.\n",
            title, date, extra, title
        )
    }

    fn write_posts(files: &[(&str, String)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    fn parse(dir: &TempDir) -> Result<Posts> {
        let renderer = Renderer::new(DEFAULT_THEME).unwrap();
        Parser::new(&renderer).parse_posts(dir.path())
    }

    #[test]
    fn test_parse_posts_sorted_newest_first() -> Result<()> {
        let dir = write_posts(&[
            ("a.md", post("A", "Jan 01, 2021", "")),
            ("b.md", post("B", "Mar 05, 2021", "")),
            ("c.md", post("C", "Feb 10, 2021", "")),
        ]);

        let Posts { posts, unpublished } = parse(&dir)?;
        let urls: Vec<&str> = posts.iter().map(|p| p.url.as_str()).collect();
        assert_eq!(
            vec![
                "/posts/2021-03-05-B.html",
                "/posts/2021-02-10-C.html",
                "/posts/2021-01-01-A.html",
            ],
            urls
        );
        assert_eq!(0, unpublished);
        assert_eq!("<p>Body of B.</p>\n", posts[0].body);
        Ok(())
    }

    #[test]
    fn test_parse_posts_drops_unpublished() -> Result<()> {
        let dir = write_posts(&[
            ("draft.md", post("Draft", "Jan 01, 2021", "published: false\n")),
            ("live.md", post("Live", "Jan 02, 2021", "published: true\n")),
            ("default.md", post("Default", "Jan 03, 2021", "")),
        ]);

        let Posts { posts, unpublished } = parse(&dir)?;
        let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["Default", "Live"], titles);
        assert_eq!(1, unpublished);
        Ok(())
    }

    #[test]
    fn test_unpublished_posts_skip_date_validation() -> Result<()> {
        let dir = write_posts(&[(
            "draft.md",
            post("Draft", "sometime", "published: false\n"),
        )]);
        assert!(parse(&dir)?.posts.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_posts_skips_non_posts() -> Result<()> {
        let dir = write_posts(&[
            ("post.MD", post("Post", "Jan 01, 2021", "")),
            (".hidden.md", String::from("not a post")),
            ("notes.txt", String::from("not a post")),
        ]);
        fs::create_dir(dir.path().join("drafts.md")).unwrap();

        let posts = parse(&dir)?.posts;
        assert_eq!(1, posts.len());
        assert_eq!("Post", posts[0].title);
        Ok(())
    }

    #[test]
    fn test_invalid_date_names_file() {
        let dir = write_posts(&[("bad.md", post("Bad", "2021-01-01", ""))]);
        match parse(&dir) {
            Err(err @ Error::Post { .. }) => {
                let message = err.to_string();
                assert!(message.contains("bad.md"), "{}", message);
                assert!(message.contains("2021-01-01"), "{}", message);
            }
            other => panic!("wanted a post error; found {:?}", other),
        }
    }

    #[test]
    fn test_url_collision() {
        let dir = write_posts(&[
            ("one.md", post("Same Title", "Jan 01, 2021", "")),
            ("two.md", post("Same  Title", "Jan 01, 2021", "")),
        ]);
        match parse(&dir) {
            Err(Error::UrlCollision { url, first, second }) => {
                assert_eq!("/posts/2021-01-01-Same-Title.html", url);
                assert_eq!(dir.path().join("one.md"), first);
                assert_eq!(dir.path().join("two.md"), second);
            }
            other => panic!("wanted a collision; found {:?}", other),
        }
    }

    #[test]
    fn test_url_collision_ignores_case() {
        let dir = write_posts(&[
            ("one.md", post("Hello", "Jan 01, 2021", "")),
            ("two.md", post("hello", "Jan 01, 2021", "")),
        ]);
        match parse(&dir) {
            Err(Error::UrlCollision { url, first, second }) => {
                assert_eq!("/posts/2021-01-01-hello.html", url);
                assert_eq!(dir.path().join("one.md"), first);
                assert_eq!(dir.path().join("two.md"), second);
            }
            other => panic!("wanted a collision; found {:?}", other),
        }
    }

    #[test]
    fn test_same_title_on_different_days() -> Result<()> {
        let dir = write_posts(&[
            ("one.md", post("Hello", "Jan 01, 2021", "")),
            ("two.md", post("hello", "Jan 02, 2021", "")),
        ]);
        assert_eq!(2, parse(&dir)?.posts.len());
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = Renderer::new(DEFAULT_THEME).unwrap();
        let result = Parser::new(&renderer).parse_posts(&dir.path().join("nope"));
        assert!(matches!(result, Err(Error::WalkDir(_))));
    }
}
