//! Defines the stages a post goes through on its way from a source file to a
//! page: [`ParsedPost`] (front-matter and rendered body), [`DatedPost`] (with
//! its date parsed) and finally [`Post`] (with its URL assigned). Each stage
//! consumes the previous one, so nothing is mutated after the fact.

use crate::markdown::Renderer;
use crate::url::{self, PostLocation};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// The one accepted format for the `date` front-matter field, e.g.
/// `Jan 02, 2021`.
pub const DATE_FORMAT: &str = "%b %d, %Y";

/// The front-matter of a post source file.
#[derive(Deserialize, Clone, Debug)]
pub struct Frontmatter {
    /// The title of the post.
    pub title: String,

    /// The date of the post as written by the author. This is what gets
    /// displayed; ordering and URLs use the parsed date.
    pub date: String,

    /// Whether the post should be part of the site. Only an explicitly falsy
    /// value removes a post; a missing key means published.
    #[serde(default = "published_by_default", deserialize_with = "deserialize_flag")]
    pub published: bool,

    /// A short description for the archive page.
    #[serde(default)]
    pub desc: String,
}

fn published_by_default() -> bool {
    true
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(is_truthy(&serde_yaml::Value::deserialize(deserializer)?))
}

/// Interprets a boolean-like YAML value. `null`, `false`, `0` and the strings
/// `""`, `false`, `no`, `off` and `0` (in any case) are falsy.
fn is_truthy(value: &serde_yaml::Value) -> bool {
    use serde_yaml::Value;
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        Value::String(s) => !matches!(
            s.trim().to_lowercase().as_str(),
            "" | "false" | "no" | "off" | "0"
        ),
        _ => true,
    }
}

/// A post whose front-matter has been parsed and whose body has been rendered
/// to HTML.
#[derive(Clone, Debug)]
pub struct ParsedPost {
    /// The source file the post was read from.
    pub source: PathBuf,
    pub frontmatter: Frontmatter,

    /// The rendered HTML body.
    pub body: String,
}

impl ParsedPost {
    /// Parses a post from the contents of its source file. The file must be
    /// structured as follows:
    ///
    /// 1. A line consisting of the front-matter fence (`---`)
    /// 2. YAML front-matter with `title`, `date` and optionally `published`
    ///    and `desc`
    /// 3. Another fence line
    /// 4. The markdown body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: Apr 16, 2021
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse(source: &Path, input: &str, renderer: &Renderer) -> Result<ParsedPost> {
        let (yaml, markdown) = split_frontmatter(input)?;
        let frontmatter: Frontmatter = serde_yaml::from_str(yaml)?;
        if frontmatter.title.trim().is_empty() {
            return Err(Error::EmptyTitle);
        }

        if markdown.trim().is_empty() {
            tracing::warn!(source = %source.display(), "post has an empty body");
        }

        Ok(ParsedPost {
            source: source.to_owned(),
            frontmatter,
            body: renderer.render(markdown),
        })
    }

    pub fn is_published(&self) -> bool {
        self.frontmatter.published
    }

    /// Parses the post's display date into a [`DatedPost`].
    pub fn date(self) -> Result<DatedPost> {
        match parse_date(&self.frontmatter.date) {
            Ok(timestamp) => Ok(DatedPost {
                post: self,
                timestamp,
            }),
            Err(err) => Err(Error::InvalidDate {
                date: self.frontmatter.date,
                err,
            }),
        }
    }
}

/// Parses a date written in [`DATE_FORMAT`].
pub fn parse_date(date: &str) -> std::result::Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
}

/// A [`ParsedPost`] with its date parsed.
#[derive(Clone, Debug)]
pub struct DatedPost {
    pub post: ParsedPost,
    pub timestamp: NaiveDate,
}

impl DatedPost {
    /// Assigns the post its URL, producing the final [`Post`].
    pub fn locate(self) -> Result<Post> {
        let DatedPost { post, timestamp } = self;
        let PostLocation { url, file_path } = match url::locate(timestamp, &post.frontmatter.title)
        {
            Some(location) => location,
            None => {
                return Err(Error::EmptySlug {
                    title: post.frontmatter.title,
                })
            }
        };

        Ok(Post {
            source: post.source,
            title: post.frontmatter.title,
            date: post.frontmatter.date,
            desc: post.frontmatter.desc,
            body: post.body,
            timestamp,
            url,
            file_path,
        })
    }
}

/// A fully built post, ready to be written out.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The source file the post was read from.
    pub source: PathBuf,

    pub title: String,

    /// The display date, exactly as written in the front-matter.
    pub date: String,

    pub desc: String,

    /// The rendered HTML body.
    pub body: String,

    /// The parsed date. Used for ordering and URLs only.
    pub timestamp: NaiveDate,

    /// The site-relative URL of the post page, e.g.
    /// `/posts/2021-01-02-Hello.html`.
    pub url: String,

    /// The output path of the post page relative to the output directory.
    pub file_path: PathBuf,
}

// Returns the (yaml, markdown) halves of a post source.
fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    const FENCE: &str = "---";

    let input = input.trim_start_matches('\u{feff}');
    let mut lines = input.split_inclusive('\n');
    let first = match lines.next() {
        Some(line) if line.trim_end() == FENCE => line,
        _ => return Err(Error::FrontmatterMissingStartFence),
    };

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        if line.trim_end() == FENCE {
            return Ok((&input[yaml_start..offset], &input[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(Error::FrontmatterMissingEndFence)
}

/// Represents the result of a post-building operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error building a single post.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file doesn't begin with a front-matter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when the opening fence was found but the closing one wasn't.
    FrontmatterMissingEndFence,

    /// Returned when the front-matter isn't valid YAML or is missing a
    /// required key.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the `title` is empty.
    EmptyTitle,

    /// Returned when the `date` isn't in [`DATE_FORMAT`].
    InvalidDate {
        date: String,
        err: chrono::ParseError,
    },

    /// Returned when nothing of the title survives sanitization.
    EmptySlug { title: String },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "post must begin with a `---` line")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "missing closing `---` line after front-matter")
            }
            Error::DeserializeYaml(err) => write!(f, "front-matter: {}", err),
            Error::EmptyTitle => write!(f, "`title` must not be empty"),
            Error::InvalidDate { date, err } => write!(
                f,
                "`date` {:?} doesn't match the format `MMM DD, YYYY` (e.g. `Jan 02, 2021`): {}",
                date, err
            ),
            Error::EmptySlug { title } => {
                write!(f, "title {:?} leaves nothing to build a URL from", title)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::DEFAULT_THEME;

    fn parse(input: &str) -> Result<ParsedPost> {
        let renderer = Renderer::new(DEFAULT_THEME).unwrap();
        ParsedPost::parse(Path::new("posts/test.md"), input, &renderer)
    }

    #[test]
    fn test_parse_post() -> Result<()> {
        let post = parse("---\ntitle: Hello\ndate: Jan 02, 2021\ndesc: greeting\n---\n# Hi\n")?;
        assert_eq!("Hello", post.frontmatter.title);
        assert_eq!("Jan 02, 2021", post.frontmatter.date);
        assert_eq!("greeting", post.frontmatter.desc);
        assert!(post.is_published());
        assert_eq!("<h1>Hi</h1>\n", post.body);
        Ok(())
    }

    #[test]
    fn test_parse_post_crlf() -> Result<()> {
        let post = parse("---\r\ntitle: Hello\r\ndate: Jan 02, 2021\r\n---\r\nbody\r\n")?;
        assert_eq!("Hello", post.frontmatter.title);
        assert!(post.body.contains("body"));
        Ok(())
    }

    #[test]
    fn test_fence_must_be_a_whole_line() -> Result<()> {
        let post = parse("---\ntitle: a --- b\ndate: Jan 02, 2021\n---\nbody\n")?;
        assert_eq!("a --- b", post.frontmatter.title);
        Ok(())
    }

    #[test]
    fn test_missing_fences() {
        assert!(matches!(
            parse("title: Hello\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            parse("---\ntitle: Hello\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
    }

    #[test]
    fn test_missing_title() {
        match parse("---\ndate: Jan 02, 2021\n---\n") {
            Err(Error::DeserializeYaml(err)) => assert!(err.to_string().contains("title")),
            other => panic!("wanted a YAML error; found {:?}", other),
        }
    }

    #[test]
    fn test_empty_title() {
        assert!(matches!(
            parse("---\ntitle: \"  \"\ndate: Jan 02, 2021\n---\n"),
            Err(Error::EmptyTitle)
        ));
    }

    #[test]
    fn test_published_flag() {
        struct TestCase {
            value: &'static str,
            wanted: bool,
        }

        let cases = [
            TestCase { value: "false", wanted: false },
            TestCase { value: "true", wanted: true },
            TestCase { value: "0", wanted: false },
            TestCase { value: "1", wanted: true },
            TestCase { value: "~", wanted: false },
            TestCase { value: "\"\"", wanted: false },
            TestCase { value: "no", wanted: false },
            TestCase { value: "Off", wanted: false },
            TestCase { value: "\"False\"", wanted: false },
            TestCase { value: "yes", wanted: true },
        ];

        for case in cases.iter() {
            let input = format!(
                "---\ntitle: T\ndate: Jan 02, 2021\npublished: {}\n---\n",
                case.value
            );
            let post = parse(&input).unwrap();
            assert_eq!(
                case.wanted,
                post.is_published(),
                "published: {}",
                case.value
            );
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            NaiveDate::from_ymd_opt(2021, 1, 2),
            parse_date("Jan 02, 2021").ok()
        );
        assert_eq!(
            NaiveDate::from_ymd_opt(2021, 3, 5),
            parse_date("Mar 5, 2021").ok()
        );
        assert!(parse_date("2021-01-02").is_err());
        assert!(parse_date("Foo 02, 2021").is_err());
        assert!(parse_date("Feb 30, 2021").is_err());
    }

    #[test]
    fn test_date_and_locate() -> Result<()> {
        let post = parse("---\ntitle: \"Hello: World?\"\ndate: Mar 05, 2021\n---\nbody\n")?
            .date()?
            .locate()?;
        assert_eq!(NaiveDate::from_ymd_opt(2021, 3, 5).unwrap(), post.timestamp);
        assert_eq!("Mar 05, 2021", post.date);
        assert_eq!("/posts/2021-03-05-Hello-World.html", post.url);
        assert_eq!(PathBuf::from("posts/test.md"), post.source);
        Ok(())
    }

    #[test]
    fn test_invalid_date() {
        let post = parse("---\ntitle: T\ndate: 2021-01-02\n---\n").unwrap();
        match post.date() {
            Err(Error::InvalidDate { date, .. }) => assert_eq!("2021-01-02", date),
            other => panic!("wanted an invalid date error; found {:?}", other),
        }
    }

    #[test]
    fn test_empty_slug() {
        let result = parse("---\ntitle: \"???\"\ndate: Jan 02, 2021\n---\n")
            .unwrap()
            .date()
            .unwrap()
            .locate();
        assert!(matches!(result, Err(Error::EmptySlug { .. })));
    }
}
