//! Derives the URL and output path of a post from its date and title.
//!
//! A post's URL has the shape `/posts/{YYYY-MM-DD}-{slug}.html`. The date part
//! always comes from the parsed post date (never from the display string in
//! the front-matter) and the slug is the post title made safe for use as a
//! file name: whitespace runs become a single `-`, characters that are illegal
//! in file names on common platforms are dropped, and trailing dots and spaces
//! are stripped. Case is preserved.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;

/// The directory (relative to the output root) and URL segment under which
/// post pages live.
pub const POSTS_PATH: &str = "posts";

const HTML_EXTENSION: &str = ".html";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    // `#` and `%` are legal in file names but would break the link in an
    // `href`, so they go too.
    static ref ILLEGAL: Regex = Regex::new(r#"[<>:"/\\|?*#%\x00-\x1F\x7F\x{80}-\x{9F}]"#).unwrap();
    static ref TRAILING: Regex = Regex::new(r"[. ]+$").unwrap();
}

/// Where a post ends up: the site-relative URL used in links and the path of
/// the output file relative to the output root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostLocation {
    pub url: String,
    pub file_path: PathBuf,
}

/// Sanitizes a post title into a slug. May return an empty string if the
/// title consists only of illegal characters.
pub fn slugify(title: &str) -> String {
    let hyphenated = WHITESPACE.replace_all(title.trim(), "-");
    let stripped = ILLEGAL.replace_all(&hyphenated, "");
    TRAILING.replace(&stripped, "").into_owned()
}

/// Computes the [`PostLocation`] for a post. Returns `None` if the title
/// sanitizes to an empty slug.
pub fn locate(date: NaiveDate, title: &str) -> Option<PostLocation> {
    let slug = slugify(title);
    if slug.is_empty() {
        return None;
    }

    let file_name = format!("{}-{}{}", date.format("%Y-%m-%d"), slug, HTML_EXTENSION);
    Some(PostLocation {
        url: format!("/{}/{}", POSTS_PATH, file_name),
        file_path: PathBuf::from(POSTS_PATH).join(file_name),
    })
}
