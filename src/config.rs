use crate::markdown::DEFAULT_THEME;
use crate::url::POSTS_PATH;
use crate::write::{ARCHIVE_PAGE, HOME_PAGE};
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// The name of the optional project file in the source directory.
pub const PROJECT_FILE: &str = "quill.yaml";

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default)]
    posts_directory: Option<PathBuf>,

    #[serde(default)]
    templates_directory: Option<PathBuf>,

    #[serde(default)]
    static_files: Option<Vec<PathBuf>>,

    #[serde(default)]
    highlight_theme: Option<String>,
}

/// Everything a build needs to know, resolved to concrete paths.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The directory the site is built from.
    pub source_directory: PathBuf,

    /// The directory holding one markdown file per post.
    pub posts_directory: PathBuf,

    /// The directory holding the page templates.
    pub templates_directory: PathBuf,

    /// Files copied verbatim into the root of the output directory.
    pub static_files: Vec<PathBuf>,

    /// The directory the site is written to. Its contents are replaced on
    /// every build.
    pub output_directory: PathBuf,

    /// The [`syntect`] theme used for code blocks.
    pub highlight_theme: String,
}

impl Config {
    /// Resolves the configuration for the site in `source_directory`. Reads
    /// [`PROJECT_FILE`] if it exists and falls back to the conventional
    /// layout (`posts/`, `templates/`, every `*.css` file in the source
    /// directory) for anything it doesn't set.
    pub fn from_directory(source_directory: &Path, output_directory: &Path) -> Result<Config> {
        let path = source_directory.join(PROJECT_FILE);
        let project: Project = if path.is_file() {
            let file = std::fs::File::open(&path)
                .map_err(|e| anyhow!("Opening project file `{}`: {}", path.display(), e))?;
            serde_yaml::from_reader(file)
                .map_err(|e| anyhow!("Loading configuration from `{}`: {}", path.display(), e))?
        } else {
            Project::default()
        };
        Config::from_project(project, source_directory, output_directory)
    }

    fn from_project(
        project: Project,
        source_directory: &Path,
        output_directory: &Path,
    ) -> Result<Config> {
        let static_files = match project.static_files {
            Some(files) => files
                .iter()
                .map(|file| source_directory.join(file))
                .collect(),
            None => stylesheets(source_directory)?,
        };

        let mut names = HashSet::new();
        for file in static_files.iter() {
            let name = match file.file_name() {
                Some(name) => name.to_string_lossy().to_lowercase(),
                None => {
                    return Err(anyhow!(
                        "Static file `{}` doesn't name a file",
                        file.display()
                    ))
                }
            };
            // Static files are copied to the root of the output directory,
            // next to the generated pages.
            if [HOME_PAGE, ARCHIVE_PAGE, POSTS_PATH].contains(&name.as_str()) {
                return Err(anyhow!(
                    "Static file `{}` would overwrite generated output",
                    file.display()
                ));
            }
            if !names.insert(name) {
                return Err(anyhow!(
                    "Static file `{}` has the same name as another static file",
                    file.display()
                ));
            }
        }

        let config = Config {
            posts_directory: source_directory
                .join(project.posts_directory.unwrap_or_else(|| PathBuf::from("posts"))),
            templates_directory: source_directory.join(
                project
                    .templates_directory
                    .unwrap_or_else(|| PathBuf::from("templates")),
            ),
            static_files,
            output_directory: output_directory.to_owned(),
            highlight_theme: project
                .highlight_theme
                .unwrap_or_else(|| DEFAULT_THEME.to_owned()),
            source_directory: source_directory.to_owned(),
        };
        config.check_output_directory()?;
        Ok(config)
    }

    // The output directory is wiped on every build, so it must not be (or
    // contain) anything the build reads.
    fn check_output_directory(&self) -> Result<()> {
        let output = resolve(&self.output_directory)?;
        let inputs = [
            &self.source_directory,
            &self.posts_directory,
            &self.templates_directory,
        ];
        for input in inputs
            .iter()
            .copied()
            .chain(self.static_files.iter())
        {
            if resolve(input)?.starts_with(&output) {
                return Err(anyhow!(
                    "Refusing to build into `{}`, which contains `{}`",
                    self.output_directory.display(),
                    input.display()
                ));
            }
        }
        Ok(())
    }
}

// Makes `path` absolute with symlinks, `.` and `..` resolved. The path doesn't
// have to exist: its nearest existing ancestor is canonicalized and the rest
// is appended lexically.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_owned()
    } else {
        std::env::current_dir()
            .map_err(|e| anyhow!("Reading the current directory: {}", e))?
            .join(path)
    };

    for ancestor in absolute.ancestors() {
        let mut resolved = match ancestor.canonicalize() {
            Ok(resolved) => resolved,
            Err(_) => continue,
        };
        let remainder = absolute.strip_prefix(ancestor).unwrap_or(Path::new(""));
        for component in remainder.components() {
            match component {
                Component::ParentDir => {
                    resolved.pop();
                }
                Component::Normal(name) => resolved.push(name),
                _ => {}
            }
        }
        return Ok(resolved);
    }
    Ok(absolute)
}

// Every `*.css` file directly inside `dir`, sorted by name.
fn stylesheets(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries = std::fs::read_dir(dir)
        .map_err(|e| anyhow!("Reading source directory `{}`: {}", dir.display(), e))?;
    for entry in entries {
        let path = entry
            .map_err(|e| anyhow!("Reading source directory `{}`: {}", dir.display(), e))?
            .path();
        if path.is_file() && path.extension().map_or(false, |ext| ext == "css") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
