//! Configuration loading and management.

use crate::cli::Args;
use camino::Utf8PathBuf;
use globset::{Glob, GlobSet, GlobSetBuilder};
use miette::{IntoDiagnostic, Result, WrapErr};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Name of the coolie configuration file.
pub const CONFIG_FILE_NAME: &str = "coolie.config.json";

/// The parts of `coolie.config.json` this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Source root, relative to the configuration file.
    #[serde(default)]
    pub src_dirname: Option<String>,
    /// Output root, relative to the configuration file.
    #[serde(default)]
    pub dest_dirname: Option<String>,
    /// Glob patterns of modules to skip, relative to the source root.
    #[serde(default)]
    pub ignore: Vec<String>,
}

impl ConfigFile {
    /// Load a configuration file, tolerating `//` and `/* */` comments.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

        serde_json::from_str(&strip_json_comments(&content))
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to parse {}", path.display()))
    }

    /// Find `coolie.config.json` in a directory or its parents.
    pub fn find(dir: &Path) -> Option<Utf8PathBuf> {
        dir.ancestors()
            .map(|ancestor| ancestor.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
            .and_then(|found| Utf8PathBuf::from_path_buf(found).ok())
    }
}

/// Resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// The configuration file in use, if any.
    pub config_path: Option<Utf8PathBuf>,
    /// Absolute source root.
    pub src_dirname: PathBuf,
    /// Output root; `None` when nothing is written.
    pub dest_dirname: Option<PathBuf>,
    /// Ignore patterns, as written.
    pub ignore_patterns: Vec<String>,
    ignore: GlobSet,
}

impl Config {
    /// Load configuration from CLI arguments and workspace.
    pub fn load(workspace: &Path, args: &Args) -> Result<Self> {
        let workspace = absolute(workspace)?;

        let config_path = match &args.config {
            Some(path) => {
                let path = absolute(path)?;
                Some(
                    Utf8PathBuf::from_path_buf(path)
                        .map_err(|p| miette::miette!("{} is not valid UTF-8", p.display()))?,
                )
            }
            None => ConfigFile::find(&workspace),
        };

        let (file, base_dir) = match &config_path {
            Some(path) => {
                let file = ConfigFile::load(path.as_std_path())?;
                let base_dir = path
                    .parent()
                    .map(|dir| dir.as_std_path().to_path_buf())
                    .unwrap_or_else(|| workspace.clone());
                (file, base_dir)
            }
            None => (ConfigFile::default(), workspace.clone()),
        };

        let src_dirname = coolie_mid_vue::paths::normalize_path(
            &base_dir.join(file.src_dirname.as_deref().unwrap_or(".")),
        );

        let dest_dirname = if args.dry_run {
            None
        } else {
            let dest = match (&args.out_dir, &file.dest_dirname) {
                (Some(out_dir), _) => absolute(out_dir)?,
                (None, Some(dest)) => base_dir.join(dest),
                (None, None) => {
                    return Err(miette::miette!(
                        help = "pass --out-dir, set destDirname in coolie.config.json, or use --dry-run",
                        "no output directory configured"
                    ))
                }
            };
            let dest = coolie_mid_vue::paths::normalize_path(&dest);
            if dest == src_dirname {
                return Err(miette::miette!(
                    "output directory {} is the source directory",
                    dest.display()
                ));
            }
            Some(dest)
        };

        let mut ignore_patterns = file.ignore;
        ignore_patterns.extend(args.ignore.iter().cloned());
        let ignore = build_globset(&ignore_patterns)?;

        Ok(Self {
            config_path,
            src_dirname,
            dest_dirname,
            ignore_patterns,
            ignore,
        })
    }

    /// Check if a module under the source root should be processed.
    pub fn should_process(&self, path: &Path) -> bool {
        if path.extension().map_or(true, |ext| ext != "js") {
            return false;
        }
        if coolie_mid_vue::virtual_file::is_virtual_file(path) {
            return false;
        }
        let relative = path.strip_prefix(&self.src_dirname).unwrap_or(path);
        !self.ignore.is_match(relative)
    }

    /// Where a file under the source root is written, if anywhere.
    pub fn output_path(&self, path: &Path) -> Option<PathBuf> {
        let dest = self.dest_dirname.as_ref()?;
        let relative = path.strip_prefix(&self.src_dirname).ok()?;
        Some(dest.join(relative))
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid ignore pattern '{}'", pattern))?;
        builder.add(glob);
    }
    builder.build().into_diagnostic()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(coolie_mid_vue::paths::normalize_path(path));
    }
    let cwd = std::env::current_dir()
        .into_diagnostic()
        .wrap_err("Failed to read the current directory")?;
    Ok(coolie_mid_vue::paths::normalize_path(&cwd.join(path)))
}

/// Remove `//` and `/* */` comments outside of string literals.
fn strip_json_comments(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut chars = json.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            result.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        result.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                result.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        result.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    if skipped == '\n' {
                        result.push('\n');
                    }
                    previous = skipped;
                }
            }
            _ => result.push(c),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn args(workspace: &Path) -> Args {
        Args {
            workspace: Some(workspace.to_path_buf()),
            ..Args::default()
        }
    }

    #[test]
    fn test_strip_json_comments() {
        let json = "{\n  // source\n  \"srcDirname\": \"./src\", /* out */ \"destDirname\": \"http://x/*y*/\"\n}";
        let stripped = strip_json_comments(json);
        assert_eq!(
            stripped,
            "{\n  \n  \"srcDirname\": \"./src\",  \"destDirname\": \"http://x/*y*/\"\n}"
        );
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["destDirname"], "http://x/*y*/");
    }

    #[test]
    fn test_find_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "{}").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let found = ConfigFile::find(&nested).unwrap();
        assert_eq!(found.as_std_path(), dir.path().join(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_load_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"{
                // coolie build
                "srcDirname": "./src",
                "destDirname": "../dist",
                "ignore": ["vendor/**"]
            }"#,
        )
        .unwrap();

        let mut args = args(dir.path());
        args.ignore.push("**/*.min.js".into());
        let config = Config::load(dir.path(), &args).unwrap();

        assert_eq!(config.src_dirname, dir.path().join("src"));
        assert_eq!(
            config.dest_dirname,
            Some(dir.path().parent().unwrap().join("dist"))
        );
        assert_eq!(config.ignore_patterns, vec!["vendor/**", "**/*.min.js"]);

        let src = dir.path().join("src");
        assert!(config.should_process(&src.join("index.js")));
        assert!(!config.should_process(&src.join("vendor/jquery.js")));
        assert!(!config.should_process(&src.join("lib/a.min.js")));
        assert!(!config.should_process(&src.join("app.html")));
        assert!(!config.should_process(&src.join("[coolie-mid-vue-virtual-file]-ab12.js")));
    }

    #[test]
    fn test_out_dir_overrides_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), r#"{"destDirname": "dist"}"#).unwrap();

        let mut args = args(dir.path());
        args.out_dir = Some(dir.path().join("out"));
        let config = Config::load(dir.path(), &args).unwrap();

        assert_eq!(config.src_dirname, dir.path());
        assert_eq!(config.dest_dirname, Some(dir.path().join("out")));
        assert_eq!(
            config.output_path(&dir.path().join("pages/a.js")),
            Some(dir.path().join("out/pages/a.js"))
        );
    }

    #[test]
    fn test_requires_output_unless_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(dir.path(), &args(dir.path())).is_err());

        let mut args = args(dir.path());
        args.dry_run = true;
        let config = Config::load(dir.path(), &args).unwrap();
        assert!(config.config_path.is_none());
        assert_eq!(config.dest_dirname, None);
        assert_eq!(config.output_path(&dir.path().join("a.js")), None);
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path());
        args.dry_run = true;
        args.ignore.push("a/[".into());
        assert!(Config::load(dir.path(), &args).is_err());
    }
}
