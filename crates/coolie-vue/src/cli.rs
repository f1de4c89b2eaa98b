//! Command-line argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Precompile `@coolievue` templates the way the coolie bundler would
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "coolie-vue")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Workspace directory to search for coolie.config.json
    #[arg(short, long)]
    pub workspace: Option<PathBuf>,

    /// Path to coolie.config.json
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to write rewritten modules and render modules to
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "human")]
    pub output: OutputFormat,

    /// Ignore patterns (glob), relative to the source directory
    #[arg(long)]
    pub ignore: Vec<String>,

    /// Report what would change without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Fail on warnings
    #[arg(long)]
    pub fail_on_warning: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    #[default]
    Human,
    /// JSON output, one object per line
    Json,
    /// Machine-readable output
    Machine,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["coolie-vue"]);
        assert_eq!(args.output, OutputFormat::Human);
        assert!(args.ignore.is_empty());
        assert!(!args.dry_run);
    }

    #[test]
    fn test_flags() {
        let args = Args::parse_from([
            "coolie-vue",
            "--workspace",
            "/app",
            "--out-dir",
            "dist",
            "--output",
            "json",
            "--ignore",
            "vendor/**",
            "--ignore",
            "**/*.min.js",
            "--dry-run",
            "--fail-on-warning",
        ]);
        assert_eq!(args.workspace, Some(PathBuf::from("/app")));
        assert_eq!(args.out_dir, Some(PathBuf::from("dist")));
        assert_eq!(args.output, OutputFormat::Json);
        assert_eq!(args.ignore, vec!["vendor/**", "**/*.min.js"]);
        assert!(args.dry_run);
        assert!(args.fail_on_warning);
    }
}
