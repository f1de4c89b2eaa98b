//! Orchestrator for one simulated bundler run.

use crate::cli::Args;
use crate::config::Config;
use crate::output::OutputFormatter;
use coolie_mid_vue::{
    pipeline, BuildConfig, Es5Transpiler, FsHost, Phase, PipelineOptions, Transform,
    VueTemplateCompiler,
};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Vue's full build inside the source root's dependencies.
const VUE_FULL_BUILD: &str = "node_modules/vue/dist/vue.common.js";

/// Result of a run.
#[derive(Debug, Default)]
pub struct RunResult {
    /// Number of modules processed.
    pub file_count: usize,
    /// Number of modules whose source changed.
    pub rewritten_count: usize,
    /// Number of render modules registered.
    pub virtual_file_count: usize,
    /// Where the `vue` dependency resolves after the runtime-only switch.
    pub runtime_build: Option<PathBuf>,
    /// Number of errors.
    pub error_count: usize,
    /// Number of warnings.
    pub warning_count: usize,
    /// Time taken.
    pub duration_ms: u64,
}

/// A processed module.
struct ModuleOutput {
    file: PathBuf,
    source: String,
    code: String,
}

/// Orchestrator for running coolie-vue.
pub struct Orchestrator {
    /// Configuration.
    config: Config,
    /// Output formatter.
    formatter: OutputFormatter,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(workspace: PathBuf, args: Args) -> Result<Self> {
        let config = Config::load(&workspace, &args)?;
        let formatter = OutputFormatter::new(args.output);

        tracing::debug!(
            config = ?config.config_path,
            src = %config.src_dirname.display(),
            dest = ?config.dest_dirname,
            "loaded configuration"
        );

        Ok(Self { config, formatter })
    }

    /// Run every phase over the source tree, write the results and report.
    pub fn run(&mut self) -> Result<RunResult> {
        let start = Instant::now();

        let files = self.find_modules()?;
        tracing::info!("found {} modules", files.len());

        let mut plugin = pipeline(FsHost::new(), VueTemplateCompiler, Es5Transpiler);
        plugin
            .transform(&mut PipelineOptions::post_config(BuildConfig::new(
                &self.config.src_dirname,
            )))
            .into_diagnostic()?;

        let mut modules = Vec::with_capacity(files.len());
        for file in files {
            let source = std::fs::read_to_string(&file)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to read {}", file.display()))?;

            let mut options = PipelineOptions::module(Phase::PreModule, &file, source.clone(), false);
            plugin
                .transform(&mut options)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to process {}", file.display()))?;
            options.progress = Phase::PostModule;
            plugin
                .transform(&mut options)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to process {}", file.display()))?;

            modules.push(ModuleOutput {
                file,
                source,
                code: options.code,
            });
        }

        let runtime_build = self.resolve_vue(&mut plugin)?;
        let diagnostics = plugin.templates_mut().take_diagnostics();
        let host = plugin.into_host();

        if self.config.dest_dirname.is_some() {
            for module in &modules {
                self.write(&module.file, &module.code)?;
            }
            for virtual_file in host.virtual_files() {
                self.write(&virtual_file.path, &virtual_file.content)?;
            }
        }

        let mut result = RunResult {
            file_count: modules.len(),
            rewritten_count: modules.iter().filter(|m| m.code != m.source).count(),
            virtual_file_count: host.len(),
            runtime_build,
            ..RunResult::default()
        };

        for diagnostic in &diagnostics {
            let source = modules
                .iter()
                .find(|m| m.file == diagnostic.file)
                .map(|m| m.source.as_str());
            self.formatter.print_diagnostic(diagnostic, source);
            if diagnostic.is_error() {
                result.error_count += 1;
            } else {
                result.warning_count += 1;
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        self.formatter.print_summary(&result);

        Ok(result)
    }

    /// Find all modules under the source root.
    fn find_modules(&self) -> Result<Vec<PathBuf>> {
        let src = &self.config.src_dirname;
        if !src.is_dir() {
            return Err(miette::miette!(
                "source directory {} does not exist",
                src.display()
            ));
        }
        let dest = self.config.dest_dirname.as_deref();

        let mut files = Vec::new();
        let walker = walkdir::WalkDir::new(src)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                let name = entry.file_name().to_string_lossy();
                entry.depth() == 0
                    || !(name == "node_modules"
                        || name.starts_with('.')
                        || dest.is_some_and(|dest| entry.path() == dest))
            });

        for entry in walker {
            let entry = entry.into_diagnostic()?;
            let path = entry.path();
            if entry.file_type().is_file() && self.config.should_process(path) {
                files.push(path.to_path_buf());
            }
        }

        Ok(files)
    }

    /// Run the dependency phase for Vue's full build, if it is installed.
    fn resolve_vue<T: Transform>(&self, plugin: &mut T) -> Result<Option<PathBuf>> {
        let full = self.config.src_dirname.join(VUE_FULL_BUILD);
        if !full.is_file() {
            return Ok(None);
        }

        let mut options = PipelineOptions::module(Phase::PostModule, &full, String::new(), true);
        plugin.transform(&mut options).into_diagnostic()?;
        if options.file != full {
            tracing::info!(to = %options.file.display(), "vue resolves to its runtime-only build");
        }
        Ok(Some(options.file))
    }

    /// Write a file from the source tree into the output directory.
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        let Some(target) = self.config.output_path(path) else {
            tracing::warn!(
                path = %path.display(),
                "outside the source directory, not written"
            );
            return Ok(());
        };

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(&target, content)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to write {}", target.display()))?;
        tracing::debug!(path = %target.display(), "wrote file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn args(dir: &Path) -> Args {
        Args {
            workspace: Some(dir.to_path_buf()),
            output: OutputFormat::Machine,
            ..Args::default()
        }
    }

    const CONFIG: &str = r#"{ "srcDirname": "src", "destDirname": "dist" }"#;

    #[test]
    fn test_run_writes_rewritten_modules_and_render_modules() {
        let dir = project(&[
            ("coolie.config.json", CONFIG),
            ("src/index.js", "var App = {};\n/* @coolievue */\nApp.template = require('./app.html');\n"),
            ("src/app.html", "<div>{{ msg }}</div>"),
            ("src/plain.js", "module.exports = 1;\n"),
            ("src/node_modules/vue/dist/vue.common.js", "module.exports = Vue;\n"),
            ("src/node_modules/vue/dist/vue.runtime.common.js", "module.exports = Vue;\n"),
        ]);

        let mut orchestrator = Orchestrator::new(dir.path().to_path_buf(), args(dir.path())).unwrap();
        let result = orchestrator.run().unwrap();

        assert_eq!(result.file_count, 2);
        assert_eq!(result.rewritten_count, 1);
        assert_eq!(result.virtual_file_count, 1);
        assert_eq!(result.error_count, 0);
        assert_eq!(
            result.runtime_build,
            Some(dir.path().join("src/node_modules/vue/dist/vue.runtime.common.js"))
        );

        let dist = dir.path().join("dist");
        let index = fs::read_to_string(dist.join("index.js")).unwrap();
        assert!(index.contains("App.render = require('./[coolie-mid-vue-virtual-file]-"), "{}", index);
        assert_eq!(fs::read_to_string(dist.join("plain.js")).unwrap(), "module.exports = 1;\n");

        let render_modules: Vec<_> = fs::read_dir(&dist)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| coolie_mid_vue::virtual_file::is_virtual_file(path))
            .collect();
        assert_eq!(render_modules.len(), 1);
        let render_module = fs::read_to_string(&render_modules[0]).unwrap();
        assert!(render_module.starts_with("module.exports = function render() {"), "{}", render_module);
        assert!(render_module.contains("_v(_s(msg))"), "{}", render_module);
    }

    #[test]
    fn test_dry_run_counts_diagnostics_without_writing() {
        let dir = project(&[
            ("coolie.config.json", CONFIG),
            ("src/a.js", "/* @coolievue */ A.template = require('./data.json');\n"),
            ("src/data.json", "{}"),
            ("src/broken.js", "var = ;"),
            ("src/vendor/lib.js", "var = ;"),
        ]);

        let mut args = args(dir.path());
        args.dry_run = true;
        args.ignore.push("vendor/**".into());
        let mut orchestrator = Orchestrator::new(dir.path().to_path_buf(), args).unwrap();
        let result = orchestrator.run().unwrap();

        assert_eq!(result.file_count, 2);
        assert_eq!(result.rewritten_count, 0);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.warning_count, 1);
        assert_eq!(result.runtime_build, None);
        assert!(!dir.path().join("dist").exists());
    }

    #[test]
    fn test_missing_template_aborts() {
        let dir = project(&[
            ("coolie.config.json", CONFIG),
            ("src/a.js", "/* @coolievue */ A.template = require('./missing.html');\n"),
        ]);

        let mut orchestrator = Orchestrator::new(dir.path().to_path_buf(), args(dir.path())).unwrap();
        let err = orchestrator.run().unwrap_err();
        assert!(format!("{:?}", err).contains("a.js"));
        assert!(!dir.path().join("dist/a.js").exists());
    }
}
