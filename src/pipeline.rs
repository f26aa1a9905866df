// src/pipeline.rs

//! The build pipeline: fetch, verify, unpack, patch, build, stage
//!
//! One descriptor in, one staged output directory out. Control flow is
//! strictly linear; any failure aborts the remainder immediately and the
//! output directory is only ever promoted whole.

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::hash::ContentHash;
use crate::metadata::{self, MetadataRecord};
use crate::recipe::{BuildSection, Descriptor};
use crate::{patch, stage, unpack};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Configuration for the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory for the content-addressed fetch cache
    pub cache_dir: PathBuf,
    /// Keep the working tree after completion (for debugging)
    pub keep_workdir: bool,
    /// Show download progress bars
    pub show_progress: bool,
    /// Host platform used for metadata test gating; `None` means detect
    pub host_platform: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("/var/cache/prefab/sources"),
            keep_workdir: false,
            show_progress: false,
            host_platform: None,
        }
    }
}

impl PipelineConfig {
    fn platform(&self) -> &str {
        self.host_platform
            .as_deref()
            .unwrap_or(std::env::consts::OS)
    }
}

/// Result of a pipeline run
#[derive(Debug)]
pub struct RunReport {
    /// The promoted output directory
    pub output_dir: PathBuf,
    /// Metadata record written next to the output
    pub metadata: MetadataRecord,
    /// Accumulated stage-by-stage log
    pub log: String,
}

/// The pipeline: builds descriptors into output directories
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    /// Run the full pipeline for one descriptor
    pub fn run(&self, descriptor: &Descriptor, output_dir: &Path) -> Result<RunReport> {
        info!(
            "Building {} version {}",
            descriptor.package.name, descriptor.package.version
        );

        let mut job = Job::new(self, descriptor)?;

        job.fetch()?;
        job.unpack()?;
        job.patch()?;
        job.build()?;
        job.stage(output_dir)?;

        let record = metadata::register(descriptor, self.config.platform());
        let record_path = metadata_path(output_dir);
        metadata::write_record(&record, &record_path)?;
        job.log_line(&format!("Wrote metadata record: {}", record_path.display()));

        info!(
            "Built {}: {}",
            descriptor.package.name,
            output_dir.display()
        );

        job.finish(output_dir.to_path_buf(), record)
    }
}

/// Sibling path for the metadata record (`<output>.meta.json`)
pub fn metadata_path(output_dir: &Path) -> PathBuf {
    // Collecting components drops trailing separators, so file_name is
    // defined for paths like "out/meet-web/"
    let normalized: PathBuf = output_dir.components().collect();
    let name = normalized
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package".to_string());
    normalized.with_file_name(format!("{name}.meta.json"))
}

/// A single pipeline run over one working tree
struct Job<'a> {
    pipeline: &'a Pipeline,
    descriptor: &'a Descriptor,
    fetcher: Fetcher,
    /// Owns the scratch space; dropped (deleted) when the job ends
    workdir: Option<TempDir>,
    /// Root for unpacked sources inside the workdir
    tree: PathBuf,
    /// Fetched artifact paths: main source, then extras in order
    artifacts: Vec<PathBuf>,
    log: String,
}

impl<'a> Job<'a> {
    fn new(pipeline: &'a Pipeline, descriptor: &'a Descriptor) -> Result<Self> {
        let fetcher = Fetcher::new(&pipeline.config.cache_dir)?;
        let workdir = TempDir::new()?;
        let tree = workdir.path().join("tree");
        fs::create_dir_all(&tree)?;

        Ok(Self {
            pipeline,
            descriptor,
            fetcher,
            workdir: Some(workdir),
            tree,
            artifacts: Vec::new(),
            log: String::new(),
        })
    }

    /// Fetch and verify every declared source
    ///
    /// Runs before anything touches the working tree: a hash mismatch on any
    /// source means no unpack/patch/build/stage work happens at all.
    fn fetch(&mut self) -> Result<()> {
        let source = &self.descriptor.source;

        let main = self.fetch_one(&source.locator, &source.checksum)?;
        self.artifacts.push(main);

        for extra in &source.extra {
            let path = self.fetch_one(&extra.locator, &extra.checksum)?;
            self.artifacts.push(path);
        }

        Ok(())
    }

    fn fetch_one(
        &mut self,
        locator: &crate::recipe::SourceLocator,
        checksum: &str,
    ) -> Result<PathBuf> {
        let expected = ContentHash::parse(checksum)?;

        // Descriptor URLs may carry %(version)s-style variables
        let locator = match locator {
            crate::recipe::SourceLocator::Url { url } => crate::recipe::SourceLocator::Url {
                url: self.descriptor.substitute(url),
            },
            other => other.clone(),
        };

        let progress = if self.pipeline.config.show_progress {
            Some(download_bar(&self.descriptor.package.name))
        } else {
            None
        };

        let path = self.fetcher.fetch(&locator, &expected, progress.as_ref())?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        self.log_line(&format!("Fetched source ({expected})"));
        Ok(path)
    }

    /// Unpack the main artifact into the tree, extras into their subdirs
    fn unpack(&mut self) -> Result<()> {
        let main = self.artifacts[0].clone();
        if let Some(control) = unpack::unpack(&main, &self.tree)? {
            self.log_line(&format!(
                "Unpacked deb {} {}",
                control.package.as_deref().unwrap_or("<unnamed>"),
                control.version.as_deref().unwrap_or("<unversioned>")
            ));
        } else {
            self.log_line("Unpacked source archive");
            // Tarballs usually carry a single top-level directory; descend
            // into it so descriptor paths stay short. Deb payloads keep their
            // usr/... layout as-is.
            self.tree = descend_single_dir(&self.tree)?;
        }
        debug!("Working tree root: {}", self.tree.display());

        for (extra, artifact) in self
            .descriptor
            .source
            .extra
            .iter()
            .zip(self.artifacts[1..].to_vec())
        {
            let dest = self.tree.join(&extra.unpack_to);
            unpack::unpack(&artifact, &dest)?;
            self.log_line(&format!("Unpacked extra source into {}", extra.unpack_to));
        }

        Ok(())
    }

    fn patch(&mut self) -> Result<()> {
        patch::apply_all(&self.tree, &self.descriptor.patch)?;
        if !self.descriptor.patch.is_empty() {
            self.log_line(&format!(
                "Applied {} patch directive(s)",
                self.descriptor.patch.len()
            ));
        }
        Ok(())
    }

    /// Run the upstream build command, if the descriptor declares one
    fn build(&mut self) -> Result<()> {
        let Some(build) = self.descriptor.build.clone() else {
            return Ok(());
        };

        let workdir = match &build.workdir {
            Some(wd) => self.tree.join(wd),
            None => self.tree.clone(),
        };

        let command = self.descriptor.substitute(&build.command);
        self.run_build_command(&build, &command, &workdir)
    }

    fn run_build_command(
        &mut self,
        build: &BuildSection,
        command: &str,
        workdir: &Path,
    ) -> Result<()> {
        info!("Running build command");
        debug!("Command: {}", command);

        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(workdir)
            .envs(&build.environment)
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        self.log_line("=== build ===");
        if !stdout.is_empty() {
            self.log.push_str(&stdout);
            self.log.push('\n');
        }
        if !stderr.is_empty() {
            self.log.push_str(&stderr);
            self.log.push('\n');
        }

        if !output.status.success() {
            // Surfaced verbatim: build failures are not interpreted or retried
            return Err(Error::Build {
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.into_owned(),
            });
        }

        Ok(())
    }

    fn stage(&mut self, output_dir: &Path) -> Result<()> {
        stage::stage_all(&self.tree, &self.descriptor.stage, output_dir)?;
        self.log_line(&format!(
            "Staged {} path(s) into {}",
            self.descriptor.stage.len(),
            output_dir.display()
        ));
        Ok(())
    }

    fn finish(mut self, output_dir: PathBuf, record: MetadataRecord) -> Result<RunReport> {
        if self.pipeline.config.keep_workdir {
            if let Some(workdir) = self.workdir.take() {
                let kept = workdir.into_path();
                info!("Keeping working tree at {}", kept.display());
            }
        }

        Ok(RunReport {
            output_dir,
            metadata: record,
            log: self.log,
        })
    }

    fn log_line(&mut self, line: &str) {
        self.log.push_str(line);
        self.log.push('\n');
    }
}

/// If `root` holds exactly one directory and nothing else, return it
fn descend_single_dir(root: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(root)?.filter_map(|e| e.ok()).collect();

    if entries.len() == 1 && entries[0].file_type().map(|t| t.is_dir()).unwrap_or(false) {
        return Ok(entries[0].path());
    }
    Ok(root.to_path_buf())
}

/// Styled progress bar for one download
fn download_bar(name: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .expect("Invalid progress bar template")
            .progress_chars("#>-"),
    );
    pb.set_message(name.to_string());
    pb
}
