//! # External Tools
//!
//! Merging, remapping, patching, decompiling and data generation are done by
//! external programs. Each concern is a small trait so steps never care how
//! the work is done, and tests substitute recording fakes.
//!
//! ## Command templates
//!
//! A configured tool is an argv list (see `ToolSettings`). Before it runs,
//! the placeholders `{input}`, `{output}`, `{client}`, `{server}`, `{patch}`,
//! `{mappings}`, `{flavour}`, `{side}`, `{version}`, `{main_class}` and
//! `{jars}` are replaced in every argument. `{mappings}` is empty for
//! flavours without a fetched mapping file. A non-zero exit becomes
//! `Error::ToolFailed` carrying the tool's stderr.
//!
//! ## Fallbacks
//!
//! - The jar merger falls back to a built-in zip merge (union of entries,
//!   client first).
//! - The remapper falls back to a plain copy, for the `identity` flavour only.
//! - Everything else reports `Error::ToolNotConfigured`.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::config::ToolSettings;
use crate::error::{Error, Result};
use crate::mapping::MappingFlavour;
use crate::pipeline::{ArtifactKey, StepName};
use crate::resolver::VersionLookup;
use crate::version::VersionRecord;

/// Which half of the game a jar belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Server,
    Merged,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Client => "client",
            Side::Server => "server",
            Side::Merged => "merged",
        }
    }
}

/// Kinds of patch data applied after remapping, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Exceptions,
    Signatures,
    Nests,
}

impl PatchKind {
    pub const ALL: [PatchKind; 3] = [PatchKind::Exceptions, PatchKind::Signatures, PatchKind::Nests];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Exceptions => "exceptions",
            PatchKind::Signatures => "signatures",
            PatchKind::Nests => "nests",
        }
    }

    /// File extension of the patch data.
    pub fn extension(&self) -> &'static str {
        match self {
            PatchKind::Exceptions => "excs",
            PatchKind::Signatures => "sigs",
            PatchKind::Nests => "nest",
        }
    }

    pub fn step_name(&self) -> StepName {
        match self {
            PatchKind::Exceptions => StepName::ApplyExceptions,
            PatchKind::Signatures => StepName::ApplySignatures,
            PatchKind::Nests => StepName::ApplyNests,
        }
    }

    pub fn artifact(&self) -> ArtifactKey {
        match self {
            PatchKind::Exceptions => ArtifactKey::ExceptionsPatchedJar,
            PatchKind::Signatures => ArtifactKey::SignaturesPatchedJar,
            PatchKind::Nests => ArtifactKey::NestsPatchedJar,
        }
    }
}

pub trait JarMerger {
    fn merge(&self, client: &Path, server: &Path, output: &Path) -> Result<()>;
}

pub trait Remapper {
    /// `mappings` is the fetched mapping file, for flavours that publish one.
    fn remap(
        &self,
        version: &VersionRecord,
        side: Side,
        flavour: MappingFlavour,
        mappings: Option<&Path>,
        input: &Path,
        output: &Path,
    ) -> Result<()>;
}

pub trait Patcher {
    fn patch(
        &self,
        version: &VersionRecord,
        kind: PatchKind,
        input: &Path,
        patch: &Path,
        output: &Path,
    ) -> Result<()>;
}

pub trait Decompiler {
    fn decompile(&self, version: &VersionRecord, input: &Path, output: &Path) -> Result<()>;
}

pub trait DatagenRunner {
    fn run(&self, version: &VersionRecord, server_jar: &Path, output: &Path) -> Result<()>;
}

/// Source of patch files for a version.
pub trait PatchDataProvider {
    fn patch_for(
        &self,
        version: &VersionRecord,
        kind: PatchKind,
        flavour: MappingFlavour,
    ) -> Option<PathBuf>;
}

/// Patch files laid out as `{root}/{kind}/{name}.{ext}`.
pub struct DirectoryPatchData {
    root: Option<PathBuf>,
}

impl DirectoryPatchData {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }
}

impl PatchDataProvider for DirectoryPatchData {
    fn patch_for(
        &self,
        version: &VersionRecord,
        kind: PatchKind,
        _flavour: MappingFlavour,
    ) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        let path = root
            .join(kind.as_str())
            .join(format!("{}.{}", version.name(), kind.extension()));
        path.is_file().then_some(path)
    }
}

/// A configured external program.
#[derive(Debug, Clone)]
pub struct CommandTool {
    name: String,
    argv: Vec<String>,
}

impl CommandTool {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            name: name.into(),
            argv,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The argv with every `{key}` replaced by its value.
    pub fn expand(&self, substitutions: &[(&str, String)]) -> Vec<String> {
        self.argv
            .iter()
            .map(|arg| {
                substitutions
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| {
                        acc.replace(&format!("{{{key}}}"), value)
                    })
            })
            .collect()
    }

    /// Runs the tool and returns its stdout.
    pub fn invoke(&self, substitutions: &[(&str, String)]) -> Result<String> {
        let argv = self.expand(substitutions);
        let Some((program, args)) = argv.split_first() else {
            return Err(Error::ToolNotConfigured {
                tool: self.name.clone(),
                hint: Some(format!("tools.{} is an empty command", self.name)),
            });
        };
        log::debug!("Running {}: {}", self.name, argv.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::ToolFailed {
                tool: self.name.clone(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::ToolFailed {
                tool: self.name.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_into(&self, output: &Path, substitutions: &[(&str, String)]) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        self.invoke(substitutions)?;
        Ok(())
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

impl JarMerger for CommandTool {
    fn merge(&self, client: &Path, server: &Path, output: &Path) -> Result<()> {
        self.run_into(
            output,
            &[
                ("client", display(client)),
                ("server", display(server)),
                ("output", display(output)),
            ],
        )
    }
}

impl Remapper for CommandTool {
    fn remap(
        &self,
        version: &VersionRecord,
        side: Side,
        flavour: MappingFlavour,
        mappings: Option<&Path>,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        self.run_into(
            output,
            &[
                ("input", display(input)),
                ("output", display(output)),
                ("mappings", mappings.map(display).unwrap_or_default()),
                ("side", side.as_str().to_string()),
                ("flavour", flavour.to_string()),
                ("version", version.id().to_string()),
            ],
        )
    }
}

impl Patcher for CommandTool {
    fn patch(
        &self,
        version: &VersionRecord,
        kind: PatchKind,
        input: &Path,
        patch: &Path,
        output: &Path,
    ) -> Result<()> {
        self.run_into(
            output,
            &[
                ("input", display(input)),
                ("patch", display(patch)),
                ("output", display(output)),
                ("side", kind.as_str().to_string()),
                ("version", version.id().to_string()),
            ],
        )
    }
}

impl Decompiler for CommandTool {
    fn decompile(&self, version: &VersionRecord, input: &Path, output: &Path) -> Result<()> {
        self.run_into(
            output,
            &[
                ("input", display(input)),
                ("output", display(output)),
                ("version", version.id().to_string()),
            ],
        )
    }
}

impl DatagenRunner for CommandTool {
    fn run(&self, version: &VersionRecord, server_jar: &Path, output: &Path) -> Result<()> {
        self.run_into(
            output,
            &[
                ("input", display(server_jar)),
                ("server", display(server_jar)),
                ("output", display(output)),
                ("version", version.id().to_string()),
            ],
        )
    }
}

impl VersionLookup for CommandTool {
    fn lookup(
        &self,
        artifacts: &[PathBuf],
        main_class: Option<&str>,
        version_id: Option<&str>,
    ) -> Result<Option<String>> {
        let jars = std::env::join_paths(artifacts)
            .map(|joined| joined.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stdout = self.invoke(&[
            ("jars", jars),
            ("main_class", main_class.unwrap_or_default().to_string()),
            ("version", version_id.unwrap_or_default().to_string()),
        ])?;
        let answer = stdout.trim();
        Ok((!answer.is_empty()).then(|| answer.to_string()))
    }
}

/// Zip-level merge: every client entry, then server entries not already present.
pub struct BuiltinMerger;

impl JarMerger for BuiltinMerger {
    fn merge(&self, client: &Path, server: &Path, output: &Path) -> Result<()> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = ZipWriter::new(File::create(output)?);
        let options = FileOptions::default();
        let mut seen = HashSet::new();

        for input in [client, server] {
            let mut archive = ZipArchive::new(File::open(input)?)?;
            for index in 0..archive.len() {
                let mut entry = archive.by_index(index)?;
                let name = entry.name().to_string();
                if !seen.insert(name.clone()) {
                    continue;
                }
                if entry.is_dir() {
                    writer.add_directory(name, options)?;
                    continue;
                }
                let mut data = Vec::with_capacity(entry.size() as usize);
                entry.read_to_end(&mut data)?;
                writer.start_file(name, options)?;
                writer.write_all(&data)?;
            }
        }
        writer.finish()?;
        Ok(())
    }
}

/// Copies the input unchanged; only meaningful for the identity flavour.
pub struct CopyRemapper;

impl Remapper for CopyRemapper {
    fn remap(
        &self,
        version: &VersionRecord,
        _side: Side,
        flavour: MappingFlavour,
        _mappings: Option<&Path>,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        if flavour != MappingFlavour::Identity {
            return Err(Error::ToolNotConfigured {
                tool: "remapper".to_string(),
                hint: Some(format!(
                    "set tools.remapper to remap {} with {} mappings",
                    version.id(),
                    flavour
                )),
            });
        }
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(input, output)?;
        Ok(())
    }
}

/// Stand-in for a tool without a configured command.
pub struct Unconfigured {
    tool: &'static str,
}

impl Unconfigured {
    fn error(&self) -> Error {
        Error::ToolNotConfigured {
            tool: self.tool.to_string(),
            hint: Some(format!("set tools.{} in the configuration file", self.tool)),
        }
    }
}

impl Patcher for Unconfigured {
    fn patch(&self, _: &VersionRecord, _: PatchKind, _: &Path, _: &Path, _: &Path) -> Result<()> {
        Err(self.error())
    }
}

impl Decompiler for Unconfigured {
    fn decompile(&self, _: &VersionRecord, _: &Path, _: &Path) -> Result<()> {
        Err(self.error())
    }
}

impl DatagenRunner for Unconfigured {
    fn run(&self, _: &VersionRecord, _: &Path, _: &Path) -> Result<()> {
        Err(self.error())
    }
}

/// The tool set used by the standard steps.
pub struct Toolbox {
    pub merger: Box<dyn JarMerger>,
    pub remapper: Box<dyn Remapper>,
    pub patcher: Box<dyn Patcher>,
    pub decompiler: Box<dyn Decompiler>,
    pub datagen: Box<dyn DatagenRunner>,
}

impl Toolbox {
    /// Command tools where configured, fallbacks elsewhere.
    pub fn from_settings(settings: &ToolSettings) -> Self {
        let command = |name: &str, argv: &Option<Vec<String>>| {
            argv.clone().map(|argv| CommandTool::new(name, argv))
        };
        Self {
            merger: match command("merger", &settings.merger) {
                Some(tool) => Box::new(tool),
                None => Box::new(BuiltinMerger),
            },
            remapper: match command("remapper", &settings.remapper) {
                Some(tool) => Box::new(tool),
                None => Box::new(CopyRemapper),
            },
            patcher: match command("patcher", &settings.patcher) {
                Some(tool) => Box::new(tool),
                None => Box::new(Unconfigured { tool: "patcher" }),
            },
            decompiler: match command("decompiler", &settings.decompiler) {
                Some(tool) => Box::new(tool),
                None => Box::new(Unconfigured { tool: "decompiler" }),
            },
            datagen: match command("datagen", &settings.datagen) {
                Some(tool) => Box::new(tool),
                None => Box::new(Unconfigured { tool: "datagen" }),
            },
        }
    }
}

/// The configured version lookup, if any.
pub fn lookup_from_settings(settings: &ToolSettings) -> Option<CommandTool> {
    settings
        .lookup
        .clone()
        .map(|argv| CommandTool::new("lookup", argv))
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records every call and writes a small valid zip to the output.
    #[derive(Default, Clone)]
    pub struct RecordingTool {
        pub calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingTool {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String, output: &Path) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            write_zip(output, &[("marker.txt", "generated")])
        }
    }

    /// Writes a zip archive holding `entries`.
    pub fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut writer = ZipWriter::new(File::create(path)?);
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default())?;
            writer.write_all(content.as_bytes())?;
        }
        writer.finish()?;
        Ok(())
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    impl JarMerger for RecordingTool {
        fn merge(&self, client: &Path, server: &Path, output: &Path) -> Result<()> {
            self.record(
                format!("merge {} {}", file_name(client), file_name(server)),
                output,
            )
        }
    }

    impl Remapper for RecordingTool {
        fn remap(
            &self,
            version: &VersionRecord,
            side: Side,
            flavour: MappingFlavour,
            mappings: Option<&Path>,
            input: &Path,
            output: &Path,
        ) -> Result<()> {
            let mut call = format!(
                "remap {} {} {} {}",
                version.id(),
                side.as_str(),
                flavour,
                file_name(input)
            );
            if let Some(mappings) = mappings {
                call.push_str(&format!(" with {}", file_name(mappings)));
            }
            self.record(call, output)
        }
    }

    impl Patcher for RecordingTool {
        fn patch(
            &self,
            version: &VersionRecord,
            kind: PatchKind,
            input: &Path,
            _patch: &Path,
            output: &Path,
        ) -> Result<()> {
            self.record(
                format!("patch {} {} {}", version.id(), kind.as_str(), file_name(input)),
                output,
            )
        }
    }

    impl Decompiler for RecordingTool {
        fn decompile(&self, version: &VersionRecord, input: &Path, output: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("decompile {} {}", version.id(), file_name(input)));
            write_zip(
                output,
                &[("net/minecraft/Main.java", "class Main {}")],
            )
        }
    }

    impl DatagenRunner for RecordingTool {
        fn run(&self, version: &VersionRecord, server_jar: &Path, output: &Path) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("datagen {} {}", version.id(), file_name(server_jar)));
            write_zip(output, &[("reports/blocks.json", "{\"b\":1,\"a\":2}")])
        }
    }

    impl Toolbox {
        /// Every tool backed by the same recorder.
        pub fn recording(tool: &RecordingTool) -> Self {
            Self {
                merger: Box::new(tool.clone()),
                remapper: Box::new(tool.clone()),
                patcher: Box::new(tool.clone()),
                decompiler: Box::new(tool.clone()),
                datagen: Box::new(tool.clone()),
            }
        }
    }
}
