//! Mapping flavours.
//!
//! A flavour names the identifier scheme the remapper applies. It is
//! orthogonal to graph construction but part of every remapped artifact
//! path, and it decides which versions a run can process at all.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::version::{SemverKey, VersionRecord};

/// First version with Fabric intermediary mappings (18w43b).
const FIRST_INTERMEDIARY_VERSION: &str = "1.14-alpha.18.43.b";

/// Last version covered by the Ornithe projects.
const LAST_ORNITHE_VERSION: [u64; 3] = [1, 14, 4];

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum MappingFlavour {
    /// Official mappings published alongside the release
    #[default]
    Mojmap,
    /// Fabric intermediary names
    Intermediary,
    /// Fabric Yarn names
    Yarn,
    /// Ornithe Feather names
    Feather,
    /// Ornithe Calamus intermediary names
    Calamus,
    /// Keep obfuscated names
    Identity,
}

impl MappingFlavour {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingFlavour::Mojmap => "mojmap",
            MappingFlavour::Intermediary => "intermediary",
            MappingFlavour::Yarn => "yarn",
            MappingFlavour::Feather => "feather",
            MappingFlavour::Calamus => "calamus",
            MappingFlavour::Identity => "identity",
        }
    }

    /// Whether mappings of this flavour exist for `version`.
    pub fn supports(&self, version: &VersionRecord) -> bool {
        match self {
            MappingFlavour::Mojmap => {
                let descriptor = version.descriptor();
                descriptor.client_mappings.is_some() || descriptor.server_mappings.is_some()
            }
            MappingFlavour::Intermediary | MappingFlavour::Yarn => {
                SemverKey::parse(FIRST_INTERMEDIARY_VERSION)
                    .is_ok_and(|first| version.semver() >= &first)
            }
            MappingFlavour::Feather | MappingFlavour::Calamus => {
                version.semver() <= &SemverKey::release(&LAST_ORNITHE_VERSION)
            }
            MappingFlavour::Identity => true,
        }
    }

    /// Whether the mappings are files published next to the game jars and
    /// fetched alongside them.
    pub fn ships_mapping_files(&self) -> bool {
        matches!(self, MappingFlavour::Mojmap)
    }

    /// First flavour in `self` followed by `fallbacks` that supports `version`.
    pub fn effective_for(
        &self,
        fallbacks: &[MappingFlavour],
        version: &VersionRecord,
    ) -> Option<MappingFlavour> {
        std::iter::once(self)
            .chain(fallbacks.iter())
            .find(|flavour| flavour.supports(version))
            .copied()
    }
}

impl fmt::Display for MappingFlavour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
