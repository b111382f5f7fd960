//! The Pack Assembler capability.
//!
//! The build orchestrator only ever talks to an assembler through
//! [`PackAssembler`]. It hands over a fully resolved [`AssemblyInput`]
//! (validated module directories, overlay files inside the tree, output
//! directive) and receives the finished archive bytes.

use async_trait::async_trait;
use packsmith_types::{BuildType, Platform};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::AssemblyResult;

/// Directory holding the base pack inside a source tree. Always included.
pub const BASE_PACK_DIR: &str = "meme_resourcepack";

/// Key mapping applied by legacy builds (current key → legacy key).
pub type KeyMapping = BTreeMap<String, String>;

/// How the language file is serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageFormat {
    /// A flat JSON object.
    Json,
    /// `key=value` lines.
    Lang,
}

impl LanguageFormat {
    /// Infers the format from a file name.
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".lang") {
            LanguageFormat::Lang
        } else {
            LanguageFormat::Json
        }
    }
}

/// Output-type directive: where the merged language file lands and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirective {
    pub build_type: BuildType,
    /// Path, inside every layer, of the language file that gets merged.
    pub source_language: &'static str,
    /// Path of the language file inside the output archive.
    pub target_language: &'static str,
    pub format: LanguageFormat,
    /// Present for legacy builds only.
    pub mapping: Option<KeyMapping>,
    /// Rewrites `pack.mcmeta`'s `pack.pack_format` when set.
    pub pack_format: Option<u32>,
}

impl OutputDirective {
    /// Language file locations for a platform and build type.
    ///
    /// Returns `None` for combinations the platform does not produce
    /// (legacy on bedrock).
    pub fn language_paths(
        platform: Platform,
        build_type: BuildType,
    ) -> Option<(&'static str, &'static str)> {
        match (platform, build_type) {
            (Platform::Java, BuildType::Normal) => Some((JAVA_LANG, JAVA_LANG)),
            (Platform::Java, BuildType::Compatible) => Some((JAVA_LANG, JAVA_COMPAT_LANG)),
            (Platform::Java, BuildType::Legacy) => Some((JAVA_LANG, JAVA_LEGACY_LANG)),
            (Platform::Bedrock, BuildType::Normal) => Some((BEDROCK_LANG, BEDROCK_LANG)),
            (Platform::Bedrock, BuildType::Compatible) => Some((BEDROCK_LANG, BEDROCK_COMPAT_LANG)),
            (Platform::Bedrock, BuildType::Legacy) => None,
        }
    }

    /// Builds the directive for a platform and build type.
    ///
    /// `mapping` is only kept for legacy builds.
    pub fn new(
        platform: Platform,
        build_type: BuildType,
        mapping: Option<KeyMapping>,
        pack_format: Option<u32>,
    ) -> Option<Self> {
        let (source_language, target_language) = Self::language_paths(platform, build_type)?;
        let mapping = match build_type {
            BuildType::Legacy => Some(mapping.unwrap_or_default()),
            _ => None,
        };
        Some(Self {
            build_type,
            source_language,
            target_language,
            format: LanguageFormat::from_path(target_language),
            mapping,
            pack_format,
        })
    }
}

const JAVA_LANG: &str = "assets/minecraft/lang/zh_meme.json";
const JAVA_COMPAT_LANG: &str = "assets/minecraft/lang/zh_cn.json";
const JAVA_LEGACY_LANG: &str = "assets/minecraft/lang/zh_cn.lang";
const BEDROCK_LANG: &str = "texts/zh_ME.lang";
const BEDROCK_COMPAT_LANG: &str = "texts/zh_CN.lang";

/// A resource module resolved to its directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    pub name: String,
    pub dir: PathBuf,
}

/// Everything an assembler needs for one build. Paths are absolute and have
/// already been checked to lie inside the source tree.
#[derive(Debug, Clone)]
pub struct AssemblyInput {
    pub platform: Platform,
    /// Base pack directory; layered first.
    pub base: PathBuf,
    /// Resource modules in layering order. Collections are already expanded.
    pub modules: Vec<ResolvedModule>,
    /// Overlay language files, merged after every module.
    pub overlays: Vec<PathBuf>,
    pub directive: OutputDirective,
}

/// Output of an assembler run.
#[derive(Debug, Clone)]
pub struct Assembled {
    pub bytes: Vec<u8>,
    /// Assembler-side log lines, appended to the build log in order.
    pub log: Vec<String>,
}

/// Turns a resolved selection into archive bytes.
///
/// Implementations must be deterministic: equal inputs yield equal bytes.
/// Artifact names depend on it.
#[async_trait]
pub trait PackAssembler: Send + Sync {
    async fn assemble(&self, input: AssemblyInput) -> AssemblyResult<Assembled>;
}
