//! Source trees and module metadata for packsmith.
//!
//! # Components
//!
//! - **SourceTree**: one checkout, guarded by a readers-writer lock shared by
//!   builds (readers) and syncs (the writer)
//! - **Aggregation**: every module descriptor and overlay file in a tree,
//!   re-read on each call
//! - **Mappings**: merge and persist the legacy key mapping files
//!
//! # Tree layout
//!
//! ```text
//! <root>/
//!   meme_resourcepack/          base pack
//!   modules/<id>/module_manifest.json
//!   mods/  en-mods/             overlay files
//!   mappings/*.json             legacy mappings
//!   mappings/all_mappings       merged mapping
//! ```

mod aggregate;
mod error;
mod mapping;
mod tree;

pub use aggregate::{aggregate, Aggregation, OverlayListing, EN_MODS_DIR, MODS_DIR};
pub use error::{ModulesError, ModulesResult};
pub use mapping::{
    has_mappings, load_mapping, merge_mappings, MAPPINGS_DIR, MERGED_MAPPING_FILE,
};
pub use tree::{SourceTree, MODULES_DIR};
