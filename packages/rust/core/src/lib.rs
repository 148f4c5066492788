//! Core domain logic for the expert base builder.
//!
//! Ties the registry client, the employment resolver and the lookup resolver
//! into the `build` pipeline, and owns the expert base with its override
//! merge, page renderer and listing serializer.

pub mod base;
pub mod expert;
pub mod listing;
pub mod overrides;
pub mod pipeline;
pub mod render;
pub mod sources;

pub use base::ExpertBase;
pub use expert::Expert;
pub use listing::{ListingEntry, build_listing, write_listing};
pub use overrides::{MergeOutcome, MergeReport, OverrideTable};
pub use pipeline::{BuildConfig, BuildResult, ProgressReporter, SilentProgress, build_base};
pub use render::{RenderConfig, Renderer};
pub use sources::{SourceEntry, read_identifier_csv};
