//! StickerPack Core - Manifest, Integrity Gate and Asset Router
//!
//! # Guarantees
//! 1. The manifest is the only source of pack truth
//! 2. No pack is served before it passed every integrity rule
//! 3. Only files a pack references are reachable by URI
//! 4. Readers always see one complete snapshot
//! 5. The router never mutates packs for a consumer

pub mod config;
pub mod hashing;
pub mod imaging;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod router;
pub mod routes;
pub mod store;
pub mod validation;

pub use config::{RefreshPolicy, RouterConfig};
pub use hashing::{canonical_json, manifest_digest, pack_fingerprint, sha256_hex};
pub use imaging::{DecodingProbe, ImageInfo, ImageProbe};
pub use model::{AssetKind, Manifest, Sticker, StickerPack};
pub use parser::{parse_manifest, parse_pack, ManifestError};
pub use pipeline::{LoadReport, PackPipeline, PipelineError, RejectedPack};
pub use router::{content_uri, AssetRouter, AssetStream, RouterError, RowSet, Snapshot};
pub use routes::{Route, RouteTable};
pub use store::{AssetStore, DirStore, ManifestSource, MemoryStore, StoreError};
pub use validation::{PackRule, ValidationError, Validator, Violation};

pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");
