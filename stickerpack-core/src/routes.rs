//! Route Table - URI Shapes to Actions
//!
//! Three fixed templates plus one asset route per (pack, file) pair that an
//! accepted pack actually references. A table is built from one pack list and
//! never modified afterwards.

use std::collections::HashMap;

use crate::model::{AssetKind, StickerPack};

pub const METADATA: &str = "metadata";
pub const STICKERS: &str = "stickers";
pub const STICKERS_ASSET: &str = "stickers_asset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    /// Any single non-empty segment.
    Wildcard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Template {
    AllMetadata,
    PackMetadata,
    PackStickers,
}

const TEMPLATES: &[(&[Segment], Template)] = &[
    (&[Segment::Literal(METADATA)], Template::AllMetadata),
    (&[Segment::Literal(METADATA), Segment::Wildcard], Template::PackMetadata),
    (&[Segment::Literal(STICKERS), Segment::Wildcard], Template::PackStickers),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    AllMetadata,
    PackMetadata { identifier: String },
    PackStickers { identifier: String },
    Asset {
        identifier: String,
        filename: String,
        kind: AssetKind,
    },
    /// Asset-shaped path that no accepted pack references.
    UnknownAsset { identifier: String, filename: String },
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    assets: HashMap<(String, String), AssetKind>,
}

impl RouteTable {
    pub fn build(packs: &[StickerPack]) -> Self {
        let mut assets = HashMap::new();
        for pack in packs {
            for (file, kind) in pack.assets() {
                // A tray icon that doubles as a sticker is served as a tray icon.
                assets
                    .entry((pack.identifier.clone(), file.to_string()))
                    .or_insert(kind);
            }
        }
        Self { assets }
    }

    /// Total number of routes, fixed templates included.
    pub fn len(&self) -> usize {
        TEMPLATES.len() + self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn asset_route_count(&self) -> usize {
        self.assets.len()
    }

    pub fn resolve(&self, segments: &[&str]) -> Option<Route> {
        if let [STICKERS_ASSET, identifier, filename] = segments {
            if identifier.is_empty() || filename.is_empty() {
                return None;
            }
            let key = (identifier.to_string(), filename.to_string());
            return Some(match self.assets.get(&key) {
                Some(&kind) => Route::Asset {
                    identifier: key.0,
                    filename: key.1,
                    kind,
                },
                None => Route::UnknownAsset {
                    identifier: key.0,
                    filename: key.1,
                },
            });
        }

        let (_, template) = TEMPLATES.iter().find(|(pattern, _)| matches(pattern, segments))?;
        let last = || segments[segments.len() - 1].to_string();
        Some(match template {
            Template::AllMetadata => Route::AllMetadata,
            Template::PackMetadata => Route::PackMetadata { identifier: last() },
            Template::PackStickers => Route::PackStickers { identifier: last() },
        })
    }
}

fn matches(pattern: &[Segment], segments: &[&str]) -> bool {
    pattern.len() == segments.len()
        && pattern.iter().zip(segments).all(|(p, s)| match p {
            Segment::Literal(lit) => lit == s,
            Segment::Wildcard => !s.is_empty(),
        })
}
