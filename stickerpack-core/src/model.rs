//! Manifest Model - Sticker Packs and Their Assets
//!
//! Built once per manifest parse, immutable once a pack has been accepted.

use serde::Serialize;

/// Upper bound, in characters, for identifier, name, publisher and tray filename.
pub const MAX_TEXT_CHARS: usize = 128;

/// Every sticker image must carry this extension.
pub const STICKER_EXTENSION: &str = ".webp";

pub const MIN_STICKERS: usize = 3;
pub const MAX_STICKERS: usize = 30;
pub const MAX_EMOJIS: usize = 3;

pub const STICKER_MIME: &str = "image/webp";
pub const TRAY_ICON_MIME: &str = "image/png";

pub type PackId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sticker {
    pub image_file_name: String,
    pub emojis: Vec<String>,
}

impl Sticker {
    pub fn new(image_file_name: impl Into<String>, emojis: Vec<String>) -> Self {
        Self {
            image_file_name: image_file_name.into(),
            emojis,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StickerPack {
    pub identifier: PackId,
    pub name: String,
    pub publisher: String,
    pub tray_image_file: String,
    pub publisher_email: Option<String>,
    pub publisher_website: Option<String>,
    pub privacy_policy_website: Option<String>,
    pub license_agreement_website: Option<String>,
    /// Copied from the document level, identical for every pack of a manifest.
    pub android_play_store_link: Option<String>,
    /// Copied from the document level, identical for every pack of a manifest.
    pub ios_app_store_link: Option<String>,
    pub stickers: Vec<Sticker>,
}

impl StickerPack {
    /// Classify `filename` as one of this pack's assets.
    ///
    /// Returns `None` when the pack does not reference the file at all.
    pub fn asset_kind(&self, filename: &str) -> Option<AssetKind> {
        if self.tray_image_file == filename {
            Some(AssetKind::TrayIcon)
        } else if self.stickers.iter().any(|s| s.image_file_name == filename) {
            Some(AssetKind::Sticker)
        } else {
            None
        }
    }

    /// Tray icon first, then stickers in display order.
    pub fn assets(&self) -> impl Iterator<Item = (&str, AssetKind)> {
        std::iter::once((self.tray_image_file.as_str(), AssetKind::TrayIcon)).chain(
            self.stickers
                .iter()
                .map(|s| (s.image_file_name.as_str(), AssetKind::Sticker)),
        )
    }
}

/// A parsed manifest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub android_play_store_link: Option<String>,
    pub ios_app_store_link: Option<String>,
    #[serde(rename = "stickerPacks")]
    pub packs: Vec<StickerPack>,
}

impl Manifest {
    pub fn pack(&self, identifier: &str) -> Option<&StickerPack> {
        self.packs.iter().find(|p| p.identifier == identifier)
    }

    pub fn into_packs(self) -> Vec<StickerPack> {
        self.packs
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    TrayIcon,
    Sticker,
}

impl AssetKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            AssetKind::TrayIcon => TRAY_ICON_MIME,
            AssetKind::Sticker => STICKER_MIME,
        }
    }
}

/// True when `value` names an entry inside a pack directory rather than the
/// directory itself or a way out of it.
pub fn is_traversal_free(value: &str) -> bool {
    value != "." && !value.contains("..") && !value.contains('/')
}
