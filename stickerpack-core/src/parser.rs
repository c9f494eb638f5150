//! Manifest Parser - Streaming JSON to Manifest Model
//!
//! Tokens are pulled straight from the reader by serde visitors; there is no
//! intermediate `serde_json::Value`. The document envelope is strict (unknown
//! keys are rejected) while pack and sticker objects skip keys they do not know.
//!
//! Only schema-shape checks happen here. Length limits, links and binary
//! checks belong to the integrity validator.

use std::collections::HashSet;
use std::fmt;
use std::io::Read;

use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, Visitor};
use thiserror::Error;
use tracing::debug;

use crate::model::{is_traversal_free, Manifest, Sticker, StickerPack, STICKER_EXTENSION};

const MANIFEST_FIELDS: &[&str] = &["androidPlayStoreLink", "iosAppStoreLink", "stickerPacks"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Invalid manifest (line {line}, column {column}): {message}")]
    Schema {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ManifestError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            return ManifestError::Io(err.into());
        }
        let (line, column) = (err.line(), err.column());
        let rendered = err.to_string();
        let suffix = format!(" at line {} column {}", line, column);
        let message = rendered.strip_suffix(&suffix).unwrap_or(&rendered).to_string();
        ManifestError::Schema { message, line, column }
    }
}

/// Parse a manifest document from a byte stream.
///
/// All-or-nothing: the first schema violation aborts the parse.
pub fn parse_manifest<R: Read>(reader: R) -> Result<Manifest, ManifestError> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let ManifestDocument(manifest) = ManifestDocument::deserialize(&mut de)?;
    de.end()?;

    debug!(packs = manifest.packs.len(), "Parsed sticker pack manifest");
    Ok(manifest)
}

/// Parse one pack object, as written by the pack editor when it adds a pack.
///
/// Store links live at document level and stay unset here.
pub fn parse_pack<R: Read>(reader: R) -> Result<StickerPack, ManifestError> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let PackEntry(pack) = PackEntry::deserialize(&mut de)?;
    de.end()?;
    Ok(pack)
}

struct ManifestDocument(Manifest);

impl<'de> Deserialize<'de> for ManifestDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ManifestVisitor).map(ManifestDocument)
    }
}

struct ManifestVisitor;

impl<'de> Visitor<'de> for ManifestVisitor {
    type Value = Manifest;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sticker pack manifest object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Manifest, A::Error> {
        let mut android: Option<Option<String>> = None;
        let mut ios: Option<Option<String>> = None;
        let mut packs: Option<Vec<StickerPack>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "androidPlayStoreLink" => {
                    if android.is_some() {
                        return Err(de::Error::duplicate_field("androidPlayStoreLink"));
                    }
                    android = Some(map.next_value()?);
                }
                "iosAppStoreLink" => {
                    if ios.is_some() {
                        return Err(de::Error::duplicate_field("iosAppStoreLink"));
                    }
                    ios = Some(map.next_value()?);
                }
                "stickerPacks" => {
                    if packs.is_some() {
                        return Err(de::Error::duplicate_field("stickerPacks"));
                    }
                    let entries: Vec<PackEntry> = map.next_value()?;
                    packs = Some(entries.into_iter().map(|e| e.0).collect());
                }
                other => return Err(de::Error::unknown_field(other, MANIFEST_FIELDS)),
            }
        }

        let mut packs = packs.unwrap_or_default();
        if packs.is_empty() {
            return Err(de::Error::custom("manifest contains no sticker packs"));
        }

        let mut seen = HashSet::new();
        for pack in &packs {
            if !seen.insert(pack.identifier.as_str()) {
                return Err(de::Error::custom(format!(
                    "duplicate sticker pack identifier: {}",
                    pack.identifier
                )));
            }
        }

        let android = android.flatten();
        let ios = ios.flatten();
        for pack in &mut packs {
            pack.android_play_store_link = android.clone();
            pack.ios_app_store_link = ios.clone();
        }

        Ok(Manifest {
            android_play_store_link: android,
            ios_app_store_link: ios,
            packs,
        })
    }
}

struct PackEntry(StickerPack);

impl<'de> Deserialize<'de> for PackEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PackVisitor).map(PackEntry)
    }
}

struct PackVisitor;

impl<'de> Visitor<'de> for PackVisitor {
    type Value = StickerPack;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sticker pack object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<StickerPack, A::Error> {
        let mut identifier: Option<String> = None;
        let mut name: Option<String> = None;
        let mut publisher: Option<String> = None;
        let mut tray_image_file: Option<String> = None;
        let mut publisher_email = None;
        let mut publisher_website = None;
        let mut privacy_policy_website = None;
        let mut license_agreement_website = None;
        let mut stickers: Option<Vec<StickerEntry>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "identifier" => identifier = Some(map.next_value()?),
                "name" => name = Some(map.next_value()?),
                "publisher" => publisher = Some(map.next_value()?),
                "trayImageFile" => tray_image_file = Some(map.next_value()?),
                "publisherEmail" => publisher_email = map.next_value()?,
                "publisherWebsite" => publisher_website = map.next_value()?,
                "privacyPolicyWebsite" => privacy_policy_website = map.next_value()?,
                "licenseAgreementWebsite" => license_agreement_website = map.next_value()?,
                "stickers" => stickers = Some(map.next_value()?),
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        let identifier = require::<A::Error>(identifier, "sticker pack identifier is empty")?;
        let name = require::<A::Error>(name, &format!("name is empty, pack identifier: {}", identifier))?;
        let publisher = require::<A::Error>(
            publisher,
            &format!("publisher is empty, pack identifier: {}", identifier),
        )?;
        let tray_image_file = require::<A::Error>(
            tray_image_file,
            &format!("tray image file is empty, pack identifier: {}", identifier),
        )?;
        let stickers = match stickers {
            Some(list) if !list.is_empty() => list,
            _ => {
                return Err(de::Error::custom(format!(
                    "sticker list is empty, pack identifier: {}",
                    identifier
                )))
            }
        };
        if !is_traversal_free(&identifier) {
            return Err(de::Error::custom(format!(
                "identifier must not contain .. or / (directory traversal): {}",
                identifier
            )));
        }
        if !is_traversal_free(&tray_image_file) {
            return Err(de::Error::custom(format!(
                "tray image file must not contain .. or / (directory traversal): {}",
                tray_image_file
            )));
        }

        Ok(StickerPack {
            identifier,
            name,
            publisher,
            tray_image_file,
            publisher_email,
            publisher_website,
            privacy_policy_website,
            license_agreement_website,
            android_play_store_link: None,
            ios_app_store_link: None,
            stickers: stickers.into_iter().map(|e| e.0).collect(),
        })
    }
}

struct StickerEntry(Sticker);

impl<'de> Deserialize<'de> for StickerEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StickerVisitor).map(StickerEntry)
    }
}

struct StickerVisitor;

impl<'de> Visitor<'de> for StickerVisitor {
    type Value = Sticker;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sticker object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Sticker, A::Error> {
        let mut image_file_name: Option<String> = None;
        let mut emojis: Option<Vec<String>> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "imageFileName" => image_file_name = Some(map.next_value()?),
                "emojis" => emojis = map.next_value()?,
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }

        let image_file_name = require::<A::Error>(image_file_name, "sticker image file is empty")?;
        if !image_file_name.ends_with(STICKER_EXTENSION) {
            return Err(de::Error::custom(format!(
                "sticker image file must be a {} file: {}",
                STICKER_EXTENSION, image_file_name
            )));
        }
        if !is_traversal_free(&image_file_name) {
            return Err(de::Error::custom(format!(
                "sticker file name must not contain .. or / (directory traversal): {}",
                image_file_name
            )));
        }

        Ok(Sticker {
            image_file_name,
            emojis: emojis.unwrap_or_default(),
        })
    }
}

fn require<E: de::Error>(value: Option<String>, message: &str) -> Result<String, E> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| E::custom(message))
}
