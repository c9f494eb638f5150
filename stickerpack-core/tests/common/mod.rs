//! Shared fixtures: real encoded images and manifest documents.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbaImage};
use serde_json::{json, Value};

use stickerpack_core::{MemoryStore, RouterConfig};

pub const PLAY_LINK: &str = "https://play.google.com/store/apps/details?id=com.example.stickers";
pub const APPLE_LINK: &str = "https://itunes.apple.com/app/id0000000";
pub const AUTHORITY: &str = "com.example.stickers";

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::new(width, height))
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

pub fn sticker_image() -> Vec<u8> {
    encode(512, 512, ImageFormat::WebP)
}

pub fn tray_image() -> Vec<u8> {
    encode(96, 96, ImageFormat::Png)
}

pub fn sticker_name(i: usize) -> String {
    format!("{:02}.webp", i)
}

pub fn pack_json(identifier: &str, stickers: usize) -> Value {
    let stickers: Vec<Value> = (1..=stickers)
        .map(|i| json!({ "imageFileName": sticker_name(i), "emojis": ["😀", "🎉"] }))
        .collect();
    json!({
        "identifier": identifier,
        "name": format!("Pack {identifier}"),
        "publisher": "Jane Doe",
        "trayImageFile": "tray.png",
        "publisherEmail": "jane@example.com",
        "publisherWebsite": "https://example.com",
        "stickers": stickers
    })
}

pub fn manifest(packs: Vec<Value>) -> Vec<u8> {
    json!({
        "androidPlayStoreLink": PLAY_LINK,
        "iosAppStoreLink": APPLE_LINK,
        "stickerPacks": packs
    })
    .to_string()
    .into_bytes()
}

/// Write a tray icon and `stickers` WebP files for a pack.
pub fn install_assets(store: &MemoryStore, identifier: &str, stickers: usize) {
    store.put_asset(identifier, "tray.png", tray_image());
    let sticker = sticker_image();
    for i in 1..=stickers {
        store.put_asset(identifier, &sticker_name(i), sticker.clone());
    }
}

/// A store holding a manifest with one valid three-sticker pack per identifier.
pub fn store_with(identifiers: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for id in identifiers {
        install_assets(&store, id, 3);
    }
    store.set_manifest(manifest(identifiers.iter().map(|id| pack_json(id, 3)).collect()));
    store
}

pub fn config() -> RouterConfig {
    RouterConfig::default().with_authority(AUTHORITY)
}

pub fn uri(path: &str) -> String {
    format!("content://{AUTHORITY}/{path}")
}

fn riff_chunk(fourcc: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut chunk = Vec::with_capacity(payload.len() + 9);
    chunk.extend_from_slice(fourcc);
    chunk.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    chunk.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        chunk.push(0);
    }
    chunk
}

fn u24(value: u32) -> [u8; 3] {
    let b = value.to_le_bytes();
    [b[0], b[1], b[2]]
}

/// An extended-format WebP whose animation holds `frames` copies of one
/// lossless 512x512 frame.
pub fn animated_sticker_image(frames: usize) -> Vec<u8> {
    let still = sticker_image();
    let at = still
        .windows(4)
        .position(|w| w == b"VP8L")
        .expect("lossless encoder writes a VP8L chunk");
    let len = u32::from_le_bytes([still[at + 4], still[at + 5], still[at + 6], still[at + 7]]) as usize;
    let vp8l = riff_chunk(b"VP8L", &still[at + 8..at + 8 + len]);

    let mut vp8x = vec![0x02 | 0x10, 0, 0, 0];
    vp8x.extend_from_slice(&u24(511));
    vp8x.extend_from_slice(&u24(511));

    let mut body = b"WEBP".to_vec();
    body.extend(riff_chunk(b"VP8X", &vp8x));
    body.extend(riff_chunk(b"ANIM", &[0, 0, 0, 0, 0, 0]));
    for _ in 0..frames {
        let mut anmf = Vec::new();
        anmf.extend_from_slice(&u24(0));
        anmf.extend_from_slice(&u24(0));
        anmf.extend_from_slice(&u24(511));
        anmf.extend_from_slice(&u24(511));
        anmf.extend_from_slice(&u24(100));
        anmf.push(0);
        anmf.extend_from_slice(&vp8l);
        body.extend(riff_chunk(b"ANMF", &anmf));
    }

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend(body);
    out
}
