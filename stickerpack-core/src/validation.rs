//! Integrity Validator - Ordered, Fail-Fast Rule Gate
//!
//! Rules run in a fixed order and the first violation stops the check, so a
//! given pack always reports the same error. The validator only reads: it
//! never mutates the pack and touches storage only to fetch asset bytes.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::imaging::{DecodingProbe, ImageInfo, ImageProbe, ProbeError};
use crate::model::{StickerPack, MAX_EMOJIS, MAX_STICKERS, MAX_TEXT_CHARS, MIN_STICKERS};
use crate::store::{AssetStore, StoreError};

/// Size unit for the asset limits below.
///
/// This is 8 × 1024, not 1024. The value decides which files are accepted,
/// so it stays as shipped even though it looks like a bits/bytes mix-up.
pub const KIBIBYTE: usize = 8 * 1024;
pub const STICKER_FILE_SIZE_LIMIT_KB: usize = 100;
pub const TRAY_IMAGE_FILE_SIZE_MAX_KB: usize = 50;

pub const STICKER_DIMENSION: u32 = 512;
pub const TRAY_IMAGE_DIMENSION_MIN: u32 = 24;
pub const TRAY_IMAGE_DIMENSION_MAX: u32 = 512;

pub const PLAY_STORE_DOMAIN: &str = "play.google.com";
pub const APPLE_STORE_DOMAIN: &str = "itunes.apple.com";

static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-.' ]+$").expect("identifier pattern compiles"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9+._%\-]{1,256}@[a-zA-Z0-9][a-zA-Z0-9\-]{0,64}(\.[a-zA-Z0-9][a-zA-Z0-9\-]{0,25})+$",
    )
    .expect("email pattern compiles")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkProblem {
    /// Not an absolute URL.
    Malformed,
    /// Absolute, but neither http nor https.
    Scheme,
    /// Store link pointing somewhere other than its store.
    Domain(&'static str),
}

impl fmt::Display for LinkProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkProblem::Malformed => f.write_str("is not a valid URL"),
            LinkProblem::Scheme => f.write_str("must use http or https"),
            LinkProblem::Domain(domain) => write!(f, "must use the {} domain", domain),
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} {reason}, sticker pack identifier: {identifier}")]
    Field {
        identifier: String,
        field: &'static str,
        reason: String,
    },

    #[error("{field} link {problem}: {url}, sticker pack identifier: {identifier}")]
    Link {
        identifier: String,
        field: &'static str,
        url: String,
        problem: LinkProblem,
    },

    #[error("{reason}, sticker pack identifier: {identifier}, file: {file}")]
    BinaryFormat {
        identifier: String,
        file: String,
        reason: String,
    },

    #[error("{reason}, sticker pack identifier: {identifier}")]
    Count {
        identifier: String,
        file: Option<String>,
        reason: String,
    },

    #[error("cannot open asset, sticker pack identifier: {identifier}, file: {file}")]
    AssetNotFound { identifier: String, file: String },

    #[error("cannot read asset, sticker pack identifier: {identifier}, file: {file}: {source}")]
    AssetUnreadable {
        identifier: String,
        file: String,
        source: StoreError,
    },
}

impl ValidationError {
    pub fn identifier(&self) -> &str {
        match self {
            ValidationError::Field { identifier, .. }
            | ValidationError::Link { identifier, .. }
            | ValidationError::BinaryFormat { identifier, .. }
            | ValidationError::Count { identifier, .. }
            | ValidationError::AssetNotFound { identifier, .. }
            | ValidationError::AssetUnreadable { identifier, .. } => identifier,
        }
    }

    /// The asset file the error is about, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            ValidationError::BinaryFormat { file, .. }
            | ValidationError::AssetNotFound { file, .. }
            | ValidationError::AssetUnreadable { file, .. } => Some(file),
            ValidationError::Count { file, .. } => file.as_deref(),
            ValidationError::Field { .. } | ValidationError::Link { .. } => None,
        }
    }
}

/// The first rule a pack failed, and why.
#[derive(Debug, Error)]
#[error("rule `{rule}` failed: {error}")]
pub struct Violation {
    pub rule: &'static str,
    #[source]
    pub error: ValidationError,
}

/// Everything a rule may look at.
pub struct RuleContext<'a> {
    pub pack: &'a StickerPack,
    pub assets: &'a dyn AssetStore,
    pub probe: &'a dyn ImageProbe,
}

impl RuleContext<'_> {
    fn identifier(&self) -> String {
        self.pack.identifier.clone()
    }

    fn fetch(&self, file: &str) -> Result<Vec<u8>, ValidationError> {
        self.assets
            .fetch_asset_bytes(&self.pack.identifier, file)
            .map_err(|source| match source {
                StoreError::NotFound { .. } => ValidationError::AssetNotFound {
                    identifier: self.identifier(),
                    file: file.to_string(),
                },
                source => ValidationError::AssetUnreadable {
                    identifier: self.identifier(),
                    file: file.to_string(),
                    source,
                },
            })
    }

    fn binary(&self, file: &str, reason: String) -> ValidationError {
        ValidationError::BinaryFormat {
            identifier: self.identifier(),
            file: file.to_string(),
            reason,
        }
    }

    fn field(&self, field: &'static str, reason: impl Into<String>) -> ValidationError {
        ValidationError::Field {
            identifier: self.identifier(),
            field,
            reason: reason.into(),
        }
    }
}

/// One step of the gate.
pub trait PackRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError>;
}

// --- Concrete Rules ---

pub struct TextFieldsRule;

impl TextFieldsRule {
    fn check_text(ctx: &RuleContext<'_>, field: &'static str, value: &str) -> Result<(), ValidationError> {
        if value.is_empty() {
            return Err(ctx.field(field, "is empty"));
        }
        if value.chars().count() > MAX_TEXT_CHARS {
            return Err(ctx.field(field, format!("cannot exceed {} characters", MAX_TEXT_CHARS)));
        }
        Ok(())
    }
}

impl PackRule for TextFieldsRule {
    fn name(&self) -> &'static str { "text_fields" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        let pack = ctx.pack;

        Self::check_text(ctx, "identifier", &pack.identifier)?;
        if !IDENTIFIER_PATTERN.is_match(&pack.identifier) {
            return Err(ctx.field(
                "identifier",
                "contains invalid characters, allowed characters are a to z, A to Z, 0 to 9, _, ', -, . and space",
            ));
        }
        if pack.identifier.contains("..") {
            return Err(ctx.field("identifier", "cannot contain .."));
        }

        Self::check_text(ctx, "publisher", &pack.publisher)?;
        Self::check_text(ctx, "name", &pack.name)
    }
}

pub struct TrayFileRule;

impl PackRule for TrayFileRule {
    fn name(&self) -> &'static str { "tray_file" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        if ctx.pack.tray_image_file.is_empty() {
            return Err(ctx.field("tray image file", "is empty"));
        }
        Ok(())
    }
}

pub struct LinksRule;

impl LinksRule {
    fn check_link(
        ctx: &RuleContext<'_>,
        field: &'static str,
        value: Option<&str>,
        domain: Option<&'static str>,
    ) -> Result<(), ValidationError> {
        let Some(raw) = value.filter(|v| !v.is_empty()) else {
            return Ok(());
        };
        let fail = |problem| ValidationError::Link {
            identifier: ctx.identifier(),
            field,
            url: raw.to_string(),
            problem,
        };

        let url = Url::parse(raw).map_err(|_| fail(LinkProblem::Malformed))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(fail(LinkProblem::Scheme));
        }
        if let Some(domain) = domain {
            if url.host_str() != Some(domain) {
                return Err(fail(LinkProblem::Domain(domain)));
            }
        }
        Ok(())
    }
}

impl PackRule for LinksRule {
    fn name(&self) -> &'static str { "links" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        let pack = ctx.pack;
        Self::check_link(
            ctx,
            "android play store",
            pack.android_play_store_link.as_deref(),
            Some(PLAY_STORE_DOMAIN),
        )?;
        Self::check_link(
            ctx,
            "ios app store",
            pack.ios_app_store_link.as_deref(),
            Some(APPLE_STORE_DOMAIN),
        )?;
        Self::check_link(ctx, "license agreement", pack.license_agreement_website.as_deref(), None)?;
        Self::check_link(ctx, "privacy policy", pack.privacy_policy_website.as_deref(), None)?;
        Self::check_link(ctx, "publisher website", pack.publisher_website.as_deref(), None)
    }
}

pub struct EmailRule;

impl PackRule for EmailRule {
    fn name(&self) -> &'static str { "publisher_email" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        match ctx.pack.publisher_email.as_deref() {
            Some(email) if !email.is_empty() && !EMAIL_PATTERN.is_match(email) => Err(ctx.field(
                "publisher email",
                format!("does not seem valid: {}", email),
            )),
            _ => Ok(()),
        }
    }
}

pub struct TrayImageRule;

impl PackRule for TrayImageRule {
    fn name(&self) -> &'static str { "tray_image" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        let file = ctx.pack.tray_image_file.as_str();
        let bytes = ctx.fetch(file)?;

        let limit = TRAY_IMAGE_FILE_SIZE_MAX_KB * KIBIBYTE;
        if bytes.len() > limit {
            return Err(ctx.binary(
                file,
                format!(
                    "tray image must be less than {} KB ({} bytes), actual size is {} bytes",
                    TRAY_IMAGE_FILE_SIZE_MAX_KB,
                    limit,
                    bytes.len()
                ),
            ));
        }

        let info = ctx
            .probe
            .probe_image(&bytes)
            .map_err(|e| ctx.binary(file, format!("tray image cannot be decoded: {}", e)))?;

        let range = TRAY_IMAGE_DIMENSION_MIN..=TRAY_IMAGE_DIMENSION_MAX;
        if !range.contains(&info.height) {
            return Err(ctx.binary(
                file,
                format!(
                    "tray image height should be between {} and {} pixels, current tray image height is {}",
                    TRAY_IMAGE_DIMENSION_MIN, TRAY_IMAGE_DIMENSION_MAX, info.height
                ),
            ));
        }
        if !range.contains(&info.width) {
            return Err(ctx.binary(
                file,
                format!(
                    "tray image width should be between {} and {} pixels, current tray image width is {}",
                    TRAY_IMAGE_DIMENSION_MIN, TRAY_IMAGE_DIMENSION_MAX, info.width
                ),
            ));
        }
        Ok(())
    }
}

pub struct StickerCountRule;

impl PackRule for StickerCountRule {
    fn name(&self) -> &'static str { "sticker_count" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        let count = ctx.pack.stickers.len();
        if !(MIN_STICKERS..=MAX_STICKERS).contains(&count) {
            return Err(ValidationError::Count {
                identifier: ctx.identifier(),
                file: None,
                reason: format!(
                    "sticker count should be between {} and {} inclusive, it currently has {}",
                    MIN_STICKERS, MAX_STICKERS, count
                ),
            });
        }
        Ok(())
    }
}

pub struct StickersRule;

impl StickersRule {
    fn check_image(ctx: &RuleContext<'_>, file: &str) -> Result<(), ValidationError> {
        let bytes = ctx.fetch(file)?;

        let limit = STICKER_FILE_SIZE_LIMIT_KB * KIBIBYTE;
        if bytes.len() > limit {
            return Err(ctx.binary(
                file,
                format!(
                    "sticker should be less than {} KB ({} bytes), actual size is {} bytes",
                    STICKER_FILE_SIZE_LIMIT_KB,
                    limit,
                    bytes.len()
                ),
            ));
        }

        let info: ImageInfo = ctx.probe.probe_webp(&bytes).map_err(|e| match e {
            ProbeError::NotWebp => ctx.binary(file, "sticker is not a WebP image".to_string()),
            other => ctx.binary(file, format!("error parsing WebP image: {}", other)),
        })?;

        if info.height != STICKER_DIMENSION {
            return Err(ctx.binary(
                file,
                format!("sticker height should be {}, actual height is {}", STICKER_DIMENSION, info.height),
            ));
        }
        if info.width != STICKER_DIMENSION {
            return Err(ctx.binary(
                file,
                format!("sticker width should be {}, actual width is {}", STICKER_DIMENSION, info.width),
            ));
        }
        if info.frames > 1 {
            return Err(ctx.binary(
                file,
                format!(
                    "sticker should be a static image, animated stickers are not supported ({} frames)",
                    info.frames
                ),
            ));
        }
        Ok(())
    }
}

impl PackRule for StickersRule {
    fn name(&self) -> &'static str { "stickers" }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<(), ValidationError> {
        for sticker in &ctx.pack.stickers {
            if sticker.emojis.len() > MAX_EMOJIS {
                return Err(ValidationError::Count {
                    identifier: ctx.identifier(),
                    file: Some(sticker.image_file_name.clone()),
                    reason: format!(
                        "emoji count exceeds limit of {} for file {}",
                        MAX_EMOJIS, sticker.image_file_name
                    ),
                });
            }
            if sticker.image_file_name.is_empty() {
                return Err(ctx.field("sticker image file", "is empty"));
            }
            Self::check_image(ctx, &sticker.image_file_name)?;
        }
        Ok(())
    }
}

/// Validator runs the rules in order and stops at the first violation.
pub struct Validator {
    rules: Vec<Box<dyn PackRule>>,
    probe: Box<dyn ImageProbe>,
}

impl Validator {
    pub fn new() -> Self {
        Self::with_probe(DecodingProbe)
    }

    pub fn with_probe(probe: impl ImageProbe + 'static) -> Self {
        Self {
            rules: vec![
                Box::new(TextFieldsRule),
                Box::new(TrayFileRule),
                Box::new(LinksRule),
                Box::new(EmailRule),
                Box::new(TrayImageRule),
                Box::new(StickerCountRule),
                Box::new(StickersRule),
            ],
            probe: Box::new(probe),
        }
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn validate(&self, pack: &StickerPack, assets: &dyn AssetStore) -> Result<(), Violation> {
        let ctx = RuleContext {
            pack,
            assets,
            probe: self.probe.as_ref(),
        };

        for rule in &self.rules {
            debug!(pack = %pack.identifier, rule = rule.name(), "Checking rule");
            rule.check(&ctx).map_err(|error| Violation {
                rule: rule.name(),
                error,
            })?;
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sticker;
    use crate::store::MemoryStore;

    /// Reports whatever it was built with, regardless of the bytes.
    struct FixedProbe {
        tray: ImageInfo,
        sticker: ImageInfo,
    }

    impl ImageProbe for FixedProbe {
        fn probe_image(&self, _bytes: &[u8]) -> Result<ImageInfo, ProbeError> {
            Ok(self.tray)
        }
        fn probe_webp(&self, _bytes: &[u8]) -> Result<ImageInfo, ProbeError> {
            Ok(self.sticker)
        }
    }

    fn probe() -> FixedProbe {
        FixedProbe {
            tray: ImageInfo { width: 96, height: 96, frames: 1 },
            sticker: ImageInfo { width: 512, height: 512, frames: 1 },
        }
    }

    fn pack() -> StickerPack {
        StickerPack {
            identifier: "cats".into(),
            name: "Cats".into(),
            publisher: "Jane".into(),
            tray_image_file: "tray.png".into(),
            publisher_email: None,
            publisher_website: None,
            privacy_policy_website: None,
            license_agreement_website: None,
            android_play_store_link: None,
            ios_app_store_link: None,
            stickers: (1..=3)
                .map(|i| Sticker::new(format!("{:02}.webp", i), vec!["🐱".into()]))
                .collect(),
        }
    }

    fn store_for(pack: &StickerPack) -> MemoryStore {
        let store = MemoryStore::new();
        for (file, _) in pack.assets() {
            store.put_asset(&pack.identifier, file, vec![0u8; 16]);
        }
        store
    }

    fn run(pack: &StickerPack) -> Result<(), Violation> {
        Validator::with_probe(probe()).validate(pack, &store_for(pack))
    }

    #[test]
    fn test_rule_order_is_fixed() {
        assert_eq!(
            Validator::new().rule_names(),
            vec![
                "text_fields",
                "tray_file",
                "links",
                "publisher_email",
                "tray_image",
                "sticker_count",
                "stickers"
            ]
        );
    }

    #[test]
    fn test_valid_pack_passes() {
        run(&pack()).unwrap();
    }

    #[test]
    fn test_text_length_limit() {
        let mut p = pack();
        p.name = "n".repeat(MAX_TEXT_CHARS);
        run(&p).unwrap();

        p.name = "n".repeat(MAX_TEXT_CHARS + 1);
        let v = run(&p).unwrap_err();
        assert_eq!(v.rule, "text_fields");
        assert!(v.to_string().contains("name cannot exceed 128 characters"));
    }

    #[test]
    fn test_length_counts_characters() {
        let mut p = pack();
        p.publisher = "é".repeat(MAX_TEXT_CHARS);
        run(&p).unwrap();
    }

    #[test]
    fn test_identifier_character_class() {
        for ok in ["cats", "my pack", "it's_a-pack.v2"] {
            let mut p = pack();
            p.identifier = ok.into();
            run(&p).unwrap_or_else(|v| panic!("{ok}: {v}"));
        }
        for bad in ["cats,dogs", "cat\tpack", "ñandú", "a..b"] {
            let mut p = pack();
            p.identifier = bad.into();
            let v = run(&p).unwrap_err();
            assert_eq!(v.rule, "text_fields", "{bad}");
            assert!(matches!(v.error, ValidationError::Field { field: "identifier", .. }));
        }
    }

    #[test]
    fn test_empty_publisher_checked_before_name() {
        let mut p = pack();
        p.publisher.clear();
        p.name.clear();
        let v = run(&p).unwrap_err();
        assert!(matches!(v.error, ValidationError::Field { field: "publisher", .. }));
    }

    #[test]
    fn test_empty_tray_file() {
        let mut p = pack();
        p.tray_image_file.clear();
        assert_eq!(run(&p).unwrap_err().rule, "tray_file");
    }

    fn set_link(p: &mut StickerPack, field: &str, value: &str) {
        let slot = match field {
            "android" => &mut p.android_play_store_link,
            "ios" => &mut p.ios_app_store_link,
            "license" => &mut p.license_agreement_website,
            "privacy" => &mut p.privacy_policy_website,
            "website" => &mut p.publisher_website,
            other => panic!("unknown link field {other}"),
        };
        *slot = Some(value.to_string());
    }

    #[test]
    fn test_links() {
        let cases = [
            ("android", "play.google.com/store", LinkProblem::Malformed),
            ("android", "ftp://play.google.com/x", LinkProblem::Scheme),
            ("android", "https://evil.example/x", LinkProblem::Domain(PLAY_STORE_DOMAIN)),
            ("ios", "https://apps.apple.com/app/x", LinkProblem::Domain(APPLE_STORE_DOMAIN)),
            ("license", "not a url", LinkProblem::Malformed),
            ("privacy", "mailto:a@b.com", LinkProblem::Scheme),
            ("website", "javascript:alert(1)", LinkProblem::Scheme),
        ];
        for (field, url, expected) in cases {
            let mut p = pack();
            set_link(&mut p, field, url);
            let v = run(&p).unwrap_err();
            assert_eq!(v.rule, "links", "{url}");
            match v.error {
                ValidationError::Link { problem, url: reported, .. } => {
                    assert_eq!(problem, expected, "{url}");
                    assert_eq!(reported, url);
                }
                other => panic!("{url}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_store_links_checked_before_other_links() {
        let mut p = pack();
        set_link(&mut p, "website", "not a url");
        set_link(&mut p, "ios", "https://example.com/app");
        match run(&p).unwrap_err().error {
            ValidationError::Link { field, .. } => assert_eq!(field, "ios app store"),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn test_valid_links_pass() {
        let mut p = pack();
        p.android_play_store_link = Some("https://play.google.com/store/apps/details?id=a.b".into());
        p.ios_app_store_link = Some("http://itunes.apple.com/app/id1".into());
        p.license_agreement_website = Some("https://example.com/license".into());
        p.privacy_policy_website = Some(String::new());
        p.publisher_website = Some("http://example.org".into());
        run(&p).unwrap();
    }

    #[test]
    fn test_email() {
        let mut p = pack();
        p.publisher_email = Some("jane.doe+stickers@example.co.uk".into());
        run(&p).unwrap();

        for bad in ["jane", "jane@", "jane@example", "@example.com", "jane doe@example.com"] {
            p.publisher_email = Some(bad.into());
            assert_eq!(run(&p).unwrap_err().rule, "publisher_email", "{bad}");
        }
    }

    #[test]
    fn test_missing_tray_asset() {
        let p = pack();
        let store = store_for(&p);
        store.remove_asset("cats", "tray.png");
        let v = Validator::with_probe(probe()).validate(&p, &store).unwrap_err();
        assert_eq!(v.rule, "tray_image");
        assert!(matches!(v.error, ValidationError::AssetNotFound { .. }));
        assert_eq!(v.error.file(), Some("tray.png"));
        assert_eq!(v.error.identifier(), "cats");
    }

    #[test]
    fn test_size_limits_use_eight_kib_unit() {
        assert_eq!(TRAY_IMAGE_FILE_SIZE_MAX_KB * KIBIBYTE, 409_600);
        assert_eq!(STICKER_FILE_SIZE_LIMIT_KB * KIBIBYTE, 819_200);

        let p = pack();
        let store = store_for(&p);
        store.put_asset("cats", "tray.png", vec![0u8; 409_600]);
        store.put_asset("cats", "02.webp", vec![0u8; 819_200]);
        Validator::with_probe(probe()).validate(&p, &store).unwrap();

        store.put_asset("cats", "02.webp", vec![0u8; 819_201]);
        let v = Validator::with_probe(probe()).validate(&p, &store).unwrap_err();
        assert_eq!(v.rule, "stickers");
        assert_eq!(v.error.file(), Some("02.webp"));

        store.put_asset("cats", "tray.png", vec![0u8; 409_601]);
        let v = Validator::with_probe(probe()).validate(&p, &store).unwrap_err();
        assert_eq!(v.rule, "tray_image");
    }

    #[test]
    fn test_tray_dimension_bounds() {
        for (w, h, ok) in [(24, 24, true), (512, 512, true), (23, 100, false), (100, 513, false)] {
            let mut probe = probe();
            probe.tray = ImageInfo { width: w, height: h, frames: 1 };
            let p = pack();
            let result = Validator::with_probe(probe).validate(&p, &store_for(&p));
            assert_eq!(result.is_ok(), ok, "{w}x{h}");
        }
    }

    #[test]
    fn test_sticker_count_bounds() {
        for (count, ok) in [(2, false), (3, true), (30, true), (31, false)] {
            let mut p = pack();
            p.stickers = (0..count).map(|i| Sticker::new(format!("{i}.webp"), vec![])).collect();
            let result = run(&p);
            assert_eq!(result.is_ok(), ok, "{count}");
            if let Err(v) = result {
                assert_eq!(v.rule, "sticker_count");
            }
        }
    }

    #[test]
    fn test_emoji_limit() {
        let mut p = pack();
        p.stickers[1].emojis = vec!["a".into(), "b".into(), "c".into()];
        run(&p).unwrap();
        p.stickers[1].emojis.push("d".into());
        let v = run(&p).unwrap_err();
        assert!(matches!(v.error, ValidationError::Count { .. }));
        assert_eq!(v.error.file(), Some("02.webp"));
    }

    #[test]
    fn test_sticker_dimensions_and_frames() {
        let cases = [
            (ImageInfo { width: 512, height: 511, frames: 1 }, "height"),
            (ImageInfo { width: 256, height: 512, frames: 1 }, "width"),
            (ImageInfo { width: 512, height: 512, frames: 4 }, "animated"),
        ];
        for (info, needle) in cases {
            let mut probe = probe();
            probe.sticker = info;
            let p = pack();
            let v = Validator::with_probe(probe).validate(&p, &store_for(&p)).unwrap_err();
            assert_eq!(v.rule, "stickers");
            assert!(matches!(v.error, ValidationError::BinaryFormat { .. }));
            assert!(v.to_string().contains(needle), "{v}");
            assert_eq!(v.error.file(), Some("01.webp"));
        }
    }
}
