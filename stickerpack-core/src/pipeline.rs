//! Load Pipeline - Single Entry Point
//!
//! CRITICAL: every pack handed to the router went through `validate_pack`.
//! There is no other way to obtain an accepted pack list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::hashing::manifest_digest;
use crate::model::StickerPack;
use crate::parser::{parse_manifest, ManifestError};
use crate::store::{AssetStore, StoreError};
use crate::validation::{Validator, Violation};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static VALIDATION_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_validation_call_count() -> u32 {
    VALIDATION_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_validation_call_count() {
    VALIDATION_CALL_COUNT.store(0, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Manifest source error: {0}")]
    Source(#[from] StoreError),

    #[error("Sticker pack {identifier} rejected: {violation}")]
    Rejected {
        identifier: String,
        #[source]
        violation: Violation,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A pack that failed the integrity gate.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedPack {
    pub identifier: String,
    pub rule: String,
    pub message: String,
}

impl RejectedPack {
    fn new(identifier: &str, violation: &Violation) -> Self {
        Self {
            identifier: identifier.to_string(),
            rule: violation.rule.to_string(),
            message: violation.error.to_string(),
        }
    }
}

/// Result of one manifest load, before it is published.
#[derive(Debug, Clone)]
pub struct LoadedPacks {
    pub manifest_digest: String,
    pub accepted: Vec<StickerPack>,
    pub rejected: Vec<RejectedPack>,
}

/// What a reload published.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub snapshot_id: Uuid,
    pub loaded_at: DateTime<Utc>,
    pub manifest_digest: Option<String>,
    pub fingerprint: String,
    pub accepted: Vec<String>,
    pub rejected: Vec<RejectedPack>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// The load pipeline - parse, then gate every pack through the validator
pub struct PackPipeline {
    validator: Validator,
    strict: bool,
}

impl PackPipeline {
    pub fn new(validator: Validator) -> Self {
        Self {
            validator,
            strict: false,
        }
    }

    /// In strict mode one rejected pack fails the whole load.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Validate one pack against the live asset store.
    ///
    /// This is the ONLY validation entry point.
    pub fn validate_pack(&self, pack: &StickerPack, assets: &dyn AssetStore) -> Result<(), Violation> {
        #[cfg(feature = "test-hooks")]
        VALIDATION_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        self.validator.validate(pack, assets)
    }

    /// Parse a manifest and validate each of its packs.
    pub fn load(&self, manifest: &[u8], assets: &dyn AssetStore) -> Result<LoadedPacks, PipelineError> {
        let digest = manifest_digest(manifest);
        let parsed = parse_manifest(manifest)?;

        let mut accepted = Vec::with_capacity(parsed.packs.len());
        let mut rejected = Vec::new();

        for pack in parsed.into_packs() {
            match self.validate_pack(&pack, assets) {
                Ok(()) => accepted.push(pack),
                Err(violation) if self.strict => {
                    return Err(PipelineError::Rejected {
                        identifier: pack.identifier,
                        violation,
                    });
                }
                Err(violation) => {
                    warn!(
                        pack = %pack.identifier,
                        rule = violation.rule,
                        error = %violation.error,
                        "Sticker pack rejected"
                    );
                    rejected.push(RejectedPack::new(&pack.identifier, &violation));
                }
            }
        }

        info!(
            accepted = accepted.len(),
            rejected = rejected.len(),
            digest = %digest,
            "Manifest loaded"
        );

        Ok(LoadedPacks {
            manifest_digest: digest,
            accepted,
            rejected,
        })
    }
}

impl Default for PackPipeline {
    fn default() -> Self {
        Self::new(Validator::new())
    }
}
