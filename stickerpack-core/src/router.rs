//! Asset Router - Read-Only Query Surface
//!
//! The only part of the crate an untrusted consumer talks to. Each request is
//! answered from one published `Snapshot` (accepted packs plus the route table
//! built from them). Reloads build a complete new snapshot outside the lock
//! and swap it in, so readers never see a half-built table.
//!
//! Column names, route shapes and MIME types are a cross-process contract.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{RefreshPolicy, RouterConfig};
use crate::hashing::{manifest_digest, pack_fingerprint};
use crate::model::{AssetKind, StickerPack};
use crate::parser::parse_pack;
use crate::pipeline::{LoadReport, PackPipeline, PipelineError, RejectedPack};
use crate::routes::{Route, RouteTable, METADATA, STICKERS};
use crate::store::{AssetStore, ManifestSource, StoreError};
use crate::validation::{Validator, Violation};

pub const CONTENT_SCHEME: &str = "content";

pub const METADATA_COLUMNS: [&str; 10] = [
    "sticker_pack_identifier",
    "sticker_pack_name",
    "sticker_pack_publisher",
    "sticker_pack_icon",
    "android_play_store_link",
    "ios_app_download_link",
    "sticker_pack_publisher_email",
    "sticker_pack_publisher_website",
    "sticker_pack_privacy_policy_website",
    "sticker_pack_license_agreement_website",
];

pub const STICKER_COLUMNS: [&str; 2] = ["sticker_file_name", "sticker_emoji"];

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Unknown URI: {0}")]
    RouteNotFound(String),

    #[error("Asset not found: {identifier}/{filename}")]
    AssetNotFound { identifier: String, filename: String },

    #[error("Operation not supported: {0}")]
    UnsupportedOperation(&'static str),

    #[error("Sticker pack already registered: {0}")]
    DuplicatePack(String),

    #[error("Sticker pack {identifier} rejected: {violation}")]
    Rejected {
        identifier: String,
        #[source]
        violation: Violation,
    },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Asset store error: {0}")]
    Store(#[from] StoreError),

    #[error("Manifest {digest} could not be loaded: {message}")]
    ManifestRejected { digest: String, message: String },
}

/// Tabular query result: fixed columns, one row per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSet {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RowSet {
    fn new(columns: &[&'static str]) -> Self {
        Self {
            columns: columns.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell value by row index and column name. `None` for null cells too.
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| *c == column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }
}

/// An open asset. Reading it yields the file's bytes.
pub struct AssetStream {
    pub identifier: String,
    pub filename: String,
    pub kind: AssetKind,
    reader: Box<dyn Read + Send>,
}

impl AssetStream {
    pub fn mime_type(&self) -> &'static str {
        self.kind.mime_type()
    }

    pub fn into_reader(self) -> Box<dyn Read + Send> {
        self.reader
    }
}

impl Read for AssetStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for AssetStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetStream")
            .field("identifier", &self.identifier)
            .field("filename", &self.filename)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Accepted packs and the route table derived from them.
#[derive(Debug)]
pub struct Snapshot {
    pub id: Uuid,
    pub loaded_at: DateTime<Utc>,
    /// Digest of the manifest bytes this snapshot was built from.
    pub manifest_digest: Option<String>,
    pub fingerprint: String,
    packs: Vec<StickerPack>,
    routes: RouteTable,
}

impl Snapshot {
    fn build(packs: Vec<StickerPack>, manifest_digest: Option<String>) -> Result<Self, PipelineError> {
        let fingerprint = pack_fingerprint(&packs)?;
        let routes = RouteTable::build(&packs);
        Ok(Self {
            id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            manifest_digest,
            fingerprint,
            packs,
            routes,
        })
    }

    fn empty() -> Self {
        Self {
            id: Uuid::new_v4(),
            loaded_at: Utc::now(),
            manifest_digest: None,
            fingerprint: String::new(),
            packs: Vec::new(),
            routes: RouteTable::default(),
        }
    }

    pub fn packs(&self) -> &[StickerPack] {
        &self.packs
    }

    pub fn pack(&self, identifier: &str) -> Option<&StickerPack> {
        self.packs.iter().find(|p| p.identifier == identifier)
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    fn report(&self, rejected: Vec<RejectedPack>) -> LoadReport {
        LoadReport {
            snapshot_id: self.id,
            loaded_at: self.loaded_at,
            manifest_digest: self.manifest_digest.clone(),
            fingerprint: self.fingerprint.clone(),
            accepted: self.packs.iter().map(|p| p.identifier.clone()).collect(),
            rejected,
        }
    }
}

/// Build a `content://` URI with each segment percent-encoded.
pub fn content_uri(authority: &str, segments: &[&str]) -> String {
    let path: Vec<String> = segments
        .iter()
        .map(|s| utf8_percent_encode(s, NON_ALPHANUMERIC).to_string())
        .collect();
    format!("{}://{}/{}", CONTENT_SCHEME, authority, path.join("/"))
}

/// A manifest version that failed to load, kept so it is not retried per query.
#[derive(Debug, Clone)]
struct FailedManifest {
    digest: String,
    message: String,
}

pub struct AssetRouter<S> {
    config: RouterConfig,
    store: S,
    pipeline: PackPipeline,
    current: RwLock<Arc<Snapshot>>,
    reload_lock: Mutex<()>,
    last_failure: Mutex<Option<FailedManifest>>,
}

impl<S: AssetStore + ManifestSource> AssetRouter<S> {
    /// Create a router with an empty snapshot. Call `reload` (or query with
    /// `RefreshPolicy::EveryQuery`) to load the manifest.
    pub fn new(config: RouterConfig, store: S) -> Self {
        Self::with_validator(config, store, Validator::new())
    }

    pub fn with_validator(config: RouterConfig, store: S, validator: Validator) -> Self {
        let pipeline = PackPipeline::new(validator).strict(config.strict);
        Self {
            config,
            store,
            pipeline,
            current: RwLock::new(Arc::new(Snapshot::empty())),
            reload_lock: Mutex::new(()),
            last_failure: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read())
    }

    /// Re-read the manifest, validate every pack and publish a fresh snapshot.
    ///
    /// Always retries, even a manifest that failed before. On error the
    /// previously published snapshot stays in place.
    pub fn reload(&self) -> Result<LoadReport, RouterError> {
        let _guard = self.reload_lock.lock();
        let bytes = self.store.read_manifest()?;
        let (_, report) = self.rebuild(&bytes)?;
        Ok(report)
    }

    /// Caller must hold `reload_lock`.
    fn rebuild(&self, manifest: &[u8]) -> Result<(Arc<Snapshot>, LoadReport), RouterError> {
        match self.build_snapshot(manifest) {
            Ok((snapshot, report)) => {
                *self.last_failure.lock() = None;
                Ok((self.publish(snapshot), report))
            }
            Err(e) => {
                let failure = FailedManifest {
                    digest: manifest_digest(manifest),
                    message: e.to_string(),
                };
                warn!(digest = %failure.digest, error = %failure.message, "Manifest load failed");
                *self.last_failure.lock() = Some(failure);
                Err(e)
            }
        }
    }

    fn build_snapshot(&self, manifest: &[u8]) -> Result<(Snapshot, LoadReport), RouterError> {
        let loaded = self.pipeline.load(manifest, &self.store)?;
        let snapshot = Snapshot::build(loaded.accepted, Some(loaded.manifest_digest))?;
        let report = snapshot.report(loaded.rejected);
        Ok((snapshot, report))
    }

    fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        info!(
            snapshot = %snapshot.id,
            packs = snapshot.packs.len(),
            routes = snapshot.routes.len(),
            "Published sticker pack snapshot"
        );
        let snapshot = Arc::new(snapshot);
        *self.current.write() = Arc::clone(&snapshot);
        snapshot
    }

    /// The snapshot one request answers from.
    fn working_snapshot(&self) -> Result<Arc<Snapshot>, RouterError> {
        if self.config.refresh == RefreshPolicy::Manual {
            return Ok(self.snapshot());
        }

        let bytes = self.store.read_manifest()?;
        let digest = manifest_digest(&bytes);
        let current = self.snapshot();
        if current.manifest_digest.as_deref() == Some(digest.as_str()) {
            return Ok(current);
        }

        if let Some(answer) = self.after_failure(&digest, &current) {
            return answer;
        }

        let _guard = self.reload_lock.lock();
        let current = self.snapshot();
        if current.manifest_digest.as_deref() == Some(digest.as_str()) {
            return Ok(current);
        }
        if let Some(answer) = self.after_failure(&digest, &current) {
            return answer;
        }
        debug!(digest = %digest, "Manifest changed, rebuilding snapshot");
        match self.rebuild(&bytes) {
            Ok((snapshot, _)) => Ok(snapshot),
            Err(_) => self
                .after_failure(&digest, &current)
                .unwrap_or_else(|| Ok(Arc::clone(&current))),
        }
    }

    /// Answer for a manifest version that already failed to load: the last
    /// good snapshot if there is one, the recorded failure otherwise.
    /// `None` when `digest` has not failed.
    fn after_failure(
        &self,
        digest: &str,
        current: &Arc<Snapshot>,
    ) -> Option<Result<Arc<Snapshot>, RouterError>> {
        let failure = self.last_failure.lock().clone()?;
        if failure.digest != digest {
            return None;
        }
        if current.manifest_digest.is_some() {
            return Some(Ok(Arc::clone(current)));
        }
        Some(Err(RouterError::ManifestRejected {
            digest: failure.digest,
            message: failure.message,
        }))
    }

    fn segments(&self, uri: &str) -> Result<Vec<String>, RouterError> {
        let not_found = || RouterError::RouteNotFound(uri.to_string());
        let parsed = Url::parse(uri).map_err(|_| not_found())?;
        if parsed.scheme() != CONTENT_SCHEME || parsed.host_str() != Some(self.config.authority.as_str()) {
            return Err(not_found());
        }
        parsed
            .path_segments()
            .ok_or_else(not_found)?
            .map(|s| {
                percent_decode_str(s)
                    .decode_utf8()
                    .map(|decoded| decoded.into_owned())
                    .map_err(|_| not_found())
            })
            .collect()
    }

    fn resolve(&self, uri: &str) -> Result<(Arc<Snapshot>, Option<Route>), RouterError> {
        let segments = self.segments(uri)?;
        let snapshot = self.working_snapshot()?;
        let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
        let route = snapshot.routes.resolve(&refs);
        Ok((snapshot, route))
    }

    /// Answer a metadata or sticker-list query.
    ///
    /// An unknown pack identifier yields an empty row set; an unknown URI
    /// shape is an error.
    pub fn query(&self, uri: &str) -> Result<RowSet, RouterError> {
        let (snapshot, route) = self.resolve(uri)?;
        match route {
            Some(Route::AllMetadata) => Ok(metadata_rows(snapshot.packs.iter())),
            Some(Route::PackMetadata { identifier }) => {
                Ok(metadata_rows(snapshot.pack(&identifier).into_iter()))
            }
            Some(Route::PackStickers { identifier }) => Ok(sticker_rows(snapshot.pack(&identifier))),
            _ => Err(RouterError::RouteNotFound(uri.to_string())),
        }
    }

    /// Open the bytes of a tray icon or sticker.
    ///
    /// The requested file is served only if the named pack references it.
    pub fn open_asset(&self, uri: &str) -> Result<AssetStream, RouterError> {
        let (snapshot, route) = self.resolve(uri)?;
        let (identifier, filename) = match route {
            Some(Route::Asset { identifier, filename, .. }) => (identifier, filename),
            Some(Route::UnknownAsset { identifier, filename }) => {
                warn!(pack = %identifier, file = %filename, "Refused unregistered asset request");
                return Err(RouterError::AssetNotFound { identifier, filename });
            }
            _ => return Err(RouterError::RouteNotFound(uri.to_string())),
        };

        let Some(kind) = snapshot.pack(&identifier).and_then(|p| p.asset_kind(&filename)) else {
            warn!(pack = %identifier, file = %filename, "Refused asset outside pack");
            return Err(RouterError::AssetNotFound { identifier, filename });
        };
        drop(snapshot);

        let reader = self
            .store
            .open_asset(&identifier, &filename)
            .map_err(|e| match e {
                StoreError::NotFound { .. } => RouterError::AssetNotFound {
                    identifier: identifier.clone(),
                    filename: filename.clone(),
                },
                other => RouterError::Store(other),
            })?;

        Ok(AssetStream {
            identifier,
            filename,
            kind,
            reader,
        })
    }

    pub fn mime_type(&self, uri: &str) -> Result<String, RouterError> {
        let (_, route) = self.resolve(uri)?;
        let authority = &self.config.authority;
        match route {
            Some(Route::AllMetadata) => Ok(format!("vnd.android.cursor.dir/vnd.{}.{}", authority, METADATA)),
            Some(Route::PackMetadata { .. }) => {
                Ok(format!("vnd.android.cursor.item/vnd.{}.{}", authority, METADATA))
            }
            Some(Route::PackStickers { .. }) => {
                Ok(format!("vnd.android.cursor.dir/vnd.{}.{}", authority, STICKERS))
            }
            Some(Route::Asset { kind, .. }) => Ok(kind.mime_type().to_string()),
            _ => Err(RouterError::RouteNotFound(uri.to_string())),
        }
    }

    /// Register a pack the editor just wrote to the store.
    ///
    /// The pack goes through the same parse and validation gates as a
    /// manifest load, and its asset routes exist before it is queryable.
    pub fn insert(&self, pack_json: &[u8]) -> Result<LoadReport, RouterError> {
        let mut pack = parse_pack(pack_json).map_err(PipelineError::from)?;

        let _guard = self.reload_lock.lock();
        let current = self.snapshot();
        if current.pack(&pack.identifier).is_some() {
            return Err(RouterError::DuplicatePack(pack.identifier));
        }

        // Store links are uniform across a manifest, so any accepted pack carries them.
        if let Some(existing) = current.packs.first() {
            pack.android_play_store_link = existing.android_play_store_link.clone();
            pack.ios_app_store_link = existing.ios_app_store_link.clone();
        }

        if let Err(violation) = self.pipeline.validate_pack(&pack, &self.store) {
            return Err(RouterError::Rejected {
                identifier: pack.identifier,
                violation,
            });
        }

        let mut packs = current.packs.clone();
        packs.push(pack);
        let snapshot = Snapshot::build(packs, current.manifest_digest.clone())?;
        let report = snapshot.report(Vec::new());
        self.publish(snapshot);
        Ok(report)
    }

    pub fn delete(&self, _uri: &str) -> Result<usize, RouterError> {
        Err(RouterError::UnsupportedOperation("delete"))
    }

    pub fn update(&self, _uri: &str) -> Result<usize, RouterError> {
        Err(RouterError::UnsupportedOperation("update"))
    }
}

fn metadata_rows<'a>(packs: impl Iterator<Item = &'a StickerPack>) -> RowSet {
    let mut rows = RowSet::new(&METADATA_COLUMNS);
    for pack in packs {
        rows.rows.push(vec![
            Some(pack.identifier.clone()),
            Some(pack.name.clone()),
            Some(pack.publisher.clone()),
            Some(pack.tray_image_file.clone()),
            pack.android_play_store_link.clone(),
            pack.ios_app_store_link.clone(),
            pack.publisher_email.clone(),
            pack.publisher_website.clone(),
            pack.privacy_policy_website.clone(),
            pack.license_agreement_website.clone(),
        ]);
    }
    rows
}

fn sticker_rows(pack: Option<&StickerPack>) -> RowSet {
    let mut rows = RowSet::new(&STICKER_COLUMNS);
    for sticker in pack.into_iter().flat_map(|p| &p.stickers) {
        rows.rows.push(vec![
            Some(sticker.image_file_name.clone()),
            Some(sticker.emojis.join(",")),
        ]);
    }
    rows
}
