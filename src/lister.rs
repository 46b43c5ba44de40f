use std::sync::Arc;

use blob_store::BlobStorage;
use metrics::{block_backend::Metrics, AutoIncrement};
use object_store::path::Path;
use opentelemetry::KeyValue;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::{
    context::OpContext,
    error::Error,
    keys::{decode_segment, tenant_prefix, BlockKeys},
};

/// An entry skipped while enumerating, with the reason it was skipped.
#[derive(Debug)]
pub struct ListingWarning {
    pub entry: String,
    pub error: Error,
}

/// Best-effort enumeration result.
///
/// `items` holds every entry that was read and parsed. Entries that failed
/// are skipped and recorded in `warnings`, in the order they were seen. Any
/// warning means the result may be incomplete.
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub warnings: Vec<ListingWarning>,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<T> Listing<T> {
    /// The most recent warning.
    pub fn warning(&self) -> Option<&Error> {
        self.warnings.last().map(|w| &w.error)
    }

    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_parts(self) -> (Vec<T>, Vec<ListingWarning>) {
        (self.items, self.warnings)
    }
}

#[derive(Debug, Clone)]
pub struct BlockLister {
    storage: BlobStorage,
    require_meta: bool,
    metrics: Arc<Metrics>,
}

impl BlockLister {
    /// With `require_meta` set, only blocks whose meta exists are reported.
    pub fn new(storage: BlobStorage, require_meta: bool, metrics: Arc<Metrics>) -> Self {
        Self {
            storage,
            require_meta,
            metrics,
        }
    }

    /// Tenants are the first level of directories below the bucket root.
    #[instrument(skip_all)]
    pub async fn tenants(&self, ctx: &OpContext) -> Listing<String> {
        let mut listing = Listing::default();
        let Some(prefixes) = self.list_dirs(ctx, None, &mut listing).await else {
            return listing;
        };

        for prefix in prefixes {
            match prefix.filename().and_then(decode_segment) {
                Some(tenant_id) => listing.items.push(tenant_id),
                None => self.skip(
                    &mut listing,
                    prefix.to_string(),
                    Error::MalformedEntry {
                        prefix: prefix.to_string(),
                    },
                ),
            }
        }
        listing
    }

    #[instrument(skip(self, ctx))]
    pub async fn blocks(&self, ctx: &OpContext, tenant_id: &str) -> Listing<Uuid> {
        let mut listing = Listing::default();
        let tenant = tenant_prefix(tenant_id);
        let Some(prefixes) = self.list_dirs(ctx, Some(&tenant), &mut listing).await else {
            return listing;
        };

        for prefix in prefixes {
            let Some(id) = prefix.filename().and_then(decode_segment) else {
                self.skip(
                    &mut listing,
                    prefix.to_string(),
                    Error::MalformedEntry {
                        prefix: prefix.to_string(),
                    },
                );
                continue;
            };
            let block_id = match Uuid::parse_str(&id) {
                Ok(block_id) => block_id,
                Err(source) => {
                    self.skip(
                        &mut listing,
                        id.clone(),
                        Error::MalformedBlockId {
                            value: id.clone(),
                            source,
                        },
                    );
                    continue;
                }
            };

            if self.require_meta {
                if let Err(err) = ctx.check() {
                    self.skip(&mut listing, id, err);
                    break;
                }
                let meta = BlockKeys::new(tenant_id, &block_id).meta();
                let exists = ctx
                    .run(async {
                        self.storage
                            .exists(&meta)
                            .await
                            .map_err(|e| Error::from_store(&meta, e))
                    })
                    .await;
                match exists {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!(block_id = %block_id, "skipping block without meta");
                        continue;
                    }
                    Err(err) => {
                        self.skip(&mut listing, id, err);
                        continue;
                    }
                }
            }

            listing.items.push(block_id);
        }
        listing
    }

    async fn list_dirs<T>(
        &self,
        ctx: &OpContext,
        prefix: Option<&Path>,
        listing: &mut Listing<T>,
    ) -> Option<Vec<Path>> {
        let key = prefix.cloned().unwrap_or_default();
        let res = ctx
            .run(async {
                self.storage
                    .list_dirs(prefix)
                    .await
                    .map_err(|e| Error::from_store(&key, e))
            })
            .await;
        match res {
            Ok(prefixes) => Some(prefixes),
            Err(err) => {
                self.skip(listing, key.to_string(), err);
                None
            }
        }
    }

    fn skip<T>(&self, listing: &mut Listing<T>, entry: String, error: Error) {
        warn!(entry = %entry, "skipping listing entry: {}", error);
        let labels = [KeyValue::new("kind", error_kind(&error))];
        self.metrics.listing_warnings.increment(&labels);
        listing.warnings.push(ListingWarning { entry, error });
    }
}

fn error_kind(error: &Error) -> &'static str {
    if error.is_malformed() {
        "malformed"
    } else if error.is_not_found() {
        "not_found"
    } else {
        "store"
    }
}
