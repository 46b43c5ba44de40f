//! Persistence of immutable trace blocks in an object store.
//!
//! A block is identified by a tenant id and a block id and is stored as four
//! objects below `<tenant-id>/<block-id>/`: `bloom`, `index`, `data` and
//! `meta.json`. Meta is always written last and its presence is what marks a
//! block as complete.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod keys;
pub mod lister;
pub mod meta;
pub mod reader;
pub mod source;
pub mod tracing;
pub mod writer;

#[cfg(test)]
mod testing;

pub use self::{
    backend::Backend,
    config::BackendConfig,
    context::OpContext,
    error::{Error, Result},
    keys::BlockKeys,
    lister::{BlockLister, Listing, ListingWarning},
    meta::BlockMeta,
    reader::BlockReader,
    source::{BytesSource, FileSource, PayloadSource},
    writer::BlockWriter,
};
