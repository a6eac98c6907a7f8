//! Module image parsing for the workbench.
//!
//! An image file carries a header, a NUL-terminated string heap, fixed-width
//! definition tables (types, methods, fields, properties, events, module
//! references), and an optional debug-symbol section. [`ModuleImage::parse`]
//! decodes the whole thing eagerly with bounds checks on every section;
//! [`PeekInfo::read`] decodes only the header and table counts for cheap
//! candidate probing; [`TypeSystem::build`] resolves the raw rows into a
//! navigable view, skipping corrupt definitions instead of failing.
//!
//! A malformed symbol section never fails a load. The image parses without
//! symbols and records why in [`SymbolStatus::Failed`].

mod cursor;
mod error;
mod image;
mod peek;
mod symbols;
mod typesys;
mod writer;

pub use error::MetadataError;
pub use image::{
    ModuleImage, SymbolStatus, MEMBER_FLAG_PUBLIC, MEMBER_FLAG_SPECIAL, TYPE_FLAG_INTERFACE,
    TYPE_FLAG_PUBLIC, TYPE_FLAG_SEALED,
};
pub use peek::PeekInfo;
pub use symbols::{SourceLocation, SymbolTable};
pub use typesys::{MemberInfo, TypeInfo, TypeSystem};
pub use writer::ModuleImageBuilder;
