//! Symbol registry for php-depend.
//!
//! Registers parsed files, resolves deferred type references, composes
//! trait methods and caches parse results between runs.

pub mod builder;
pub mod cache;
pub mod deferred;
pub mod error;
pub mod methods;
mod traits;

pub use builder::{
    Builder, DeclarationSite, FunctionEntity, FunctionId, Namespace, NamespaceId, Resolved,
    TypeEntity, TypeId, UnitId,
};
pub use cache::{content_hash, Cache, FileCache, MemoryCache};
pub use deferred::Deferred;
pub use error::BuilderError;
pub use methods::{EffectiveMethod, MethodOrigin, MethodTable};
