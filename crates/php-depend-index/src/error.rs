use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuilderError {
    /// A declaration would replace a name some consumer already resolved.
    #[error("cannot declare {name}: the name has already been resolved")]
    BuilderFrozen { name: String },

    /// Two composed traits provide the same method and nothing picks one.
    #[error("trait method {method} has collisions in {type_name}")]
    TraitMethodCollision { method: String, type_name: String },
}
