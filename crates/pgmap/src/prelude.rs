//! Convenient imports for typical `pgmap` usage.
//!
//! ```ignore
//! use pgmap::prelude::*;
//! ```

pub use crate::{
    ColumnSelection, ColumnValues, Context, Entity, GenericClient, HasMany, HookEvent, Hooks,
    Mapper, OrmError, OrmResult, Query, TransactionOptions, UpsertOptions, Value,
};

#[cfg(feature = "pool")]
pub use crate::{create_pool, create_pool_with_config};
