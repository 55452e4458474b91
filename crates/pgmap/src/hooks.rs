//! Entity lifecycle hooks.
//!
//! A [`Hooks`] registry holds, per [`HookEvent`], an ordered list of callbacks
//! for one entity type. It belongs to a [`Mapper`](crate::Mapper), so two
//! mappers never see each other's hooks.
//!
//! ```ignore
//! use pgmap::{Context, Hooks, HookEvent, Mapper, OrmError, OrmResult};
//!
//! let hooks = Hooks::<Book>::new()
//!     .on(HookEvent::BeforeInsert, |_ctx: &Context, book: &mut Book| -> OrmResult<()> {
//!         book.title = book.title.trim().to_string();
//!         Ok(())
//!     })
//!     .on(HookEvent::BeforeDelete, |_ctx: &Context, book: &mut Book| -> OrmResult<()> {
//!         if book.published_year < 1900 {
//!             return Err(OrmError::Other("archived books are read-only".into()));
//!         }
//!         Ok(())
//!     });
//! let books = Mapper::with_hooks(hooks);
//! ```

use crate::context::Context;
use crate::error::OrmResult;
use std::fmt;
use std::sync::Arc;

/// Lifecycle point at which hooks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    BeforeInsert,
    AfterInsert,
    AfterSelect,
    BeforeUpdate,
    AfterUpdate,
    BeforeDelete,
    AfterDelete,
    BeforeUpsert,
    AfterUpsert,
}

impl HookEvent {
    pub const ALL: [HookEvent; 9] = [
        HookEvent::BeforeInsert,
        HookEvent::AfterInsert,
        HookEvent::AfterSelect,
        HookEvent::BeforeUpdate,
        HookEvent::AfterUpdate,
        HookEvent::BeforeDelete,
        HookEvent::AfterDelete,
        HookEvent::BeforeUpsert,
        HookEvent::AfterUpsert,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// A callback run at a lifecycle point.
///
/// Returning an error aborts the remaining hooks and the operation that
/// triggered them; the error reaches the caller unchanged.
pub trait Hook<E>: Send + Sync {
    fn call(&self, ctx: &Context, entity: &mut E) -> OrmResult<()>;
}

impl<E, F> Hook<E> for F
where
    F: Fn(&Context, &mut E) -> OrmResult<()> + Send + Sync,
{
    fn call(&self, ctx: &Context, entity: &mut E) -> OrmResult<()> {
        self(ctx, entity)
    }
}

/// Ordered hook lists for one entity type.
pub struct Hooks<E> {
    lists: [Vec<Arc<dyn Hook<E>>>; 9],
}

impl<E> Hooks<E> {
    pub fn new() -> Self {
        Self {
            lists: Default::default(),
        }
    }

    /// Register a hook, builder style.
    pub fn on<H: Hook<E> + 'static>(mut self, event: HookEvent, hook: H) -> Self {
        self.add(event, hook);
        self
    }

    /// Register a hook after the ones already registered for `event`.
    pub fn add<H: Hook<E> + 'static>(&mut self, event: HookEvent, hook: H) -> &mut Self {
        self.lists[event.index()].push(Arc::new(hook));
        self
    }

    /// Register an Arc-wrapped hook.
    pub fn add_arc(&mut self, event: HookEvent, hook: Arc<dyn Hook<E>>) -> &mut Self {
        self.lists[event.index()].push(hook);
        self
    }

    pub fn len(&self, event: HookEvent) -> usize {
        self.lists[event.index()].len()
    }

    pub fn has(&self, event: HookEvent) -> bool {
        !self.lists[event.index()].is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.lists.iter_mut().for_each(Vec::clear);
    }

    /// Run every hook for `event` in registration order, stopping at the first error.
    pub fn run(&self, event: HookEvent, ctx: &Context, entity: &mut E) -> OrmResult<()> {
        for hook in &self.lists[event.index()] {
            if let Err(e) = hook.call(ctx, entity) {
                tracing::debug!(
                    target: "pgmap.hooks",
                    ?event,
                    error = %e,
                    "hook aborted operation"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Run `event` hooks over each entity of a slice.
    pub fn run_all(&self, event: HookEvent, ctx: &Context, entities: &mut [E]) -> OrmResult<()> {
        if !self.has(event) {
            return Ok(());
        }
        entities
            .iter_mut()
            .try_for_each(|entity| self.run(event, ctx, entity))
    }
}

impl<E> Default for Hooks<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Hooks<E> {
    fn clone(&self) -> Self {
        Self {
            lists: self.lists.clone(),
        }
    }
}

impl<E> fmt::Debug for Hooks<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for event in HookEvent::ALL {
            let n = self.len(event);
            if n > 0 {
                map.entry(&event, &n);
            }
        }
        map.finish()
    }
}
