//! Per-thread current context bookkeeping
//!
//! Native GL keeps "the current context" in thread-local storage, and a
//! thread has at most one context bound across every display connection of
//! the process. The tracker mirrors that state in an explicit map keyed by
//! [`ThreadId`], so activation can be made idempotent and queried without
//! asking the driver. All displays share [`CurrentContextTracker::global`].
//!
//! Entries remember which platform a context belongs to, since native handles
//! are only unique within one platform.
//!
//! Only the calling thread ever inserts or removes its own entry, and native
//! calls are made with the map unlocked. Activating the same context from two
//! threads at once is a caller error; the native layer decides what happens.

use crate::error::{ContextError, Result};
use lumen_platform::{ContextHandle, GlPlatform, SurfaceId};
use rustc_hash::FxHashMap;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{self, ThreadId};

static GLOBAL: OnceLock<CurrentContextTracker> = OnceLock::new();

/// A native context together with the surface it renders to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    /// Native context
    pub context: ContextHandle,
    /// Surface the context is made current against
    pub surface: SurfaceId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Current {
    platform: usize,
    context: ContextHandle,
}

fn platform_key(platform: &dyn GlPlatform) -> usize {
    platform as *const dyn GlPlatform as *const () as usize
}

/// Thread-keyed map of current contexts
#[derive(Debug, Default)]
pub struct CurrentContextTracker {
    current: Mutex<FxHashMap<ThreadId, Current>>,
}

impl CurrentContextTracker {
    /// Create an empty tracker
    ///
    /// Contexts use [`CurrentContextTracker::global`]; separate trackers are
    /// only consistent with the driver when nothing else binds contexts.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide tracker
    pub fn global() -> &'static CurrentContextTracker {
        GLOBAL.get_or_init(CurrentContextTracker::new)
    }

    fn map(&self) -> MutexGuard<'_, FxHashMap<ThreadId, Current>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self) -> Option<Current> {
        self.map().get(&thread::current().id()).copied()
    }

    /// Context current on the calling thread, whatever its platform
    pub fn current(&self) -> Option<ContextHandle> {
        self.entry().map(|current| current.context)
    }

    /// Whether `context` of `platform` is current on the calling thread
    pub fn is_current(&self, platform: &dyn GlPlatform, context: ContextHandle) -> bool {
        self.entry()
            == Some(Current {
                platform: platform_key(platform),
                context,
            })
    }

    /// Whether the calling thread has any context bound
    pub fn is_any_active(&self) -> bool {
        self.entry().is_some()
    }

    /// Activate or deactivate a context on the calling thread
    ///
    /// `target` is `None` for a context without a native handle.
    pub fn set_active(
        &self,
        platform: &dyn GlPlatform,
        target: Option<Binding>,
        active: bool,
    ) -> Result<()> {
        if active {
            self.activate(platform, target)
        } else {
            self.deactivate(platform, target.map(|binding| binding.context))
        }
    }

    /// Bind `target` on the calling thread, superseding the previous context
    ///
    /// Does nothing if `target` is already current here.
    pub fn activate(&self, platform: &dyn GlPlatform, target: Option<Binding>) -> Result<()> {
        let binding = target.ok_or_else(|| {
            ContextError::Activation("context has no native handle".to_string())
        })?;

        if self.is_current(platform, binding.context) {
            return Ok(());
        }

        platform
            .make_current(binding.surface, binding.context)
            .map_err(|err| ContextError::Activation(err.to_string()))?;

        let current = Current {
            platform: platform_key(platform),
            context: binding.context,
        };
        let previous = self.map().insert(thread::current().id(), current);
        tracing::debug!(
            context = %binding.context,
            surface = %binding.surface,
            superseded = ?previous.map(|previous| previous.context),
            "Context activated"
        );
        Ok(())
    }

    /// Unbind `context` from the calling thread
    ///
    /// Does nothing if `context` is not current here.
    pub fn deactivate(
        &self,
        platform: &dyn GlPlatform,
        context: Option<ContextHandle>,
    ) -> Result<()> {
        let Some(context) = context.filter(|context| self.is_current(platform, *context)) else {
            return Ok(());
        };

        platform
            .release_current()
            .map_err(|err| ContextError::Activation(err.to_string()))?;

        self.map().remove(&thread::current().id());
        tracing::debug!(context = %context, "Context deactivated");
        Ok(())
    }

    /// Drop every entry referring to a destroyed context
    ///
    /// Returns how many threads still had it bound.
    pub fn forget(&self, platform: &dyn GlPlatform, context: ContextHandle) -> usize {
        let destroyed = Current {
            platform: platform_key(platform),
            context,
        };
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, current| *current != destroyed);
        before - map.len()
    }
}
