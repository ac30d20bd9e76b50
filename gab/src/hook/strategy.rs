//! Ordered class-resolution strategies.
//!
//! The vendor library obfuscates its internal class names differently
//! across releases, so no single hook point is reliable. Each strategy
//! knows one way in; the installer walks them in order and stops at the
//! first success.

use std::sync::Arc;

use crate::identifiers::is_present;

use super::cache::IdentityCache;
use super::runtime::{ForgedAppSetId, HookValue, MethodReplacement, Runtime};
use super::{Error, Result};

/// The stable public entry point
pub const APPSET_CLIENT_CLASS: &str = "com.google.android.gms.appset.AppSetIdClient";
pub const APPSET_INFO_METHOD: &str = "getAppSetIdInfo";

/// Implementation class names observed across vendor releases
pub const INTERNAL_CLIENT_CLASSES: &[&str] = &[
    "com.google.android.gms.internal.appset.zzr",
    "com.google.android.gms.internal.appset.zzl",
    "com.google.android.gms.internal.appset.zzp",
];

/// The result object; its accessor survives entry-point obfuscation
pub const APPSET_INFO_CLASS: &str = "com.google.android.gms.appset.AppSetIdInfo";
pub const APPSET_ID_ACCESSOR: &str = "getId";

pub trait HookStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Try to install the interception; any error is non-fatal to the
    /// overall installer, which just moves on to the next strategy.
    fn install(&self, runtime: &dyn Runtime, cache: &Arc<IdentityCache>) -> Result<()>;
}

/// Replacement for `getAppSetIdInfo`-shaped methods: a completed task
/// wrapping the forged result, or passthrough when there is no cached id.
fn task_replacement(cache: &Arc<IdentityCache>) -> MethodReplacement {
    let cache = Arc::clone(cache);
    Arc::new(move || match cache.get() {
        Some(p) if is_present(&p.app_set_id) => {
            HookValue::CompletedTask(ForgedAppSetId::new(&p.app_set_id))
        }
        _ => HookValue::Passthrough,
    })
}

/// Replacement for the `getId` accessor on the result object itself
fn accessor_replacement(cache: &Arc<IdentityCache>) -> MethodReplacement {
    let cache = Arc::clone(cache);
    Arc::new(move || match cache.get() {
        Some(p) if is_present(&p.app_set_id) => HookValue::Text(p.app_set_id.clone()),
        _ => HookValue::Passthrough,
    })
}

/// Hooks the public client interface by its stable name
pub struct EntryPointStrategy;

impl HookStrategy for EntryPointStrategy {
    fn name(&self) -> &'static str {
        "public-entry-point"
    }

    fn install(&self, runtime: &dyn Runtime, cache: &Arc<IdentityCache>) -> Result<()> {
        if !runtime.has_class(APPSET_CLIENT_CLASS) {
            return Err(Error::ClassNotFound(APPSET_CLIENT_CLASS.into()));
        }
        runtime.replace_method(
            APPSET_CLIENT_CLASS,
            APPSET_INFO_METHOD,
            task_replacement(cache),
        )
    }
}

/// Tries each known obfuscated implementation class in turn
pub struct InternalClientStrategy;

impl HookStrategy for InternalClientStrategy {
    fn name(&self) -> &'static str {
        "internal-client-classes"
    }

    fn install(&self, runtime: &dyn Runtime, cache: &Arc<IdentityCache>) -> Result<()> {
        for class in INTERNAL_CLIENT_CLASSES {
            if !runtime.has_class(class) {
                continue;
            }
            match runtime.replace_method(class, APPSET_INFO_METHOD, task_replacement(cache)) {
                Ok(()) => {
                    log::debug!("hooked internal client class {}", class);
                    return Ok(());
                }
                Err(e) => {
                    log::debug!("hooking {} failed: {}", class, e);
                }
            }
        }
        Err(Error::ClassNotFound("no known internal client class".into()))
    }
}

/// Last resort: the accessor on the result object, stable even when the
/// higher-level entry point's implementing class varies
pub struct InfoAccessorStrategy;

impl HookStrategy for InfoAccessorStrategy {
    fn name(&self) -> &'static str {
        "info-accessor"
    }

    fn install(&self, runtime: &dyn Runtime, cache: &Arc<IdentityCache>) -> Result<()> {
        if !runtime.has_class(APPSET_INFO_CLASS) {
            return Err(Error::ClassNotFound(APPSET_INFO_CLASS.into()));
        }
        runtime.replace_method(
            APPSET_INFO_CLASS,
            APPSET_ID_ACCESSOR,
            accessor_replacement(cache),
        )
    }
}

pub fn default_strategies() -> Vec<Box<dyn HookStrategy>> {
    vec![
        Box::new(EntryPointStrategy),
        Box::new(InternalClientStrategy),
        Box::new(InfoAccessorStrategy),
    ]
}
