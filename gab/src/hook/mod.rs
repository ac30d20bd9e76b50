//! In-process interception of the App Set ID API.
//!
//! Installed once when the target app's process loads. Whenever the app or
//! a bundled vendor library asks for the advertising-scoped identifier,
//! the hook serves the value cached for the most recently restored account
//! instead of the device's real one. Every failure here is deliberately
//! non-fatal: if no strategy lands, the app just sees its real identifier.

pub mod cache;
pub mod runtime;
pub mod strategy;

pub use cache::{Clock, IdentityCache, SystemClock};
pub use runtime::{ForgedAppSetId, HookValue, Runtime, SCOPE_APP};
pub use strategy::{default_strategies, HookStrategy};

use std::sync::Arc;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("class not resolvable: {0}")]
    ClassNotFound(String),

    #[error("method replacement failed: {0}")]
    InstallFailed(String),

    #[error("no interception strategy succeeded")]
    AllStrategiesFailed,
}

/// Walks the strategies in order; returns the name of the one that landed.
///
/// Callers treat `Err` as a warning, not a failure: the target app keeps
/// working with its real identifier.
pub fn install(runtime: &dyn Runtime, cache: &Arc<IdentityCache>) -> Result<&'static str> {
    install_with(runtime, cache, &default_strategies())
}

pub fn install_with(
    runtime: &dyn Runtime,
    cache: &Arc<IdentityCache>,
    strategies: &[Box<dyn HookStrategy>],
) -> Result<&'static str> {
    for strategy in strategies {
        match strategy.install(runtime, cache) {
            Ok(()) => {
                log::info!("installed app-set-id interception via `{}`", strategy.name());
                return Ok(strategy.name());
            }
            Err(e) => {
                log::debug!("strategy `{}` failed: {}", strategy.name(), e);
            }
        }
    }
    log::warn!("app-set-id interception unavailable, real identifier will be served");
    Err(Error::AllStrategiesFailed)
}

#[cfg(test)]
mod test {
    use super::strategy::*;
    use super::*;
    use crate::hook::cache::{Clock, IdentityCache};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    struct FixedClock;
    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            0
        }
    }

    fn cache_with_line(line: &'static str) -> Arc<IdentityCache> {
        Arc::new(IdentityCache::new(
            Box::new(move || Ok(line.to_string())),
            Box::new(FixedClock),
            1_000_000,
        ))
    }

    /// Runtime fake: a set of resolvable classes plus recorded hooks
    #[derive(Default)]
    struct FakeRuntime {
        classes: HashSet<String>,
        hooks: Mutex<HashMap<String, super::runtime::MethodReplacement>>,
        fail_install: bool,
    }

    impl FakeRuntime {
        fn with_classes(names: &[&str]) -> Self {
            Self {
                classes: names.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }
        }

        fn invoke(&self, class: &str, method: &str) -> HookValue {
            let hooks = self.hooks.lock().unwrap();
            match hooks.get(&format!("{}#{}", class, method)) {
                Some(r) => r(),
                None => HookValue::Passthrough,
            }
        }
    }

    impl Runtime for FakeRuntime {
        fn has_class(&self, name: &str) -> bool {
            self.classes.contains(name)
        }

        fn replace_method(
            &self,
            class: &str,
            method: &str,
            replacement: super::runtime::MethodReplacement,
        ) -> Result<()> {
            if self.fail_install {
                return Err(Error::InstallFailed("runtime said no".into()));
            }
            self.hooks
                .lock()
                .unwrap()
                .insert(format!("{}#{}", class, method), replacement);
            Ok(())
        }
    }

    #[test]
    fn test_prefers_public_entry_point() {
        let rt = FakeRuntime::with_classes(&[APPSET_CLIENT_CLASS, APPSET_INFO_CLASS]);
        let cache = cache_with_line("forged-id|ssaid|Alice|1");
        let winner = install(&rt, &cache).unwrap();
        assert_eq!(winner, "public-entry-point");

        match rt.invoke(APPSET_CLIENT_CLASS, APPSET_INFO_METHOD) {
            HookValue::CompletedTask(forged) => {
                assert_eq!(forged.id, "forged-id");
                assert_eq!(forged.scope, SCOPE_APP);
            }
            other => panic!("expected completed task, got {:?}", other),
        }
    }

    #[test]
    fn test_falls_through_to_internal_classes() {
        let rt =
            FakeRuntime::with_classes(&["com.google.android.gms.internal.appset.zzl"]);
        let cache = cache_with_line("forged-id|s|l|1");
        assert_eq!(install(&rt, &cache).unwrap(), "internal-client-classes");
        assert!(matches!(
            rt.invoke("com.google.android.gms.internal.appset.zzl", APPSET_INFO_METHOD),
            HookValue::CompletedTask(_)
        ));
    }

    #[test]
    fn test_falls_through_to_accessor() {
        let rt = FakeRuntime::with_classes(&[APPSET_INFO_CLASS]);
        let cache = cache_with_line("forged-id|s|l|1");
        assert_eq!(install(&rt, &cache).unwrap(), "info-accessor");
        assert_eq!(
            rt.invoke(APPSET_INFO_CLASS, APPSET_ID_ACCESSOR),
            HookValue::Text("forged-id".into())
        );
    }

    #[test]
    fn test_all_strategies_fail_is_nonfatal_error() {
        let rt = FakeRuntime::with_classes(&[]);
        let cache = cache_with_line("a|b|c|1");
        assert!(matches!(
            install(&rt, &cache),
            Err(Error::AllStrategiesFailed)
        ));
    }

    #[test]
    fn test_sentinel_app_set_id_passes_through() {
        let rt = FakeRuntime::with_classes(&[APPSET_CLIENT_CLASS]);
        // Restore ran without an app set id: the channel holds the sentinel
        let cache = cache_with_line("none|0011223344556677|Alice|1");
        install(&rt, &cache).unwrap();
        assert_eq!(
            rt.invoke(APPSET_CLIENT_CLASS, APPSET_INFO_METHOD),
            HookValue::Passthrough
        );
    }

    #[test]
    fn test_missing_channel_file_passes_through() {
        let rt = FakeRuntime::with_classes(&[APPSET_CLIENT_CLASS]);
        let cache = Arc::new(IdentityCache::new(
            Box::new(|| Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))),
            Box::new(FixedClock),
            1_000_000,
        ));
        install(&rt, &cache).unwrap();
        assert_eq!(
            rt.invoke(APPSET_CLIENT_CLASS, APPSET_INFO_METHOD),
            HookValue::Passthrough
        );
    }
}
