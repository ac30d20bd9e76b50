//! Abstraction over the hosting runtime's class/method machinery.
//!
//! The interceptor itself only needs two capabilities: check whether a
//! class resolves in the target process, and replace one method's return
//! value. Keeping them behind this trait lets the strategies run against
//! fakes on the host.

use std::sync::Arc;

use super::Result;

/// Scope tag carried by forged results, meaning "scoped to this app"
pub const SCOPE_APP: i32 = 1;

/// The replacement result handed back to the vendor library
#[derive(Debug, Clone, PartialEq)]
pub struct ForgedAppSetId {
    pub id: String,
    pub scope: i32,
}

impl ForgedAppSetId {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.into(),
            scope: SCOPE_APP,
        }
    }
}

/// What a replaced method should return for one interception
#[derive(Debug, Clone, PartialEq)]
pub enum HookValue {
    /// Let the original return value through untouched
    Passthrough,
    /// An already-completed asynchronous result wrapping the forged id,
    /// in whatever completed-task primitive the vendor library expects
    CompletedTask(ForgedAppSetId),
    /// A bare string, for the accessor-level hook on the result object
    Text(String),
}

pub type MethodReplacement = Arc<dyn Fn() -> HookValue + Send + Sync>;

pub trait Runtime: Send + Sync {
    /// True when `name` resolves to a loadable class in the target process
    fn has_class(&self, name: &str) -> bool;

    /// Installs `replacement` over `class.method`
    fn replace_method(
        &self,
        class: &str,
        method: &str,
        replacement: MethodReplacement,
    ) -> Result<()>;
}
