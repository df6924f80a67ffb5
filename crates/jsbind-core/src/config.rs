//! Bridge configuration.

use std::borrow::Cow;

/// Tunables for a [`Runtime`](crate::Runtime).
///
/// ```
/// use jsbind_core::BridgeConfig;
///
/// let config = BridgeConfig::new()
///     .with_max_reentrancy(64)
///     .with_panic_error_name("RustPanic");
/// assert_eq!(config.max_reentrancy, Some(64));
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Deepest allowed nesting of host functions called from the external
    /// side. `None` leaves nesting unbounded.
    pub max_reentrancy: Option<usize>,
    /// Catch panics in boxed host functions and rethrow them externally.
    /// When disabled, panics unwind through the engine.
    pub catch_panics: bool,
    /// Constructor name of the external error thrown for a caught panic.
    pub panic_error_name: Cow<'static, str>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_reentrancy: None,
            catch_panics: true,
            panic_error_name: Cow::Borrowed("HostPanic"),
        }
    }
}

impl BridgeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_reentrancy(mut self, depth: usize) -> Self {
        self.max_reentrancy = Some(depth);
        self
    }

    pub fn with_catch_panics(mut self, catch: bool) -> Self {
        self.catch_panics = catch;
        self
    }

    pub fn with_panic_error_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.panic_error_name = name.into();
        self
    }
}
