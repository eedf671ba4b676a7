//! Configuration of the decompiler pipeline.

use std::time::Duration;

use crate::emit::EmitOptions;

/// Configuration of a [`Decompiler`](crate::decompiler::Decompiler).
///
/// All fields are public; start from [`DecompilerConfig::default`] and adjust
/// what you need.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use dexscope::decompiler::DecompilerConfig;
///
/// let config = DecompilerConfig {
///     method_timeout: Some(Duration::from_millis(250)),
///     emit_ast: false,
///     ..DecompilerConfig::default()
/// };
/// assert!(config.parallel);
/// ```
#[derive(Debug, Clone)]
pub struct DecompilerConfig {
    /// Deadline per method, checked between pipeline stages (default: 5s).
    pub method_timeout: Option<Duration>,

    /// Decompile the methods of a class on the rayon pool (default: true).
    pub parallel: bool,

    /// Keep the syntax tree of each method in the output (default: true).
    pub emit_ast: bool,

    /// Render source text for each method (default: true).
    pub emit_text: bool,

    /// Upper bound on short-circuit merging passes (default: 64).
    pub max_structuring_passes: usize,

    /// Omit argument-less `super()` / `this()` calls in constructors (default: true).
    pub skip_constructor_super_call: bool,
}

impl Default for DecompilerConfig {
    fn default() -> Self {
        Self {
            method_timeout: Some(Duration::from_secs(5)),
            parallel: true,
            emit_ast: true,
            emit_text: true,
            max_structuring_passes: 64,
            skip_constructor_super_call: true,
        }
    }
}

impl DecompilerConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-threaded configuration without deadline, for debugging.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            method_timeout: None,
            parallel: false,
            ..Self::default()
        }
    }

    pub(crate) fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            skip_constructor_super_call: self.skip_constructor_super_call,
        }
    }
}
