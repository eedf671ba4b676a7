//! Method and class decompilation driver.
//!
//! A [`Decompiler`] owns the configuration, the shared [`DescriptorInterner`]
//! and the [`EventLog`] of a run. Each method goes through its own pipeline
//! (see [`Decompiler::analyze`]); a failure or panic in one method only marks
//! that method as failed.
//!
//! # Examples
//!
//! ```rust,ignore
//! use dexscope::decompiler::{Decompiler, DecompilerConfig};
//!
//! let decompiler = Decompiler::new(DecompilerConfig::default());
//! let class = decompiler.decompile_class(&class_info);
//! println!("{}", class.text);
//! for (kind, count) in decompiler.events().summary() {
//!     eprintln!("{kind}: {count}");
//! }
//! ```

mod class;
mod config;
mod events;
mod method;

pub use class::DecompiledClass;
pub use config::DecompilerConfig;
pub use events::{Event, EventKind, EventLog};
pub use method::{AnalyzedMethod, DecompiledMethod, MethodOutput};

use std::panic::{catch_unwind, AssertUnwindSafe};

use log::debug;
use rayon::prelude::*;

use crate::{
    emit::method_header,
    input::{ClassInfo, DescriptorInterner, MethodInfo},
    Error, Result,
};

/// Decompiles methods and classes with one configuration.
#[derive(Debug, Default)]
pub struct Decompiler {
    config: DecompilerConfig,
    types: DescriptorInterner,
    events: EventLog,
}

impl Decompiler {
    /// Creates a decompiler with an empty event log.
    #[must_use]
    pub fn new(config: DecompilerConfig) -> Self {
        Decompiler {
            config,
            types: DescriptorInterner::new(),
            events: EventLog::new(),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &DecompilerConfig {
        &self.config
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Runs the pipeline of `method` up to, but excluding, emission.
    ///
    /// # Errors
    ///
    /// [`Error::Empty`] for a method without code, construction errors and
    /// [`Error::Timeout`].
    pub fn analyze(&self, method: &MethodInfo) -> Result<AnalyzedMethod> {
        method::analyze(method, &self.config, &self.events)
    }

    /// Decompiles one method.
    ///
    /// # Errors
    ///
    /// [`Error::Empty`] for a method without code, construction errors and
    /// [`Error::Timeout`].
    pub fn decompile_method(&self, method: &MethodInfo) -> Result<DecompiledMethod> {
        method::decompile(method, &self.config, &self.types, &self.events)
    }

    /// Decompiles one method of a class, isolating errors and panics.
    pub fn method_output(&self, method: &MethodInfo) -> MethodOutput {
        if !method.has_code() {
            return MethodOutput::NoCode(method_header(method, &self.types));
        }
        let result = catch_unwind(AssertUnwindSafe(|| self.decompile_method(method)))
            .unwrap_or_else(|payload| Err(Error::Panicked(panic_message(payload.as_ref()))));
        match result {
            Ok(decompiled) => MethodOutput::Decompiled(decompiled),
            Err(error) => {
                let descriptor = method.full_name();
                self.events.record(
                    Event::new(EventKind::MethodFailed, error.to_string()).in_method(&descriptor),
                );
                MethodOutput::Failed { descriptor, error }
            }
        }
    }

    /// Decompiles every method of `class` and renders the class.
    ///
    /// Methods run on the rayon pool when [`DecompilerConfig::parallel`] is
    /// set; output order is declaration order either way.
    pub fn decompile_class(&self, class: &ClassInfo) -> DecompiledClass {
        debug!("{}: {} methods", class.descriptor, class.methods.len());
        let outputs: Vec<MethodOutput> = if self.config.parallel {
            class
                .methods
                .par_iter()
                .map(|m| self.method_output(m))
                .collect()
        } else {
            class.methods.iter().map(|m| self.method_output(m)).collect()
        };

        let text = class::render_class(class, &outputs, &self.types);
        let ast = self
            .config
            .emit_ast
            .then(|| class::class_ast(class, &outputs, &self.types));
        DecompiledClass {
            descriptor: class.descriptor.clone(),
            text,
            ast,
            methods: outputs,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::AccessFlags;

    #[test]
    fn test_panic_message() {
        let payload = catch_unwind(|| panic!("boom {}", 1)).unwrap_err();
        assert_eq!(panic_message(payload.as_ref()), "boom 1");
    }

    #[test]
    fn test_no_code_and_empty_method() {
        let decompiler = Decompiler::new(DecompilerConfig::sequential());
        let native = MethodInfo::new("LFoo;", "n", "()V", AccessFlags::NATIVE);
        assert!(matches!(
            decompiler.method_output(&native),
            MethodOutput::NoCode(_)
        ));
        assert!(matches!(
            decompiler.decompile_method(&native),
            Err(Error::Empty)
        ));
    }
}
