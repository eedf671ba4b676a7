use thiserror::Error;

/// Helper macro for building [`Error::Invariant`] values with source location.
///
/// Invariant violations point to a bug in graph construction or in one of the
/// rewriting passes. They are never downgraded to data-quality events.
///
/// ```rust,ignore
/// return Err(invariant_error!("conditional {} has no successor", node));
/// ```
macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Invariant {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Invariant {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Helper macro for building [`Error::Malformed`] values with source location.
///
/// ```rust,ignore
/// return Err(malformed_error!("block {} references missing child {}", name, idx));
/// ```
macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Recoverable data-quality problems (unknown opcodes, odd exit topology, irreducible
/// regions) are not errors: they are recorded as events and the method is still
/// decompiled. The variants below abort the pipeline of a single method.
///
/// # Error Categories
///
/// ## Input Errors
/// - [`Error::Malformed`] - Basic blocks or method metadata are inconsistent
/// - [`Error::Empty`] - A method with code has no basic blocks
///
/// ## Engine Errors
/// - [`Error::Invariant`] - Internal invariant violated (engine bug)
/// - [`Error::GraphError`] - Graph operation on a node that is not part of the graph
/// - [`Error::Timeout`] - The per-method deadline expired
/// - [`Error::Panicked`] - A method pipeline panicked and was isolated
///
/// ## Output Errors
/// - [`Error::Json`] - AST serialization failed
///
/// # Examples
///
/// ```rust,ignore
/// use dexscope::{Decompiler, Error, MethodInfo};
///
/// # fn run(method: &MethodInfo) {
/// match Decompiler::default().decompile_method(method) {
///     Ok(output) => println!("{}", output.source()),
///     Err(Error::Timeout { method, .. }) => eprintln!("{method} took too long"),
///     Err(Error::Invariant { message, file, line }) => {
///         eprintln!("engine bug: {message} ({file}:{line})")
///     }
///     Err(e) => eprintln!("failed: {e}"),
/// }
/// # }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The input handed over by the container parser is inconsistent.
    ///
    /// Raised for dangling child indices, handler blocks that do not exist, or
    /// instructions whose operands do not match their opcode.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A method that claims to have code came without any basic block.
    #[error("Method has code but no basic blocks")]
    Empty,

    /// An internal invariant of the engine was violated.
    ///
    /// For example a conditional node without a branch after construction.
    /// This always indicates a bug in the CFG builder or a rewriting pass.
    ///
    /// # Fields
    ///
    /// * `message` - What invariant was broken
    /// * `file` - Source file where the violation was detected
    /// * `line` - Source line where the violation was detected
    #[error("Invariant violated - {file}:{line}: {message}")]
    Invariant {
        /// Description of the broken invariant
        message: String,
        /// The source file in which the violation was detected
        file: &'static str,
        /// The source line in which the violation was detected
        line: u32,
    },

    /// Graph manipulation error.
    ///
    /// Raised when a node or location that is no longer part of the graph is
    /// addressed.
    #[error("{0}")]
    GraphError(String),

    /// The per-method deadline expired between two pipeline stages.
    #[error("Decompilation of {method} timed out after {stage}")]
    Timeout {
        /// Descriptor of the method being processed
        method: String,
        /// The last pipeline stage that completed
        stage: &'static str,
    },

    /// The pipeline of a method panicked; the payload message is preserved.
    #[error("Decompilation panicked: {0}")]
    Panicked(String),

    /// Serialization of the syntax tree failed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// The result type used throughout dexscope.
pub type Result<T> = std::result::Result<T, Error>;
