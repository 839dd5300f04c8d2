use thiserror::Error;

use crate::ir::{FuncId, GlobalId};

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
/// Note that a function being *ineligible* for memoization is not an error; the
/// classifier reports that as a [`Rejection`](crate::compiler::Rejection). Errors
/// signal IR that is inconsistent with itself, stale approvals, and I/O failures
/// in metadata sinks.
///
/// # Error Categories
///
/// ## IR Consistency
/// - [`Error::Malformed`] - IR violates a structural invariant
/// - [`Error::FunctionNotFound`] / [`Error::GlobalNotFound`] - dangling ids
/// - [`Error::ArityMismatch`] - a call passes the wrong number of arguments
///
/// ## Rewriting
/// - [`Error::NotApproved`] - approval token does not match the module
/// - [`Error::DuplicateSymbol`] - memoized name already taken by an incompatible function
///
/// ## Metadata Output
/// - [`Error::Io`] - sink I/O failure
/// - [`Error::Json`] - descriptor serialization failure
///
/// # Examples
///
/// ```rust
/// use memoscope::{ir::{Function, IrType, Module}, Error};
///
/// let mut module = Module::new("unit");
/// module.add_function(Function::new("f", Vec::new(), IrType::Void)).unwrap();
///
/// match module.add_function(Function::new("f", Vec::new(), IrType::i32())) {
///     Err(Error::DuplicateSymbol(name)) => assert_eq!(name, "f"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The IR is internally inconsistent.
    ///
    /// The error includes the source location where the inconsistency was
    /// detected for debugging purposes.
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

    /// A function id does not refer to a function of the module.
    #[error("Function not found - {0}")]
    FunctionNotFound(FuncId),

    /// A global id does not refer to a global of the module.
    #[error("Global not found - {0}")]
    GlobalNotFound(GlobalId),

    /// A call site passes a different number of arguments than the callee
    /// declares.
    #[error("Arity mismatch - {caller} calls {callee} with {found} arguments, expected {expected}")]
    ArityMismatch {
        /// Name of the calling function
        caller: String,
        /// Name of the called function
        callee: String,
        /// Declared parameter count of the callee
        expected: usize,
        /// Argument count at the call site
        found: usize,
    },

    /// The approval token does not describe the function it names.
    ///
    /// Raised when an approval is used against a different module or after
    /// the function changed since classification.
    #[error("Function {0} is not approved for memoization")]
    NotApproved(String),

    /// A symbol with the requested name exists with an incompatible signature.
    #[error("Duplicate symbol - {0}")]
    DuplicateSymbol(String),

    /// Metadata sink I/O error.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// Metadata serialization error.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
