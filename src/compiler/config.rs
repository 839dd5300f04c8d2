//! Configuration for the memoization pass.

/// Prefix marking synthesized memoized entry points.
pub const MEMOIZED_PREFIX: &str = "_memoized__";

/// Metadata key carrying the folded-literal key fragment on rewritten calls.
pub const MEMO_KEY_METADATA: &str = "memo.key";

/// Default bound on nested non-pure calls during classification.
pub const MAX_CALL_DEPTH: usize = 10;

/// What to do with an eligible function that nothing calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UncalledPolicy {
    /// Leave the module unchanged and emit no descriptor.
    #[default]
    Skip,
    /// Synthesize the memoized entry point anyway, without constant folding,
    /// and emit a descriptor with no key fragments.
    Synthesize,
}

/// Configuration for [`MemoizePass`](crate::compiler::MemoizePass).
///
/// Controls the classifier's recursion bound and global-state limit as well
/// as how the rewriter names, folds and synthesizes entry points.
#[derive(Debug, Clone)]
pub struct MemoizeConfig {
    /// Nested non-pure calls at which classification fails (default: 10).
    ///
    /// The top-level function sits at depth 0. A chain of `max_call_depth`
    /// or more nested calls is rejected with `stack-depth-exceeded`.
    pub max_call_depth: usize,

    /// Name prefix of memoized entry points (default: `"_memoized__"`).
    ///
    /// Functions whose name starts with this prefix are treated as already
    /// memoized.
    pub memoized_prefix: String,

    /// Maximum number of distinct globals a memoizable function may reference
    /// (default: 1).
    pub max_free_globals: usize,

    /// Fold literal arguments into the memoization key (default: true).
    pub fold_constants: bool,

    /// Handling of eligible functions without call sites (default: skip).
    pub uncalled_policy: UncalledPolicy,
}

impl Default for MemoizeConfig {
    fn default() -> Self {
        Self {
            max_call_depth: MAX_CALL_DEPTH,
            memoized_prefix: MEMOIZED_PREFIX.to_string(),
            max_free_globals: 1,
            fold_constants: true,
            uncalled_policy: UncalledPolicy::Skip,
        }
    }
}

impl MemoizeConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `name` carries the memoized prefix.
    #[must_use]
    pub fn is_memoized_name(&self, name: &str) -> bool {
        name.starts_with(&self.memoized_prefix)
    }

    /// Returns the memoized entry point name for `name`.
    #[must_use]
    pub fn memoized_name(&self, name: &str) -> String {
        format!("{}{name}", self.memoized_prefix)
    }
}
