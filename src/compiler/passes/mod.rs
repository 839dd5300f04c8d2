//! Built-in module passes.

mod memoize;

pub use memoize::{
    Approval, ApprovalBasis, ArrangedCall, CallSiteRewriter, CanonicalSignature, CanonicalSlot,
    EligibilityClassifier, MemoizePass, MemoizeReport, Rejection, RewriteOutcome, Slot, Verdict,
};
