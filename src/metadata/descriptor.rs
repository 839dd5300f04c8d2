//! Canonical-parameter descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ir::IrType;

/// Describes one memoized function to the downstream cache generator.
///
/// `parameter_order` lists the types of the memoized entry point's runtime
/// parameters in canonical order. Each string in `constant_key_fragments` is
/// the comma-joined decimal text of the literals folded away at one or more
/// call sites; fragments are deduplicated and listed in call-site order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoDescriptor {
    /// Name of the function being memoized.
    pub original_name: String,
    /// Name of the synthesized entry point.
    pub memoized_name: String,
    /// Runtime parameter types of the entry point, in order.
    pub parameter_order: Vec<IrType>,
    /// Distinct key fragments observed across call sites.
    pub constant_key_fragments: Vec<String>,
    /// Number of call sites redirected to the entry point.
    pub call_sites: usize,
}

impl MemoDescriptor {
    /// Returns `true` if any call site folded a literal.
    #[must_use]
    pub fn has_folded_constants(&self) -> bool {
        !self.constant_key_fragments.is_empty()
    }
}

impl fmt::Display for MemoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}(", self.original_name, self.memoized_name)?;
        for (i, ty) in self.parameter_order.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{ty}")?;
        }
        write!(f, ")")?;
        if self.has_folded_constants() {
            write!(f, " keys [{}]", self.constant_key_fragments.join("; "))?;
        }
        Ok(())
    }
}
