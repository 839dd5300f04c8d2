//! IR type system.
//!
//! [`IrType`] describes the type of every value in the IR: parameters, globals,
//! constants and instruction results. The memoization pass needs two things from
//! it beyond plain equality:
//!
//! - **Scalar classification**: whether a type is exactly an integer, a
//!   single-precision float or a double-precision float (global-state safety).
//! - **A total order**: canonical parameter lists are sorted by type, and the
//!   sort must not depend on the declaration order of Rust enum variants.
//!
//! # Canonical Order
//!
//! Types are ordered first by the explicit [`TypeKind::rank`] of their kind and
//! then structurally:
//!
//! ```text
//! integer < float < double < pointer < array < struct < void
//!   iN      : by bit width
//!   ptr<T>  : by pointee
//!   [N x T] : by element, then by length
//!   {T...}  : lexicographically by field
//! ```

use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoStaticStr};

/// Closed enumeration of type kinds with an explicit canonical rank.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumCount, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum TypeKind {
    /// No value.
    Void,
    /// Fixed-width integer of any width.
    Integer,
    /// IEEE-754 single precision.
    Float,
    /// IEEE-754 double precision.
    Double,
    /// Pointer or reference to memory.
    Pointer,
    /// Fixed-length array.
    Array,
    /// Anonymous structure.
    Struct,
}

impl TypeKind {
    /// Position of this kind in the canonical type order.
    ///
    /// The rank is spelled out per kind rather than derived from the variant
    /// order, so reordering the enum never changes canonical signatures.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Integer => 0,
            Self::Float => 1,
            Self::Double => 2,
            Self::Pointer => 3,
            Self::Array => 4,
            Self::Struct => 5,
            Self::Void => 6,
        }
    }

    /// Returns the kind's lowercase name.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.into()
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of an IR value.
///
/// # Examples
///
/// ```rust
/// use memoscope::ir::IrType;
///
/// let counter = IrType::i32();
/// let cell = IrType::ptr(IrType::i32());
///
/// assert!(counter.is_plain_scalar());
/// assert!(cell.is_pointer());
/// assert_eq!(cell.pointee(), Some(&counter));
/// assert!(counter.canonical_cmp(&cell).is_lt());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IrType {
    /// No value (function return only).
    #[default]
    Void,
    /// Integer with the given bit width.
    Int(u16),
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
    /// Pointer to a value of the inner type.
    Ptr(Box<IrType>),
    /// Array of `len` elements.
    Array(Box<IrType>, u64),
    /// Structure with ordered fields.
    Struct(Vec<IrType>),
}

impl IrType {
    /// 1-bit integer (boolean).
    #[must_use]
    pub const fn i1() -> Self {
        Self::Int(1)
    }

    /// 8-bit integer.
    #[must_use]
    pub const fn i8() -> Self {
        Self::Int(8)
    }

    /// 32-bit integer.
    #[must_use]
    pub const fn i32() -> Self {
        Self::Int(32)
    }

    /// 64-bit integer.
    #[must_use]
    pub const fn i64() -> Self {
        Self::Int(64)
    }

    /// Pointer to `pointee`.
    #[must_use]
    pub fn ptr(pointee: IrType) -> Self {
        Self::Ptr(Box::new(pointee))
    }

    /// Array of `len` values of `element`.
    #[must_use]
    pub fn array(element: IrType, len: u64) -> Self {
        Self::Array(Box::new(element), len)
    }

    /// Returns the kind of this type.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        match self {
            Self::Void => TypeKind::Void,
            Self::Int(_) => TypeKind::Integer,
            Self::F32 => TypeKind::Float,
            Self::F64 => TypeKind::Double,
            Self::Ptr(_) => TypeKind::Pointer,
            Self::Array(..) => TypeKind::Array,
            Self::Struct(_) => TypeKind::Struct,
        }
    }

    /// Returns `true` for pointer types.
    #[must_use]
    pub const fn is_pointer(&self) -> bool {
        matches!(self, Self::Ptr(_))
    }

    /// Returns `true` for `void`.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Returns `true` if the type is exactly an integer, `f32` or `f64`.
    #[must_use]
    pub const fn is_plain_scalar(&self) -> bool {
        matches!(self, Self::Int(_) | Self::F32 | Self::F64)
    }

    /// Returns the pointee type of a pointer.
    #[must_use]
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            Self::Ptr(inner) => Some(inner),
            _ => None,
        }
    }

    /// Compares two types in the canonical signature order.
    #[must_use]
    pub fn canonical_cmp(&self, other: &IrType) -> Ordering {
        let by_kind = self.kind().rank().cmp(&other.kind().rank());
        if by_kind != Ordering::Equal {
            return by_kind;
        }

        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Ptr(a), Self::Ptr(b)) => a.canonical_cmp(b),
            (Self::Array(a, n), Self::Array(b, m)) => {
                a.canonical_cmp(b).then_with(|| n.cmp(m))
            }
            (Self::Struct(a), Self::Struct(b)) => {
                for (x, y) in a.iter().zip(b) {
                    let ord = x.canonical_cmp(y);
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::F32 => write!(f, "float"),
            Self::F64 => write!(f, "double"),
            Self::Ptr(inner) => write!(f, "{inner}*"),
            Self::Array(inner, len) => write!(f, "[{len} x {inner}]"),
            Self::Struct(fields) => {
                write!(f, "{{ ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, " }}")
            }
        }
    }
}
