//! # Element Types
//!
//! Columns are type-erased byte buffers. A [`TypeInfo`] records what lives in
//! them, and the [`Element`] trait is the closed set of types allowed in.
//!
//! Elements must be:
//! - `Pod`: plain old data, viewed in place through `bytemuck`
//! - `Send + Sync`: columns are read from fan-out tasks
//! - formattable: every element type knows how to print one cell

use std::fmt::{self, Write as _};
use std::mem;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::error::{SheetError, SheetResult};

/// Maximum characters printed per cell before truncation.
const MAX_CELL_CHARS: usize = 19;

/// A type that can be stored in a column.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Pod, Zeroable)]
/// #[repr(C)]
/// struct Heat(f32);
///
/// impl Element for Heat {
///     const NAME: &'static str = "heat";
///     fn fmt_cell(&self, out: &mut String) -> fmt::Result {
///         write!(out, "{:.1}C", self.0)
///     }
/// }
/// ```
pub trait Element: Pod + Send + Sync + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// Values of this type are ids into the same sheet.
    ///
    /// Columns of entity references cannot be compacted or shifted, since
    /// the stored ids would go stale.
    const IS_ENTITY_REF: bool = false;

    /// Appends a printable rendering of one cell.
    ///
    /// # Errors
    ///
    /// Propagates formatter errors.
    fn fmt_cell(&self, out: &mut String) -> fmt::Result;
}

macro_rules! scalar_element {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Element for $ty {
                const NAME: &'static str = $name;

                fn fmt_cell(&self, out: &mut String) -> fmt::Result {
                    write!(out, "{self}")
                }
            }
        )*
    };
}

scalar_element! {
    u8 => "u8", u16 => "u16", u32 => "u32", u64 => "u64",
    i8 => "i8", i16 => "i16", i32 => "i32", i64 => "i64",
    f32 => "f32", f64 => "f64",
}

macro_rules! vector_element {
    ($($n:literal => $name:literal),* $(,)?) => {
        $(
            impl Element for [f32; $n] {
                const NAME: &'static str = $name;

                fn fmt_cell(&self, out: &mut String) -> fmt::Result {
                    out.push('(');
                    for (i, v) in self.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        write!(out, "{v}")?;
                    }
                    out.push(')');
                    Ok(())
                }
            }
        )*
    };
}

vector_element! { 2 => "vec2", 3 => "vec3", 4 => "vec4" }

impl Element for EntityId {
    const NAME: &'static str = "entity";
    const IS_ENTITY_REF: bool = true;

    fn fmt_cell(&self, out: &mut String) -> fmt::Result {
        write!(out, "e{}", self.get())
    }
}

/// Runtime descriptor of a column's element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    name: &'static str,
    size: usize,
    align: usize,
    zeroed: bool,
    entity_ref: bool,
}

impl TypeInfo {
    /// Describes `T`.
    #[must_use]
    pub fn of<T: Element>() -> Self {
        Self {
            name: T::NAME,
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
            zeroed: false,
            entity_ref: T::IS_ENTITY_REF,
        }
    }

    /// Sets the zero-on-alloc flag: rows vacated by `pop`/`clear` are
    /// re-zeroed, so newly pushed rows always read as zero.
    #[must_use]
    pub const fn with_zeroed(mut self, zeroed: bool) -> Self {
        self.zeroed = zeroed;
        self
    }

    /// Element type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Element size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Element alignment in bytes.
    #[must_use]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Zero-on-alloc flag.
    #[must_use]
    pub const fn zeroed(&self) -> bool {
        self.zeroed
    }

    /// Whether the payload holds entity ids.
    #[must_use]
    pub const fn is_entity_ref(&self) -> bool {
        self.entity_ref
    }

    /// Checks that `T` has this descriptor's layout.
    ///
    /// # Errors
    ///
    /// [`SheetError::TypeMismatch`] when size or alignment differ.
    pub fn check<T: Element>(&self) -> SheetResult<()> {
        if mem::size_of::<T>() == self.size && mem::align_of::<T>() == self.align {
            Ok(())
        } else {
            Err(SheetError::TypeMismatch {
                expected: self.name,
                found: T::NAME,
            })
        }
    }
}

/// Payload shapes recognised in schema files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementType {
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `[f32; 2]`
    Vec2,
    /// `[f32; 3]`
    Vec3,
    /// `[f32; 4]`
    Vec4,
    /// [`EntityId`]
    Entity,
}

impl ElementType {
    /// Descriptor for this shape.
    #[must_use]
    pub fn type_info(self) -> TypeInfo {
        match self {
            Self::U8 => TypeInfo::of::<u8>(),
            Self::U16 => TypeInfo::of::<u16>(),
            Self::U32 => TypeInfo::of::<u32>(),
            Self::U64 => TypeInfo::of::<u64>(),
            Self::I8 => TypeInfo::of::<i8>(),
            Self::I16 => TypeInfo::of::<i16>(),
            Self::I32 => TypeInfo::of::<i32>(),
            Self::I64 => TypeInfo::of::<i64>(),
            Self::F32 => TypeInfo::of::<f32>(),
            Self::F64 => TypeInfo::of::<f64>(),
            Self::Vec2 => TypeInfo::of::<[f32; 2]>(),
            Self::Vec3 => TypeInfo::of::<[f32; 3]>(),
            Self::Vec4 => TypeInfo::of::<[f32; 4]>(),
            Self::Entity => TypeInfo::of::<EntityId>(),
        }
    }
}

/// Renders a run of cells, one per line, each cut to 19 characters.
pub struct CellsDisplay<'a, T: Element> {
    cells: &'a [T],
}

impl<'a, T: Element> CellsDisplay<'a, T> {
    pub(crate) fn new(cells: &'a [T]) -> Self {
        Self { cells }
    }
}

impl<T: Element> fmt::Display for CellsDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cell = String::new();
        for (i, value) in self.cells.iter().enumerate() {
            if i > 0 {
                f.write_char('\n')?;
            }
            cell.clear();
            value.fmt_cell(&mut cell)?;
            if cell.chars().count() > MAX_CELL_CHARS {
                let cut: String = cell.chars().take(MAX_CELL_CHARS).collect();
                write!(f, "{cut}...")?;
            } else {
                f.write_str(&cell)?;
            }
        }
        Ok(())
    }
}
