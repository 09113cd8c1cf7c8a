//! Numeric field arrays
//!
//! Row-major storage for per-particle quantities. A field holds either one
//! value per particle, shape `(rows,)`, or a fixed-width vector per particle,
//! shape `(rows, components)`. Rows are particles; every slicing operation
//! works on whole rows.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapshotError};

// =============================================================================
// Element Kinds
// =============================================================================

/// Scalar element kind of an array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    F64,
    F32,
    I64,
    I32,
    U64,
    U32,
}

// =============================================================================
// Shape
// =============================================================================

/// Array shape: particle rows plus an optional per-particle component count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    /// Number of particles
    pub rows: usize,
    /// Second dimension; `None` for one value per particle
    pub components: Option<usize>,
}

impl Shape {
    /// One value per particle: `(rows,)`
    pub fn scalar(rows: usize) -> Self {
        Self {
            rows,
            components: None,
        }
    }

    /// Fixed-width vector per particle: `(rows, components)`
    pub fn vector(rows: usize, components: usize) -> Self {
        Self {
            rows,
            components: Some(components),
        }
    }

    /// True when the second dimension exists and is positive
    pub fn is_vector(&self) -> bool {
        matches!(self.components, Some(c) if c > 0)
    }

    /// Elements per row
    pub fn row_width(&self) -> usize {
        self.components.unwrap_or(1)
    }

    /// Total element count
    pub fn element_count(&self) -> usize {
        self.rows * self.row_width()
    }

    /// Same trailing dimension, different row count
    pub fn with_rows(self, rows: usize) -> Self {
        Self { rows, ..self }
    }
}

// =============================================================================
// Array Data
// =============================================================================

/// Flat element buffer tagged with its element kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayData {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    U32(Vec<u32>),
}

/// Evaluate `$body` with `$v` bound to the inner vector, whatever its kind
macro_rules! with_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::F64($v) => $body,
            ArrayData::F32($v) => $body,
            ArrayData::I64($v) => $body,
            ArrayData::I32($v) => $body,
            ArrayData::U64($v) => $body,
            ArrayData::U32($v) => $body,
        }
    };
}

/// Build new data of the same kind from `$body`
macro_rules! map_vec {
    ($data:expr, $v:ident => $body:expr) => {
        match $data {
            ArrayData::F64($v) => ArrayData::F64($body),
            ArrayData::F32($v) => ArrayData::F32($body),
            ArrayData::I64($v) => ArrayData::I64($body),
            ArrayData::I32($v) => ArrayData::I32($body),
            ArrayData::U64($v) => ArrayData::U64($body),
            ArrayData::U32($v) => ArrayData::U32($body),
        }
    };
}

/// Copy `$src` into the `$dst` slice, casting every element to `$t`
macro_rules! cast_from {
    ($dst:expr, $src:expr, $t:ty) => {
        match $src {
            ArrayData::F64(s) => cast_copy($dst, s, |x| x as $t),
            ArrayData::F32(s) => cast_copy($dst, s, |x| x as $t),
            ArrayData::I64(s) => cast_copy($dst, s, |x| x as $t),
            ArrayData::I32(s) => cast_copy($dst, s, |x| x as $t),
            ArrayData::U64(s) => cast_copy($dst, s, |x| x as $t),
            ArrayData::U32(s) => cast_copy($dst, s, |x| x as $t),
        }
    };
}

fn cast_copy<S: Copy, D>(dst: &mut [D], src: &[S], cast: impl Fn(S) -> D) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = cast(*s);
    }
}

impl ArrayData {
    /// Zero-filled buffer of `len` elements
    pub fn zeros(kind: ElementKind, len: usize) -> Self {
        match kind {
            ElementKind::F64 => ArrayData::F64(vec![0.0; len]),
            ElementKind::F32 => ArrayData::F32(vec![0.0; len]),
            ElementKind::I64 => ArrayData::I64(vec![0; len]),
            ElementKind::I32 => ArrayData::I32(vec![0; len]),
            ElementKind::U64 => ArrayData::U64(vec![0; len]),
            ElementKind::U32 => ArrayData::U32(vec![0; len]),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            ArrayData::F64(_) => ElementKind::F64,
            ArrayData::F32(_) => ElementKind::F32,
            ArrayData::I64(_) => ElementKind::I64,
            ArrayData::I32(_) => ElementKind::I32,
            ArrayData::U64(_) => ElementKind::U64,
            ArrayData::U32(_) => ElementKind::U32,
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        with_vec!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the elements in `range`
    fn slice(&self, range: Range<usize>) -> Self {
        map_vec!(self, v => v[range].to_vec())
    }

    /// Overwrite elements starting at `start` with `src`, casting into this kind
    fn write_at(&mut self, start: usize, src: &ArrayData) {
        let end = start + src.len();
        match self {
            ArrayData::F64(d) => cast_from!(&mut d[start..end], src, f64),
            ArrayData::F32(d) => cast_from!(&mut d[start..end], src, f32),
            ArrayData::I64(d) => cast_from!(&mut d[start..end], src, i64),
            ArrayData::I32(d) => cast_from!(&mut d[start..end], src, i32),
            ArrayData::U64(d) => cast_from!(&mut d[start..end], src, u64),
            ArrayData::U32(d) => cast_from!(&mut d[start..end], src, u32),
        }
    }

    /// All elements widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        let mut out = vec![0.0; self.len()];
        cast_from!(&mut out[..], self, f64);
        out
    }
}

macro_rules! impl_from_vec {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$t>> for ArrayData {
                fn from(v: Vec<$t>) -> Self {
                    ArrayData::$variant(v)
                }
            }

            impl From<Vec<$t>> for Array {
                fn from(v: Vec<$t>) -> Self {
                    Array::scalar(v)
                }
            }
        )*
    };
}

impl_from_vec!(f64 => F64, f32 => F32, i64 => I64, i32 => I32, u64 => U64, u32 => U32);

// =============================================================================
// Array
// =============================================================================

/// A per-particle field: shape plus a flat row-major buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    shape: Shape,
    data: ArrayData,
}

impl Array {
    /// Create an array, checking the buffer length against the shape
    pub fn new(shape: Shape, data: ArrayData) -> Result<Self> {
        if data.len() != shape.element_count() {
            return Err(SnapshotError::InvalidArgument(format!(
                "buffer of {} elements does not fit shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    /// One value per particle
    pub fn scalar(data: impl Into<ArrayData>) -> Self {
        let data = data.into();
        Self {
            shape: Shape::scalar(data.len()),
            data,
        }
    }

    /// `components` values per particle, row-major
    pub fn vector(data: impl Into<ArrayData>, components: usize) -> Result<Self> {
        let data = data.into();
        if components == 0 || data.len() % components != 0 {
            return Err(SnapshotError::InvalidArgument(format!(
                "{} elements cannot form rows of {} components",
                data.len(),
                components
            )));
        }
        Ok(Self {
            shape: Shape::vector(data.len() / components, components),
            data,
        })
    }

    /// Zero-filled array
    pub fn zeros(shape: Shape, kind: ElementKind) -> Self {
        Self {
            shape,
            data: ArrayData::zeros(kind, shape.element_count()),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Leading dimension (particle count)
    pub fn rows(&self) -> usize {
        self.shape.rows
    }

    pub fn components(&self) -> Option<usize> {
        self.shape.components
    }

    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    /// Copy of the rows in `rows`
    pub fn slice_rows(&self, rows: Range<usize>) -> Result<Array> {
        if rows.start > rows.end || rows.end > self.shape.rows {
            return Err(SnapshotError::CountMismatch(format!(
                "row range {}..{} outside array of {} rows",
                rows.start, rows.end, self.shape.rows
            )));
        }
        let width = self.shape.row_width();
        Ok(Array {
            shape: self.shape.with_rows(rows.end - rows.start),
            data: self.data.slice(rows.start * width..rows.end * width),
        })
    }

    /// Overwrite rows `[offset, offset + src.rows())` with `src`
    ///
    /// The element kind of `self` is kept; `src` values are cast into it.
    pub fn assign_rows(&mut self, offset: usize, src: &Array) -> Result<()> {
        if src.shape.row_width() != self.shape.row_width() {
            return Err(SnapshotError::ShapeInference(format!(
                "cannot copy rows of width {} into rows of width {}",
                src.shape.row_width(),
                self.shape.row_width()
            )));
        }
        let fits = offset
            .checked_add(src.shape.rows)
            .map_or(false, |end| end <= self.shape.rows);
        if !fits {
            return Err(SnapshotError::CountMismatch(format!(
                "{} rows at offset {} overrun array of {} rows",
                src.shape.rows, offset, self.shape.rows
            )));
        }
        self.data.write_at(offset * self.shape.row_width(), &src.data);
        Ok(())
    }

    /// All elements widened to f64
    pub fn to_f64_vec(&self) -> Vec<f64> {
        self.data.to_f64_vec()
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ArrayData::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<&[u64]> {
        match &self.data {
            ArrayData::U64(v) => Some(v),
            _ => None,
        }
    }
}
