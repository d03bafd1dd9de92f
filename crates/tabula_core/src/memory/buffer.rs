//! # Column Buffer
//!
//! Owned, growable byte storage for one column's payload.
//!
//! ```text
//! | row 0 | row 1 | ... | row len-1 | (reserved, zeroed) ... | capacity
//! ```
//!
//! Growth is copy-and-free: a new zeroed allocation is made, the live prefix
//! is copied across, and the old allocation is dropped. Any slice obtained
//! before a growing call is therefore invalid afterwards; the borrow checker
//! enforces this since every view borrows the buffer.

use bytemuck::{Pod, Zeroable};

/// Storage is allocated in 16-byte blocks so typed views of any element
/// with alignment <= 16 are always aligned.
const BLOCK_SIZE: usize = 16;

#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(16))]
struct Block([u8; BLOCK_SIZE]);

/// Type-erased, aligned, growable row storage.
///
/// # Example
///
/// ```rust,ignore
/// let mut buffer = ColumnBuffer::new(4);
/// buffer.reserve(10);
/// buffer.set_len(10);
/// buffer.as_mut_slice::<f32>()[3] = 1.5;
/// ```
#[derive(Clone)]
pub struct ColumnBuffer {
    /// Backing allocation.
    blocks: Vec<Block>,
    /// Bytes per row.
    stride: usize,
    /// Rows allocated.
    capacity: usize,
    /// Rows in use.
    len: usize,
}

impl ColumnBuffer {
    /// Creates an empty buffer for rows of `stride` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `stride` is zero.
    #[must_use]
    pub fn new(stride: usize) -> Self {
        assert!(stride > 0, "Row stride must be greater than zero");
        Self {
            blocks: Vec::new(),
            stride,
            capacity: 0,
            len: 0,
        }
    }

    /// Creates a buffer with `capacity` zeroed rows allocated.
    #[must_use]
    pub fn with_capacity(stride: usize, capacity: usize) -> Self {
        let mut buffer = Self::new(stride);
        buffer.reallocate(capacity);
        buffer
    }

    /// Bytes per row.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Rows allocated.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Rows in use.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether no rows are in use.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sets the number of rows in use.
    ///
    /// # Panics
    ///
    /// Panics if `len` exceeds the capacity.
    #[inline]
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.capacity, "Length {len} exceeds capacity {}", self.capacity);
        self.len = len;
    }

    /// Ensures room for `additional` rows past `len`, with
    /// doubling-or-exact-fit growth.
    ///
    /// Returns `true` if the buffer was reallocated.
    pub fn reserve(&mut self, additional: usize) -> bool {
        match crate::column::grown_capacity(self.capacity, self.len, additional) {
            Some(capacity) => {
                self.reallocate(capacity);
                true
            }
            None => false,
        }
    }

    /// Moves the live rows into a fresh allocation of exactly `capacity`
    /// rows and frees the old one.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is smaller than `len`.
    pub fn reallocate(&mut self, capacity: usize) {
        assert!(capacity >= self.len, "Cannot shrink below the live rows");
        let bytes = capacity * self.stride;
        let mut blocks = vec![Block::zeroed(); bytes.div_ceil(BLOCK_SIZE)];
        let live = self.len * self.stride;
        bytemuck::cast_slice_mut::<Block, u8>(&mut blocks)[..live]
            .copy_from_slice(&self.as_bytes()[..live]);
        self.blocks = blocks;
        self.capacity = capacity;
    }

    /// All allocated bytes, live and reserved.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<Block, u8>(&self.blocks)[..self.capacity * self.stride]
    }

    /// Mutable view of all allocated bytes.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let end = self.capacity * self.stride;
        &mut bytemuck::cast_slice_mut::<Block, u8>(&mut self.blocks)[..end]
    }

    /// Bytes of the live rows.
    #[inline]
    #[must_use]
    pub fn live_bytes(&self) -> &[u8] {
        &self.as_bytes()[..self.len * self.stride]
    }

    /// Bytes of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not below the capacity.
    #[inline]
    #[must_use]
    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.stride;
        &self.as_bytes()[start..start + self.stride]
    }

    /// Mutable bytes of one row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not below the capacity.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let start = row * self.stride;
        let stride = self.stride;
        &mut self.as_bytes_mut()[start..start + stride]
    }

    /// Copies row `src` over row `dst`.
    #[inline]
    pub fn copy_row(&mut self, src: usize, dst: usize) {
        let stride = self.stride;
        self.as_bytes_mut()
            .copy_within(src * stride..(src + 1) * stride, dst * stride);
    }

    /// Zeroes rows `start..end`.
    pub fn zero_rows(&mut self, start: usize, end: usize) {
        let stride = self.stride;
        self.as_bytes_mut()[start * stride..end * stride].fill(0);
    }

    /// Typed view of the live rows.
    ///
    /// The caller must have checked that `T` matches the stride.
    #[inline]
    #[must_use]
    pub fn as_slice<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(self.live_bytes())
    }

    /// Typed mutable view of every allocated row, including reserved ones.
    #[inline]
    pub fn as_mut_slice<T: Pod>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }

    /// Typed view of every allocated row.
    #[inline]
    #[must_use]
    pub fn as_full_slice<T: Pod>(&self) -> &[T] {
        bytemuck::cast_slice(self.as_bytes())
    }

    /// Heap bytes held.
    #[inline]
    #[must_use]
    pub fn size_in_bytes(&self) -> usize {
        self.blocks.len() * BLOCK_SIZE
    }
}

impl std::fmt::Debug for ColumnBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnBuffer")
            .field("stride", &self.stride)
            .field("len", &self.len)
            .field("capacity", &self.capacity)
            .finish()
    }
}
