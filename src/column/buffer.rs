//! Reference-counted value buffers with zero-copy sub-views.

use std::ops::Deref;
use std::rc::Rc;

/// An immutable, shareable view over a contiguous run of `T`.
///
/// Cloning a buffer or slicing it never copies the values; both share the
/// same allocation. Writers go through [`Buffer::make_mut`], which copies the
/// viewed range first unless this view is the sole owner of the allocation.
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    data: Rc<[T]>,
    offset: usize,
    len: usize,
}

impl<T: Clone> Buffer<T> {
    pub fn from_vec(values: Vec<T>) -> Self {
        let len = values.len();
        Self {
            data: Rc::from(values),
            offset: 0,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[self.offset..self.offset + self.len]
    }

    /// Sub-view over `[start, end)` sharing the same allocation.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= self.len);
        Self {
            data: Rc::clone(&self.data),
            offset: self.offset + start,
            len: end - start,
        }
    }

    /// Whether another buffer or view still points at this allocation.
    pub fn is_shared(&self) -> bool {
        Rc::strong_count(&self.data) > 1
    }

    pub fn shares_allocation(&self, other: &Buffer<T>) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    /// Copy of the viewed range in a fresh allocation.
    pub fn deep_clone(&self) -> Self {
        Self::from_vec(self.as_slice().to_vec())
    }

    pub fn make_mut(&mut self) -> &mut [T] {
        let exclusive_full_view = self.offset == 0 && self.len == self.data.len();
        if !exclusive_full_view || Rc::get_mut(&mut self.data).is_none() {
            *self = self.deep_clone();
        }
        match Rc::get_mut(&mut self.data) {
            Some(slice) => slice,
            // A fresh allocation from deep_clone has exactly one owner.
            None => unreachable!("freshly copied buffer is uniquely owned"),
        }
    }
}

impl<T: Clone> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Clone> From<Vec<T>> for Buffer<T> {
    fn from(values: Vec<T>) -> Self {
        Self::from_vec(values)
    }
}
