//! Compute-once caching primitives.
//!
//! All laziness in this crate is memoization: the first access to a field or
//! an indexed element pays the decode cost, every later access observes the
//! cached result. Factories are passed at the call site so that resolution
//! context (the owning [`ElfFile`](crate::ElfFile)) stays explicit instead of
//! being captured at construction time.

use crate::Result;
use core::cell::RefCell;
use std::rc::Rc;

/// A fixed-length, index-addressable cache over a fallible factory.
///
/// Elements are produced on first access and shared thereafter; `get` with
/// the same index always returns the identical `Rc`, so a factory runs at
/// most once per index for the lifetime of the array.
///
/// # Examples
/// ```
/// use elf_inspect::LazyArray;
///
/// let arr: LazyArray<u32> = LazyArray::new(4);
/// let a = arr.get(2, || Ok(42)).unwrap().unwrap();
/// let b = arr.get(2, || unreachable!()).unwrap().unwrap();
/// assert!(std::rc::Rc::ptr_eq(&a, &b));
/// assert!(arr.get(4, || Ok(0)).unwrap().is_none());
/// ```
pub struct LazyArray<T> {
    slots: RefCell<Vec<Option<Rc<T>>>>,
}

impl<T> LazyArray<T> {
    /// Creates an empty cache with `len` slots.
    pub fn new(len: usize) -> Self {
        Self {
            slots: RefCell::new(vec![None; len]),
        }
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    /// Returns `true` if the array has no slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the `n`-th element, invoking `init` if the slot is still
    /// empty. Out-of-range indices yield `Ok(None)` and never invoke `init`.
    ///
    /// The cache borrow is not held while `init` runs, so a factory may
    /// recursively access *other* indices of the same array.
    pub fn get<F>(&self, n: usize, init: F) -> Result<Option<Rc<T>>>
    where
        F: FnOnce() -> Result<T>,
    {
        if n >= self.len() {
            return Ok(None);
        }
        if let Some(cached) = self.slots.borrow()[n].clone() {
            return Ok(Some(cached));
        }
        let value = Rc::new(init()?);
        let mut slots = self.slots.borrow_mut();
        let slot = &mut slots[n];
        // A reentrant factory may have filled the slot in the meantime; the
        // first stored value wins so identity stays stable.
        if slot.is_none() {
            *slot = Some(value);
        }
        Ok(slot.clone())
    }

    /// Returns the cached element at `n` without computing anything.
    pub fn cached(&self, n: usize) -> Option<Rc<T>> {
        self.slots.borrow().get(n).and_then(Clone::clone)
    }
}

/// A compute-once cell for a single memoized field.
pub(crate) struct Memo<T> {
    slot: RefCell<Option<T>>,
}

impl<T: Clone> Memo<T> {
    pub(crate) fn new() -> Self {
        Self {
            slot: RefCell::new(None),
        }
    }

    /// Returns the cached value, computing and storing it on first access.
    pub(crate) fn get_or_try_init<F>(&self, init: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(cached) = self.slot.borrow().clone() {
            return Ok(cached);
        }
        let value = init()?;
        Ok(self
            .slot
            .borrow_mut()
            .get_or_insert_with(|| value)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[test]
    fn factory_runs_at_most_once_per_index() {
        let calls = Cell::new(0);
        let arr: LazyArray<usize> = LazyArray::new(3);
        for _ in 0..3 {
            let v = arr
                .get(1, || {
                    calls.set(calls.get() + 1);
                    Ok(10)
                })
                .unwrap()
                .unwrap();
            assert_eq!(*v, 10);
        }
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn out_of_range_is_absent() {
        let arr: LazyArray<u8> = LazyArray::new(2);
        assert!(arr.get(2, || Ok(0)).unwrap().is_none());
        assert!(arr.cached(5).is_none());
    }

    #[test]
    fn identity_is_stable() {
        let arr: LazyArray<String> = LazyArray::new(1);
        let a = arr.get(0, || Ok("x".into())).unwrap().unwrap();
        let b = arr.get(0, || Ok("y".into())).unwrap().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }

    #[test]
    fn factory_errors_are_not_cached() {
        let arr: LazyArray<u8> = LazyArray::new(1);
        assert!(
            arr.get(0, || Err(crate::Error::UnexpectedEof { offset: 0 }))
                .is_err()
        );
        // A later successful factory still populates the slot.
        assert_eq!(*arr.get(0, || Ok(7)).unwrap().unwrap(), 7);
    }

    #[test]
    fn memo_computes_once() {
        let calls = Cell::new(0);
        let memo: Memo<u32> = Memo::new();
        for _ in 0..2 {
            let v = memo
                .get_or_try_init(|| {
                    calls.set(calls.get() + 1);
                    Ok(9)
                })
                .unwrap();
            assert_eq!(v, 9);
        }
        assert_eq!(calls.get(), 1);
    }
}
