//! Guest iterators and iterables

use std::iter::Peekable;

use parking_lot::{Mutex, RwLock};

use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;
use crate::value::Value;

type Source = Peekable<Box<dyn Iterator<Item = Value> + Send>>;

/// A single-pass guest iterator
pub struct GuestIterator {
    source: Mutex<Source>,
}

impl GuestIterator {
    /// Iterate over a fixed list of values
    pub fn new(items: Vec<Value>) -> Self {
        Self::lazy(items.into_iter())
    }

    /// Iterate over any sendable Rust iterator, pulled lazily
    pub fn lazy<I>(iter: I) -> Self
    where
        I: Iterator<Item = Value> + Send + 'static,
    {
        let boxed: Box<dyn Iterator<Item = Value> + Send> = Box::new(iter);
        Self {
            source: Mutex::new(boxed.peekable()),
        }
    }

    /// Wrap as a foreign value
    pub fn into_value(self) -> Value {
        Value::new(self)
    }
}

impl Interop for GuestIterator {
    fn display_string(&self) -> String {
        "[object Iterator]".to_string()
    }

    fn meta_name(&self) -> Option<String> {
        Some("Iterator".to_string())
    }

    fn is_iterator(&self) -> bool {
        true
    }

    fn has_iterator_next_element(&self) -> InteropResult<bool> {
        Ok(self.source.lock().peek().is_some())
    }

    fn get_iterator_next_element(&self) -> InteropResult<Value> {
        self.source.lock().next().ok_or(InteropError::StopIteration)
    }
}

/// A guest value that hands out a fresh iterator over its items each time
pub struct GuestIterable {
    items: RwLock<Vec<Value>>,
}

impl GuestIterable {
    /// Iterator over `items`
    pub fn new(items: Vec<Value>) -> Value {
        Value::new(Self {
            items: RwLock::new(items),
        })
    }
}

impl Interop for GuestIterable {
    fn display_string(&self) -> String {
        "[object Iterable]".to_string()
    }

    fn has_iterator(&self) -> bool {
        true
    }

    fn get_iterator(&self) -> InteropResult<Value> {
        Ok(GuestIterator::new(self.items.read().clone()).into_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_iterator() {
        let it = GuestIterator::lazy((0..3).map(Value::from)).into_value();
        let mut seen = Vec::new();
        while it.has_iterator_next_element().unwrap() {
            seen.push(it.get_iterator_next_element().unwrap().as_int().unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert!(matches!(
            it.get_iterator_next_element(),
            Err(InteropError::StopIteration)
        ));
    }

    #[test]
    fn test_iterable_is_restartable() {
        let iterable = GuestIterable::new(vec![Value::from(1)]);
        let a = iterable.get_iterator().unwrap();
        let b = iterable.get_iterator().unwrap();
        assert_eq!(a.get_iterator_next_element().unwrap().as_int().unwrap(), 1);
        assert!(b.has_iterator_next_element().unwrap());
    }
}
