//! Guest arrays

use parking_lot::RwLock;

use super::iterator::GuestIterator;
use crate::error::{InteropError, InteropResult};
use crate::interop::Interop;
use crate::value::Value;

/// Which mutations an array admits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayMode {
    /// Elements can only be read
    ReadOnly,
    /// Elements can be overwritten but the length never changes
    Fixed,
    /// Elements can be overwritten, appended and removed
    Resizable,
}

/// A guest array
pub struct GuestArray {
    elements: RwLock<Vec<Value>>,
    mode: ArrayMode,
}

impl GuestArray {
    /// Create an array with the given mutation mode
    pub fn new(elements: Vec<Value>, mode: ArrayMode) -> Self {
        Self {
            elements: RwLock::new(elements),
            mode,
        }
    }

    /// A resizable array, the usual guest list
    pub fn resizable(elements: Vec<Value>) -> Value {
        Value::new(Self::new(elements, ArrayMode::Resizable))
    }

    /// A fixed-length, writable array
    pub fn fixed(elements: Vec<Value>) -> Value {
        Value::new(Self::new(elements, ArrayMode::Fixed))
    }

    /// A read-only array
    pub fn read_only(elements: Vec<Value>) -> Value {
        Value::new(Self::new(elements, ArrayMode::ReadOnly))
    }

    /// Snapshot of the current elements
    pub fn snapshot(&self) -> Vec<Value> {
        self.elements.read().clone()
    }

    fn in_bounds(&self, index: i64) -> bool {
        index >= 0 && (index as usize) < self.elements.read().len()
    }
}

impl Interop for GuestArray {
    fn display_string(&self) -> String {
        let parts: Vec<String> = self
            .elements
            .read()
            .iter()
            .map(Value::display_string)
            .collect();
        format!("[{}]", parts.join(", "))
    }

    fn meta_name(&self) -> Option<String> {
        Some("Array".to_string())
    }

    fn has_array_elements(&self) -> bool {
        true
    }

    fn get_array_size(&self) -> InteropResult<i64> {
        Ok(self.elements.read().len() as i64)
    }

    fn is_array_element_readable(&self, index: i64) -> bool {
        self.in_bounds(index)
    }

    fn is_array_element_modifiable(&self, index: i64) -> bool {
        self.mode != ArrayMode::ReadOnly && self.in_bounds(index)
    }

    fn is_array_element_insertable(&self, index: i64) -> bool {
        self.mode == ArrayMode::Resizable && index == self.elements.read().len() as i64
    }

    fn is_array_element_removable(&self, index: i64) -> bool {
        self.mode == ArrayMode::Resizable && self.in_bounds(index)
    }

    fn read_array_element(&self, index: i64) -> InteropResult<Value> {
        if !self.in_bounds(index) {
            return Err(InteropError::InvalidArrayIndex(index));
        }
        Ok(self.elements.read()[index as usize].clone())
    }

    fn write_array_element(&self, index: i64, value: Value) -> InteropResult<()> {
        let mut elements = self.elements.write();
        let len = elements.len() as i64;
        if index < 0 || index > len || (index == len && self.mode != ArrayMode::Resizable) {
            return Err(InteropError::InvalidArrayIndex(index));
        }
        if self.mode == ArrayMode::ReadOnly {
            return Err(InteropError::unsupported("writeArrayElement"));
        }
        if index == len {
            elements.push(value);
        } else {
            elements[index as usize] = value;
        }
        Ok(())
    }

    fn remove_array_element(&self, index: i64) -> InteropResult<()> {
        let mut elements = self.elements.write();
        if index < 0 || index >= elements.len() as i64 {
            return Err(InteropError::InvalidArrayIndex(index));
        }
        if self.mode != ArrayMode::Resizable {
            return Err(InteropError::unsupported("removeArrayElement"));
        }
        elements.remove(index as usize);
        Ok(())
    }

    fn has_iterator(&self) -> bool {
        true
    }

    fn get_iterator(&self) -> InteropResult<Value> {
        Ok(Value::new(GuestIterator::new(self.snapshot())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i32]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    #[test]
    fn test_fixed_array_writes_but_never_removes() {
        let arr = GuestArray::fixed(ints(&[1, 2, 3]));
        assert!(arr.is_array_element_modifiable(1));
        assert!(!arr.is_array_element_removable(1));
        arr.write_array_element(1, Value::from(9)).unwrap();
        assert_eq!(arr.read_array_element(1).unwrap().as_int().unwrap(), 9);
        assert!(matches!(
            arr.remove_array_element(1),
            Err(InteropError::UnsupportedMessage(_))
        ));
        assert!(matches!(
            arr.write_array_element(3, Value::from(4)),
            Err(InteropError::InvalidArrayIndex(3))
        ));
    }

    #[test]
    fn test_resizable_array_appends_and_removes() {
        let arr = GuestArray::resizable(ints(&[1, 2]));
        assert!(arr.is_array_element_insertable(2));
        arr.write_array_element(2, Value::from(3)).unwrap();
        assert_eq!(arr.get_array_size().unwrap(), 3);
        arr.remove_array_element(0).unwrap();
        assert_eq!(arr.get_array_size().unwrap(), 2);
        assert_eq!(arr.read_array_element(0).unwrap().as_int().unwrap(), 2);
    }

    #[test]
    fn test_out_of_bounds_read() {
        let arr = GuestArray::read_only(ints(&[1]));
        assert!(matches!(
            arr.read_array_element(5),
            Err(InteropError::InvalidArrayIndex(5))
        ));
        assert!(matches!(
            arr.read_array_element(-1),
            Err(InteropError::InvalidArrayIndex(-1))
        ));
    }

    #[test]
    fn test_array_iterator() {
        let arr = GuestArray::resizable(ints(&[1, 2]));
        let it = arr.get_iterator().unwrap();
        assert_eq!(it.get_iterator_next_element().unwrap().as_int().unwrap(), 1);
        assert_eq!(it.get_iterator_next_element().unwrap().as_int().unwrap(), 2);
        assert!(!it.has_iterator_next_element().unwrap());
        assert!(matches!(
            it.get_iterator_next_element(),
            Err(InteropError::StopIteration)
        ));
    }
}
