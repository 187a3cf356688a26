//! Single-writer, many-reader snapshot slot.

use parking_lot::RwLock;
use std::sync::Arc;

/// Holds the latest published value. Readers get an `Arc` to a complete
/// value; publishing swaps the pointer, so nobody sees a partial update.
#[derive(Debug)]
pub struct Published<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Published<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.read().clone()
    }

    pub fn publish(&self, value: Arc<T>) {
        *self.slot.write() = Some(value);
    }

    pub fn clear(&self) {
        *self.slot.write() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.read().is_none()
    }
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self::new()
    }
}
