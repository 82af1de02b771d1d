//! Memory Layouts
//!
//! A layout is a flattened list of typed fields with repeat counts. Each
//! entry starts at the running sum of the counts before it, so an index into
//! the layout addresses either a field or an element inside a repeated one.

use bier_common::{IrError, IrResult};
use serde::Serialize;

use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutEntry {
    pub ty: TypeId,
    pub count: usize,
}

impl LayoutEntry {
    pub fn new(ty: TypeId) -> Self {
        Self { ty, count: 1 }
    }

    pub fn array(ty: TypeId, count: usize) -> Self {
        Self { ty, count }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    entries: Vec<LayoutEntry>,
    offsets: Vec<usize>,
    name: Option<String>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[LayoutEntry]) -> Self {
        let mut layout = Self::new();
        for entry in entries {
            layout.add_entry(*entry);
        }
        layout
    }

    /// Append a single field, returning its offset
    pub fn add(&mut self, ty: TypeId) -> usize {
        self.add_entry(LayoutEntry::new(ty))
    }

    /// Append `count` repetitions of a field, returning the offset of the first one
    pub fn add_array(&mut self, ty: TypeId, count: usize) -> usize {
        self.add_entry(LayoutEntry::array(ty, count))
    }

    pub fn add_entry(&mut self, entry: LayoutEntry) -> usize {
        assert!(entry.count > 0, "layout entry must have a positive count");
        let offset = self.size();
        self.entries.push(entry);
        self.offsets.push(offset);
        offset
    }

    /// Flatten another layout's entries onto this one, returning the offset they start at
    pub fn add_layout(&mut self, other: &Layout) -> usize {
        let start = self.size();
        for entry in &other.entries {
            self.add_entry(*entry);
        }
        start
    }

    /// Type of the field covering `index`
    pub fn entry(&self, index: usize) -> IrResult<TypeId> {
        if index >= self.size() {
            return Err(IrError::out_of_bounds("layout", index, self.size()));
        }
        // Last entry starting at or before the index
        let position = self.offsets.partition_point(|&offset| offset <= index) - 1;
        Ok(self.entries[position].ty)
    }

    /// Base offset of entry `entry_index` plus an element offset inside it
    pub fn offset(&self, entry_index: usize, element_offset: usize) -> usize {
        self.offsets[entry_index] + element_offset
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Total span in elements
    pub fn size(&self) -> usize {
        match (self.offsets.last(), self.entries.last()) {
            (Some(offset), Some(entry)) => offset + entry.count,
            _ => 0,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeRegistry;

    fn sample(registry: &TypeRegistry) -> Layout {
        let mut layout = Layout::new();
        layout.add(registry.int1());
        layout.add_array(registry.int8(), 10);
        layout.add_array(registry.int16(), 3);
        layout.add_array(registry.ptr(), 2);
        layout
    }

    #[test]
    fn test_correct_on_border() {
        let registry = TypeRegistry::new();
        let layout = sample(&registry);

        assert_eq!(layout.entry(0), Ok(registry.int1()));
        assert_eq!(layout.entry(1), Ok(registry.int8()));
        assert_eq!(layout.entry(11), Ok(registry.int16()));
        assert_eq!(layout.entry(14), Ok(registry.ptr()));
    }

    #[test]
    fn test_correct_between_border() {
        let registry = TypeRegistry::new();
        let layout = sample(&registry);

        assert_eq!(layout.entry(2), Ok(registry.int8()));
        assert_eq!(layout.entry(10), Ok(registry.int8()));
        assert_eq!(layout.entry(13), Ok(registry.int16()));
        assert_eq!(layout.entry(15), Ok(registry.ptr()));
        assert_eq!(
            layout.entry(16),
            Err(IrError::out_of_bounds("layout", 16, 16))
        );
    }

    #[test]
    fn test_offsets_are_contiguous() {
        let registry = TypeRegistry::new();
        let layout = sample(&registry);

        assert_eq!(layout.offsets(), &[0, 1, 11, 14]);
        assert_eq!(layout.size(), 16);
        assert_eq!(layout.offset(1, 4), 5);
        assert_eq!(layout.offset(3, 0), 14);
    }

    #[test]
    fn test_add_returns_offsets() {
        let registry = TypeRegistry::new();
        let mut layout = Layout::new();
        assert_eq!(layout.add(registry.int32()), 0);
        assert_eq!(layout.add_array(registry.int8(), 4), 1);
        assert_eq!(layout.add(registry.int64()), 5);
    }

    #[test]
    fn test_flatten_layout() {
        let registry = TypeRegistry::new();
        let inner = Layout::from_entries(&[
            LayoutEntry::new(registry.int32()),
            LayoutEntry::array(registry.int8(), 2),
        ]);

        let mut outer = Layout::new();
        outer.add(registry.int64());
        assert_eq!(outer.add_layout(&inner), 1);

        assert_eq!(outer.entries().len(), 3);
        assert_eq!(outer.size(), 4);
        assert_eq!(outer.entry(1), Ok(registry.int32()));
        assert_eq!(outer.entry(3), Ok(registry.int8()));
    }

    #[test]
    fn test_empty_layout() {
        let layout = Layout::new();
        assert_eq!(layout.size(), 0);
        assert!(layout.entry(0).is_err());
    }
}
