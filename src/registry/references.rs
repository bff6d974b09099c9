//! Project-wide reference storage.

use crate::reference::Reference;
use crate::semantic::SemanticIndex;
use crate::types::FilePath;
use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct ReferenceRegistry {
    by_file: IndexMap<FilePath, Vec<Reference>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_file(&mut self, index: &SemanticIndex) {
        self.by_file
            .insert(index.file_path.clone(), index.references.clone());
    }

    pub fn remove_file(&mut self, file_path: &FilePath) {
        self.by_file.shift_remove(file_path);
    }

    /// References of a file, in source order.
    pub fn for_file(&self, file_path: &FilePath) -> &[Reference] {
        self.by_file
            .get(file_path)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn files(&self) -> impl Iterator<Item = &FilePath> {
        self.by_file.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.by_file.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::Language;
    use crate::semantic::index_source;

    #[test]
    fn stores_in_source_order_and_removes_cleanly() {
        let index = index_source("a.js", Language::JavaScript, "a();\nb();\n").unwrap();
        let mut registry = ReferenceRegistry::new();
        registry.update_file(&index);
        let refs = registry.for_file(&FilePath::from("a.js"));
        assert_eq!(refs.len(), 2);
        assert!(refs[0].location.start_line < refs[1].location.start_line);

        registry.remove_file(&FilePath::from("a.js"));
        assert!(registry.is_empty());
    }
}
