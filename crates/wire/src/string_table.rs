use std::collections::HashMap;
use std::sync::Arc;

/// Interning table written into the batch header.
#[derive(Debug, Default)]
pub struct StringTable {
    entries: Vec<Arc<str>>,
    index: HashMap<Arc<str>, usize>,
    lookups: usize,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `s`, adding it on first sight.
    pub fn intern(&mut self, s: &str) -> usize {
        self.lookups += 1;
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let entry: Arc<str> = Arc::from(s);
        let i = self.entries.len();
        self.entries.push(Arc::clone(&entry));
        self.index.insert(entry, i);
        i
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `intern` calls, i.e. string operands written.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    pub fn entries(&self) -> &[Arc<str>] {
        &self.entries
    }

    pub fn write_header(&self, out: &mut Vec<u8>) {
        tools::leb128::write_usize(out, self.entries.len());
        for entry in &self.entries {
            tools::leb128::write_usize(out, entry.len());
            out.extend_from_slice(entry.as_bytes());
        }
    }
}
