/// Ordered set of indirect-object numbers met while rendering. Insertion
/// order is preserved so the closure pass can walk entries in the order they
/// were discovered; a linear membership scan matches the small sets a single
/// page produces.
#[derive(Debug, Default)]
pub struct IndirectSet {
    ids: Vec<u32>,
}

impl IndirectSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id` if it is not already present. Returns whether it was
    /// added.
    pub fn insert(&mut self, id: u32) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    pub fn contains(&self, id: u32) -> bool {
        self.ids.iter().any(|&v| v == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<u32> {
        self.ids.get(idx).copied()
    }

    pub fn sort(&mut self) {
        self.ids.sort_unstable();
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.ids.iter().copied()
    }
}
