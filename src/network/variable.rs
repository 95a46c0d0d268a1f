//! Variable arena for the statement network.

use std::fmt;

/// Stable handle into a [`VariableTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) u32);

impl VarId {
    /// Always 0.
    pub const ZERO: VarId = VarId(0);
    /// Always 1.
    pub const ONE: VarId = VarId(1);
    /// Left output, data rate.
    pub const LEFT: VarId = VarId(2);
    /// Right output, data rate.
    pub const RIGHT: VarId = VarId(3);

    /// Number of fixed slots at the front of every table.
    pub const FIXED: usize = 4;

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_fixed(self) -> bool {
        self.index() < Self::FIXED
    }

    pub fn is_constant(self) -> bool {
        self == Self::ZERO || self == Self::ONE
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    /// For split lifetimes, the variable this slot was carved out of.
    origin: Option<VarId>,
}

/// Named variable slots. Slots are only ever appended, so handles stay valid.
#[derive(Debug, Clone)]
pub struct VariableTable {
    slots: Vec<Slot>,
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableTable {
    pub fn new() -> Self {
        let fixed = ["zero", "one", "left", "right"];
        Self {
            slots: fixed
                .iter()
                .map(|name| Slot {
                    name: (*name).to_string(),
                    origin: None,
                })
                .collect(),
        }
    }

    /// Handle for `name`, appending a slot the first time it is seen.
    pub fn ensure(&mut self, name: &str) -> VarId {
        if let Some(id) = self.lookup(name) {
            return id;
        }
        self.push(name.to_string(), None)
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.slots
            .iter()
            .position(|s| s.origin.is_none() && s.name == name)
            .map(|i| VarId(i as u32))
    }

    /// New slot holding a separate lifetime of `of`.
    pub(crate) fn split(&mut self, of: VarId) -> VarId {
        let root = self.root(of);
        let copies = self.slots.iter().filter(|s| s.origin == Some(root)).count();
        let name = format!("{}'{}", self.slots[root.index()].name, copies + 1);
        self.push(name, Some(root))
    }

    /// The user-visible variable a split slot descends from.
    pub fn root(&self, id: VarId) -> VarId {
        self.slots
            .get(id.index())
            .and_then(|s| s.origin)
            .unwrap_or(id)
    }

    pub fn name(&self, id: VarId) -> Option<&str> {
        self.slots.get(id.index()).map(|s| s.name.as_str())
    }

    pub fn contains(&self, id: VarId) -> bool {
        id.index() < self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = VarId> {
        (0..self.slots.len() as u32).map(VarId)
    }

    fn push(&mut self, name: String, origin: Option<VarId>) -> VarId {
        let id = VarId(self.slots.len() as u32);
        self.slots.push(Slot { name, origin });
        id
    }
}
