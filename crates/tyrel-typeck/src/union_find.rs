//! Equivalence classes of inference variables.
//!
//! Every [`IncompleteType`] the solver has seen belongs to one class. A
//! class has at most one binding (the type all its members stand for) and a
//! list of the relations that mention any of its members, so that a change
//! to the class can wake exactly those relations.

use rustc_hash::FxHashMap;
use tyrel_types::{IncompleteType, Kind, Ty};

#[derive(Clone, Debug)]
struct Slot {
    var: IncompleteType,
    parent: usize,
    rank: u8,
    /// Smallest-id member; only meaningful on roots.
    representative: IncompleteType,
    binding: Option<Ty>,
    users: Vec<usize>,
}

/// Union-find with path compression and union by rank.
#[derive(Clone, Debug, Default)]
pub(crate) struct VarClasses {
    index: FxHashMap<u32, usize>,
    slots: Vec<Slot>,
}

impl VarClasses {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers `var` if unseen; returns its slot.
    pub(crate) fn ensure(&mut self, var: IncompleteType) -> usize {
        if let Some(&slot) = self.index.get(&var.id) {
            return slot;
        }
        let slot = self.slots.len();
        self.slots.push(Slot {
            var,
            parent: slot,
            rank: 0,
            representative: var,
            binding: None,
            users: Vec::new(),
        });
        self.index.insert(var.id, slot);
        slot
    }

    /// The slot of a registered variable.
    pub(crate) fn slot_of(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub(crate) fn find(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.slots[root].parent != root {
            root = self.slots[root].parent;
        }
        let mut cur = slot;
        while self.slots[cur].parent != root {
            let next = self.slots[cur].parent;
            self.slots[cur].parent = root;
            cur = next;
        }
        root
    }

    /// Merges two unbound classes; returns the new root.
    pub(crate) fn union(&mut self, a: usize, b: usize) -> usize {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return ra;
        }
        let (root, child) = match self.slots[ra].rank.cmp(&self.slots[rb].rank) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => {
                self.slots[ra].rank = self.slots[ra].rank.saturating_add(1);
                (ra, rb)
            }
        };
        self.slots[child].parent = root;

        let child_users = std::mem::take(&mut self.slots[child].users);
        let child_rep = self.slots[child].representative;
        let child_binding = self.slots[child].binding.take();

        let root_slot = &mut self.slots[root];
        for user in child_users {
            if !root_slot.users.contains(&user) {
                root_slot.users.push(user);
            }
        }
        if child_rep.id < root_slot.representative.id {
            root_slot.representative = child_rep;
        }
        if root_slot.binding.is_none() {
            root_slot.binding = child_binding;
        }
        root
    }

    pub(crate) fn kind(&self, root: usize) -> Kind {
        self.slots[root].representative.kind
    }

    pub(crate) fn representative(&self, root: usize) -> IncompleteType {
        self.slots[root].representative
    }

    pub(crate) fn binding(&self, root: usize) -> Option<&Ty> {
        self.slots[root].binding.as_ref()
    }

    pub(crate) fn bind(&mut self, root: usize, ty: Ty) {
        self.slots[root].binding = Some(ty);
    }

    pub(crate) fn users(&self, root: usize) -> &[usize] {
        &self.slots[root].users
    }

    pub(crate) fn add_user(&mut self, root: usize, relation: usize) {
        let users = &mut self.slots[root].users;
        if !users.contains(&relation) {
            users.push(relation);
        }
    }

    /// Every registered variable, in registration order.
    pub(crate) fn vars(&self) -> impl Iterator<Item = IncompleteType> + '_ {
        self.slots.iter().map(|s| s.var)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
