//! Items and bounded inventories.

use serde::{Deserialize, Serialize};

/// Everything that can be carried or dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Item {
    Carrot,
    Seeds,
    Wood,
    Planks,
    Stone,
    IronOre,
    Meat,
    Fur,
    Bones,
    Gold,
}

/// A stack of identical items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: Item,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: Item, count: u32) -> Self {
        Self { item, count }
    }
}

/// Maximum number of units in one stack.
pub const STACK_LIMIT: u32 = 99;

/// A bounded list of item stacks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    stacks: Vec<ItemStack>,
    capacity: usize,
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            stacks: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stacks(&self) -> &[ItemStack] {
        &self.stacks
    }

    pub fn is_empty(&self) -> bool {
        self.stacks.is_empty()
    }

    pub fn count(&self, item: Item) -> u32 {
        self.stacks
            .iter()
            .filter(|s| s.item == item)
            .map(|s| s.count)
            .sum()
    }

    /// Add items, filling existing stacks first. Returns how many did not fit.
    pub fn add(&mut self, item: Item, mut count: u32) -> u32 {
        for stack in self.stacks.iter_mut().filter(|s| s.item == item) {
            let room = STACK_LIMIT - stack.count.min(STACK_LIMIT);
            let moved = room.min(count);
            stack.count += moved;
            count -= moved;
            if count == 0 {
                return 0;
            }
        }
        while count > 0 && self.stacks.len() < self.capacity {
            let moved = count.min(STACK_LIMIT);
            self.stacks.push(ItemStack::new(item, moved));
            count -= moved;
        }
        count
    }

    /// Remove up to `count` items. Returns true only if all were available.
    pub fn remove(&mut self, item: Item, count: u32) -> bool {
        if self.count(item) < count {
            return false;
        }
        let mut left = count;
        for stack in self.stacks.iter_mut().rev().filter(|s| s.item == item) {
            let taken = stack.count.min(left);
            stack.count -= taken;
            left -= taken;
            if left == 0 {
                break;
            }
        }
        self.stacks.retain(|s| s.count > 0);
        true
    }

    /// Merge two inventories into one whose capacity covers both.
    pub fn union(a: &Inventory, b: &Inventory) -> Inventory {
        let mut merged = Inventory::with_capacity(a.capacity + b.capacity);
        for stack in a.stacks.iter().chain(b.stacks.iter()) {
            merged.add(stack.item, stack.count);
        }
        merged
    }

    /// Empty the inventory, returning its stacks.
    pub fn drain(&mut self) -> Vec<ItemStack> {
        std::mem::take(&mut self.stacks)
    }
}
