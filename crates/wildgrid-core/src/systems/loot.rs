//! Items lying on the ground, per zone and cell.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wildgrid_logic::items::{Inventory, ItemStack};

use crate::components::{CellPos, ZoneCoord};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DroppedItems {
    by_zone: BTreeMap<ZoneCoord, BTreeMap<CellPos, Vec<ItemStack>>>,
}

impl DroppedItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drop_stack(&mut self, zone: ZoneCoord, cell: CellPos, stack: ItemStack) {
        if stack.count == 0 {
            return;
        }
        let pile = self.by_zone.entry(zone).or_default().entry(cell).or_default();
        match pile.iter_mut().find(|s| s.item == stack.item) {
            Some(existing) => existing.count += stack.count,
            None => pile.push(stack),
        }
    }

    pub fn at(&self, zone: ZoneCoord, cell: CellPos) -> &[ItemStack] {
        self.by_zone
            .get(&zone)
            .and_then(|cells| cells.get(&cell))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Cells in a zone that hold items.
    pub fn in_zone(&self, zone: ZoneCoord) -> impl Iterator<Item = (&CellPos, &Vec<ItemStack>)> {
        self.by_zone.get(&zone).into_iter().flat_map(|cells| cells.iter())
    }

    /// Move what fits from the pile into `inventory`. Returns the number
    /// of items picked up; anything that does not fit stays on the ground.
    pub fn pick_up(&mut self, zone: ZoneCoord, cell: CellPos, inventory: &mut Inventory) -> u32 {
        let Some(cells) = self.by_zone.get_mut(&zone) else {
            return 0;
        };
        let Some(pile) = cells.remove(&cell) else {
            return 0;
        };

        let mut taken = 0;
        let mut left = Vec::new();
        for stack in pile {
            let overflow = inventory.add(stack.item, stack.count);
            taken += stack.count - overflow;
            if overflow > 0 {
                left.push(ItemStack::new(stack.item, overflow));
            }
        }
        if !left.is_empty() {
            cells.insert(cell, left);
        }
        if cells.is_empty() {
            self.by_zone.remove(&zone);
        }
        taken
    }

    pub fn total_stacks(&self) -> usize {
        self.by_zone
            .values()
            .flat_map(|cells| cells.values())
            .map(Vec::len)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wildgrid_logic::items::Item;

    #[test]
    fn drops_merge_by_item() {
        let mut dropped = DroppedItems::new();
        let (z, c) = (ZoneCoord::ORIGIN, CellPos::new(3, 3));
        dropped.drop_stack(z, c, ItemStack::new(Item::Meat, 2));
        dropped.drop_stack(z, c, ItemStack::new(Item::Meat, 1));
        dropped.drop_stack(z, c, ItemStack::new(Item::Fur, 1));
        assert_eq!(dropped.at(z, c).len(), 2);
        assert_eq!(dropped.at(z, c)[0].count, 3);
    }

    #[test]
    fn pick_up_leaves_overflow() {
        let mut dropped = DroppedItems::new();
        let (z, c) = (ZoneCoord::ORIGIN, CellPos::new(3, 3));
        dropped.drop_stack(z, c, ItemStack::new(Item::Wood, 5));
        dropped.drop_stack(z, c, ItemStack::new(Item::Stone, 5));

        let mut inv = Inventory::with_capacity(1);
        assert_eq!(dropped.pick_up(z, c, &mut inv), 5);
        assert_eq!(inv.count(Item::Wood), 5);
        assert_eq!(dropped.at(z, c).len(), 1);
        assert_eq!(dropped.at(z, c)[0].item, Item::Stone);
    }
}
