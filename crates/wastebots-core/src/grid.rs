//! Bounded grid owning entity placement, zone bands and radioactivity.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::WorldStateError;
use crate::{Cell, PerTier, RobotId, Tier, WasteId};

/// Anything that can occupy a grid cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Entity {
    Robot(RobotId),
    Waste(WasteId),
    /// Immutable marker, exactly one per cell.
    Radioactivity,
    Disposal,
}

/// Contiguous band of columns `[start, start + width)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub tier: Tier,
    pub start: u32,
    pub width: u32,
    pub radioactivity: f32,
}

impl Zone {
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.start + self.width
    }

    #[must_use]
    pub const fn contains_column(&self, x: u32) -> bool {
        x >= self.start && x < self.end()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0
    }
}

/// Three zones ordered left to right by increasing tier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneLayout {
    zones: PerTier<Zone>,
}

impl ZoneLayout {
    #[must_use]
    pub fn new(widths: PerTier<u32>, radioactivity: PerTier<f32>) -> Self {
        let mut start = 0;
        let zones = widths.map(|tier, width| {
            let zone = Zone {
                tier,
                start,
                width,
                radioactivity: radioactivity[tier],
            };
            start += width;
            zone
        });
        Self { zones }
    }

    #[must_use]
    pub fn zone(&self, tier: Tier) -> &Zone {
        &self.zones[tier]
    }

    /// Zone covering column `x`, if any.
    #[must_use]
    pub fn zone_at(&self, x: u32) -> Option<&Zone> {
        Tier::ALL
            .into_iter()
            .map(|tier| &self.zones[tier])
            .find(|zone| zone.contains_column(x))
    }

    #[must_use]
    pub fn total_width(&self) -> u32 {
        self.zones.iter().map(|(_, zone)| zone.width).sum()
    }
}

type CellContents = SmallVec<[Entity; 4]>;

/// 2D grid storing an ordered multiset of entities per cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    width: u32,
    height: u32,
    zones: ZoneLayout,
    radioactivity: Vec<f32>,
    cells: Vec<CellContents>,
}

impl Grid {
    /// Construct a grid with one radioactivity marker per cell.
    pub fn new(width: u32, height: u32, zones: ZoneLayout) -> Result<Self, WorldStateError> {
        if width == 0 || height == 0 {
            return Err(WorldStateError::InvalidConfig(
                "grid dimensions must be non-zero",
            ));
        }
        if zones.total_width() != width {
            return Err(WorldStateError::InvalidConfig(
                "zone widths must sum to the grid width",
            ));
        }
        let len = (width as usize) * (height as usize);
        let mut radioactivity = Vec::with_capacity(len);
        for _y in 0..height {
            for x in 0..width {
                let level = zones.zone_at(x).map_or(0.0, |zone| zone.radioactivity);
                radioactivity.push(level);
            }
        }
        let mut marker = CellContents::new();
        marker.push(Entity::Radioactivity);
        Ok(Self {
            width,
            height,
            zones,
            radioactivity,
            cells: vec![marker; len],
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn zones(&self) -> &ZoneLayout {
        &self.zones
    }

    #[must_use]
    pub const fn in_bounds(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Returns the flat index for `cell` without bounds checks.
    #[inline]
    fn offset(&self, cell: Cell) -> usize {
        (cell.y as usize) * (self.width as usize) + (cell.x as usize)
    }

    /// Radioactivity fixed at initialisation; `None` outside the grid.
    #[must_use]
    pub fn radioactivity(&self, cell: Cell) -> Option<f32> {
        self.in_bounds(cell)
            .then(|| self.radioactivity[self.offset(cell)])
    }

    /// Entities on `cell` in insertion order.
    #[must_use]
    pub fn contents(&self, cell: Cell) -> &[Entity] {
        if self.in_bounds(cell) {
            &self.cells[self.offset(cell)]
        } else {
            &[]
        }
    }

    /// Place a movable entity on `cell`. Radioactivity markers cannot be added.
    pub fn place(&mut self, cell: Cell, entity: Entity) -> bool {
        if !self.in_bounds(cell) || matches!(entity, Entity::Radioactivity) {
            return false;
        }
        let idx = self.offset(cell);
        self.cells[idx].push(entity);
        true
    }

    /// Remove the first occurrence of `entity` from `cell`. Markers never move.
    pub fn remove(&mut self, cell: Cell, entity: Entity) -> bool {
        if !self.in_bounds(cell) || matches!(entity, Entity::Radioactivity) {
            return false;
        }
        let idx = self.offset(cell);
        let contents = &mut self.cells[idx];
        if let Some(pos) = contents.iter().position(|candidate| *candidate == entity) {
            contents.remove(pos);
            true
        } else {
            false
        }
    }

    /// Relocate `entity` from `from` to `to`.
    pub fn relocate(&mut self, from: Cell, to: Cell, entity: Entity) -> bool {
        if !self.in_bounds(to) || !self.remove(from, entity) {
            return false;
        }
        self.place(to, entity)
    }

    /// Moore neighbourhood of Chebyshev `radius` around `center`, clipped to the grid.
    pub fn neighborhood(
        &self,
        center: Cell,
        radius: u32,
        include_center: bool,
    ) -> impl Iterator<Item = Cell> + '_ {
        let min_x = center.x.saturating_sub(radius);
        let min_y = center.y.saturating_sub(radius);
        let max_x = center.x.saturating_add(radius).min(self.width.saturating_sub(1));
        let max_y = center
            .y
            .saturating_add(radius)
            .min(self.height.saturating_sub(1));
        (min_y..=max_y)
            .flat_map(move |y| (min_x..=max_x).map(move |x| Cell::new(x, y)))
            .filter(move |cell| include_center || *cell != center)
    }

    /// Entities in the neighbourhood of `center`, paired with their cell.
    pub fn neighbors(
        &self,
        center: Cell,
        radius: u32,
        include_center: bool,
    ) -> impl Iterator<Item = (Cell, Entity)> + '_ {
        self.neighborhood(center, radius, include_center)
            .flat_map(move |cell| self.contents(cell).iter().map(move |entity| (cell, *entity)))
    }

    /// Iterate every cell together with its contents.
    pub fn iter_cells(&self) -> impl Iterator<Item = (Cell, &[Entity])> + '_ {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(idx, contents)| {
            let idx = idx as u32;
            (Cell::new(idx % width, idx / width), contents.as_slice())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn layout(widths: PerTier<u32>) -> ZoneLayout {
        ZoneLayout::new(widths, PerTier::new(0.1, 0.5, 0.9))
    }

    #[test]
    fn zones_are_contiguous_left_to_right() {
        let zones = layout(PerTier::new(3, 2, 4));
        assert_eq!(zones.zone(Tier::Green).start, 0);
        assert_eq!(zones.zone(Tier::Yellow).start, 3);
        assert_eq!(zones.zone(Tier::Red).start, 5);
        assert_eq!(zones.zone(Tier::Red).end(), 9);
        assert_eq!(zones.zone_at(4).map(|z| z.tier), Some(Tier::Yellow));
        assert!(zones.zone_at(9).is_none());
    }

    #[test]
    fn every_cell_holds_one_marker() {
        let grid = Grid::new(4, 3, layout(PerTier::new(2, 1, 1))).expect("grid");
        for (_, contents) in grid.iter_cells() {
            let markers = contents
                .iter()
                .filter(|e| matches!(e, Entity::Radioactivity))
                .count();
            assert_eq!(markers, 1);
        }
        assert_eq!(grid.radioactivity(Cell::new(1, 2)), Some(0.1));
        assert_eq!(grid.radioactivity(Cell::new(2, 0)), Some(0.5));
        assert_eq!(grid.radioactivity(Cell::new(3, 0)), Some(0.9));
        assert_eq!(grid.radioactivity(Cell::new(4, 0)), None);
    }

    #[test]
    fn markers_cannot_be_moved() {
        let mut grid = Grid::new(2, 2, layout(PerTier::new(2, 0, 0))).expect("grid");
        assert!(!grid.remove(Cell::new(0, 0), Entity::Radioactivity));
        assert!(!grid.place(Cell::new(0, 0), Entity::Radioactivity));
        assert_eq!(grid.contents(Cell::new(0, 0)), &[Entity::Radioactivity]);
    }

    #[test]
    fn rejects_mismatched_zone_widths() {
        assert!(Grid::new(5, 2, layout(PerTier::new(1, 1, 1))).is_err());
    }

    #[test]
    fn moore_neighborhood_is_clipped_at_corners() {
        let grid = Grid::new(5, 5, layout(PerTier::new(5, 0, 0))).expect("grid");
        assert_eq!(grid.neighborhood(Cell::new(0, 0), 1, true).count(), 4);
        assert_eq!(grid.neighborhood(Cell::new(0, 0), 1, false).count(), 3);
        assert_eq!(grid.neighborhood(Cell::new(2, 2), 1, true).count(), 9);
        assert_eq!(grid.neighborhood(Cell::new(2, 2), 2, true).count(), 25);
    }

    #[test]
    fn relocate_moves_entities_between_cells() {
        let mut ids: SlotMap<WasteId, ()> = SlotMap::with_key();
        let waste = ids.insert(());
        let mut grid = Grid::new(3, 1, layout(PerTier::new(3, 0, 0))).expect("grid");
        let robot = Entity::Robot(RobotId(0));
        assert!(grid.place(Cell::new(0, 0), robot));
        assert!(grid.place(Cell::new(0, 0), Entity::Waste(waste)));
        assert!(grid.relocate(Cell::new(0, 0), Cell::new(1, 0), robot));
        assert_eq!(
            grid.contents(Cell::new(0, 0)),
            &[Entity::Radioactivity, Entity::Waste(waste)]
        );
        assert_eq!(grid.contents(Cell::new(1, 0)), &[Entity::Radioactivity, robot]);
        assert!(!grid.relocate(Cell::new(1, 0), Cell::new(5, 0), robot));
        assert_eq!(grid.neighbors(Cell::new(1, 0), 1, true).count(), 5);
    }
}
