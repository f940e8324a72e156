use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

pub const CHUNK_SIZE: i32 = 16;

/// Integer block position, used both for absolute world coordinates and for
/// layer-relative template coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: BlockPos = BlockPos { x: 0, y: 0, z: 0 };

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Move `distance` blocks in a horizontal direction
    pub fn relative(&self, direction: Direction, distance: i32) -> Self {
        let (dx, dz) = direction.offset();
        self.offset(dx * distance, 0, dz * distance)
    }
}

impl Add for BlockPos {
    type Output = BlockPos;

    fn add(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for BlockPos {
    type Output = BlockPos;

    fn sub(self, rhs: BlockPos) -> BlockPos {
        BlockPos::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Size of a box along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Dimensions {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn volume(&self) -> i64 {
        self.x as i64 * self.y as i64 * self.z as i64
    }
}

/// Chunk column coordinates in the world grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Convert a block position to the chunk containing it
    pub fn from_block(pos: BlockPos) -> Self {
        Self {
            x: pos.x.div_euclid(CHUNK_SIZE),
            z: pos.z.div_euclid(CHUNK_SIZE),
        }
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        ChunkPos::from_block(pos) == *self
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

/// Axis-aligned box of block positions. `min` is inclusive, `max` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockRegion {
    pub min: BlockPos,
    pub max: BlockPos,
}

impl BlockRegion {
    /// Build a region from two corners, sorting each axis
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Cube of edge `2 * radius + 1` centered on `center`
    pub fn around(center: BlockPos, radius: i32) -> Self {
        Self::new(
            center.offset(-radius, -radius, -radius),
            center.offset(radius + 1, radius + 1, radius + 1),
        )
    }

    pub fn size_x(&self) -> i32 {
        self.max.x - self.min.x
    }

    pub fn size_y(&self) -> i32 {
        self.max.y - self.min.y
    }

    pub fn size_z(&self) -> i32 {
        self.max.z - self.min.z
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.size_x(), self.size_y(), self.size_z())
    }

    pub fn volume(&self) -> i64 {
        self.dimensions().volume()
    }

    pub fn contains(&self, pos: BlockPos) -> bool {
        pos.x >= self.min.x
            && pos.x < self.max.x
            && pos.y >= self.min.y
            && pos.y < self.max.y
            && pos.z >= self.min.z
            && pos.z < self.max.z
    }

    /// Every position inside the region, bottom layer first, then rows along z
    pub fn positions(&self) -> impl Iterator<Item = BlockPos> + use<> {
        let (min, max) = (self.min, self.max);
        (min.y..max.y).flat_map(move |y| {
            (min.z..max.z).flat_map(move |z| (min.x..max.x).map(move |x| BlockPos::new(x, y, z)))
        })
    }

    /// One-block-high slice at relative height `index`
    pub fn layer(&self, index: i32) -> Option<BlockRegion> {
        if index < 0 || index >= self.size_y() {
            return None;
        }
        let y = self.min.y + index;
        Some(BlockRegion {
            min: BlockPos::new(self.min.x, y, self.min.z),
            max: BlockPos::new(self.max.x, y + 1, self.max.z),
        })
    }

    /// Sub-region with the given x/z footprint centered in this region.
    /// Odd leftovers are placed toward `min`. Returns `None` if the footprint does not fit.
    pub fn centered_footprint(&self, x_size: i32, z_size: i32) -> Option<BlockRegion> {
        if x_size > self.size_x() || z_size > self.size_z() || x_size < 0 || z_size < 0 {
            return None;
        }
        let dx = (self.size_x() - x_size) / 2;
        let dz = (self.size_z() - z_size) / 2;
        let min = self.min.offset(dx, 0, dz);
        Some(BlockRegion {
            min,
            max: BlockPos::new(min.x + x_size, self.max.y, min.z + z_size),
        })
    }
}

/// Horizontal facing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// (dx, dz) unit step. North is -z, east is +x.
    pub fn offset(&self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    /// Parse a `facing` property value
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "north" => Ok(Direction::North),
            "south" => Ok(Direction::South),
            "east" => Ok(Direction::East),
            "west" => Ok(Direction::West),
            _ => Err(format!("Unknown direction '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_from_block() {
        assert_eq!(ChunkPos::from_block(BlockPos::new(0, 64, 0)), ChunkPos::new(0, 0));
        assert_eq!(ChunkPos::from_block(BlockPos::new(15, 0, 15)), ChunkPos::new(0, 0));
        assert_eq!(ChunkPos::from_block(BlockPos::new(16, 0, 0)), ChunkPos::new(1, 0));
        assert_eq!(ChunkPos::from_block(BlockPos::new(-1, 0, 0)), ChunkPos::new(-1, 0));
        assert_eq!(ChunkPos::from_block(BlockPos::new(-16, 0, -17)), ChunkPos::new(-1, -2));
    }

    #[test]
    fn test_region_around() {
        let region = BlockRegion::around(BlockPos::new(10, 5, -3), 1);
        assert_eq!(region.min, BlockPos::new(9, 4, -4));
        assert_eq!(region.max, BlockPos::new(12, 7, -1));
        assert_eq!(region.dimensions(), Dimensions::new(3, 3, 3));
        assert_eq!(region.volume(), 27);
        assert!(region.contains(BlockPos::new(11, 6, -2)));
        assert!(!region.contains(BlockPos::new(12, 6, -2)));
    }

    #[test]
    fn test_region_positions_order() {
        let region = BlockRegion::new(BlockPos::ORIGIN, BlockPos::new(2, 2, 1));
        let positions: Vec<BlockPos> = region.positions().collect();
        assert_eq!(
            positions,
            vec![
                BlockPos::new(0, 0, 0),
                BlockPos::new(1, 0, 0),
                BlockPos::new(0, 1, 0),
                BlockPos::new(1, 1, 0),
            ]
        );
    }

    #[test]
    fn test_region_layer() {
        let region = BlockRegion::around(BlockPos::ORIGIN, 1);
        let bottom = region.layer(0).unwrap();
        assert_eq!(bottom.min.y, -1);
        assert_eq!(bottom.size_y(), 1);
        assert_eq!(bottom.size_x(), 3);
        assert!(region.layer(3).is_none());
        assert!(region.layer(-1).is_none());
    }

    #[test]
    fn test_centered_footprint() {
        let slice = BlockRegion::new(BlockPos::ORIGIN, BlockPos::new(5, 1, 5));
        let centered = slice.centered_footprint(3, 1).unwrap();
        assert_eq!(centered.min, BlockPos::new(1, 0, 2));
        assert_eq!(centered.max, BlockPos::new(4, 1, 3));

        // Even leftover rounds toward min
        let centered = slice.centered_footprint(2, 2).unwrap();
        assert_eq!(centered.min, BlockPos::new(1, 0, 1));

        assert!(slice.centered_footprint(6, 1).is_none());
    }

    #[test]
    fn test_direction_relative() {
        let pos = BlockPos::new(0, 0, 0);
        assert_eq!(pos.relative(Direction::North, 3), BlockPos::new(0, 0, -3));
        assert_eq!(pos.relative(Direction::East, 2), BlockPos::new(2, 0, 0));
        assert_eq!(Direction::West.opposite(), Direction::East);
        assert_eq!("south".parse::<Direction>(), Ok(Direction::South));
        assert!("up".parse::<Direction>().is_err());
    }
}
