//! Field sizes and projector shell detection

use serde::{Deserialize, Serialize};

use crate::pos::{BlockPos, BlockRegion, Direction};
use crate::world::WorldView;

/// Supported field sizes. A field of radius `r` is a cube of edge `2r + 1`,
/// with its four projectors `2r + 1` blocks from the center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSize {
    Small,
    Medium,
    Large,
    Absurd,
}

impl FieldSize {
    pub const ALL: [FieldSize; 4] = [
        FieldSize::Small,
        FieldSize::Medium,
        FieldSize::Large,
        FieldSize::Absurd,
    ];

    pub fn radius(&self) -> i32 {
        match self {
            FieldSize::Small => 1,
            FieldSize::Medium => 2,
            FieldSize::Large => 3,
            FieldSize::Absurd => 4,
        }
    }

    /// Edge length of the field cube
    pub fn dimensions(&self) -> i32 {
        self.radius() * 2 + 1
    }

    pub fn projector_distance(&self) -> i32 {
        self.radius() * 2 + 1
    }

    pub fn region_around(&self, center: BlockPos) -> BlockRegion {
        BlockRegion::around(center, self.radius())
    }

    /// Where the four projectors sit, paired with the facing that points at the center
    pub fn projector_positions(&self, center: BlockPos) -> [(BlockPos, Direction); 4] {
        Direction::HORIZONTAL.map(|dir| {
            (
                center.relative(dir, self.projector_distance()),
                dir.opposite(),
            )
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldSize::Small => "small",
            FieldSize::Medium => "medium",
            FieldSize::Large => "large",
            FieldSize::Absurd => "absurd",
        }
    }
}

fn is_projector<W: WorldView + ?Sized>(
    world: &W,
    pos: BlockPos,
    facing: Direction,
    projector_block: &str,
) -> bool {
    world.block_state(pos).is_some_and(|state| {
        state.block_id() == projector_block && state.property("facing") == Some(facing.as_str())
    })
}

/// Structure scan from a single projector.
///
/// Tries every size, smallest first, and returns the field center once all
/// four projectors are in place and facing it.
pub fn find_field<W: WorldView + ?Sized>(
    world: &W,
    projector: BlockPos,
    facing: Direction,
    projector_block: &str,
) -> Option<(BlockPos, FieldSize)> {
    if !is_projector(world, projector, facing, projector_block) {
        return None;
    }

    FieldSize::ALL.into_iter().find_map(|size| {
        let center = projector.relative(facing, size.projector_distance());
        is_shell_intact(world, center, size, projector_block).then_some((center, size))
    })
}

/// True while all four projectors of a field are present and facing its center
pub fn is_shell_intact<W: WorldView + ?Sized>(
    world: &W,
    center: BlockPos,
    size: FieldSize,
    projector_block: &str,
) -> bool {
    size.projector_positions(center)
        .iter()
        .all(|(pos, facing)| is_projector(world, *pos, *facing, projector_block))
}
