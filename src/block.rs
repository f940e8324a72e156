use serde::{Deserialize, Serialize};
use std::fmt;

const AIR_BLOCKS: [&str; 3] = ["minecraft:air", "minecraft:cave_air", "minecraft:void_air"];

/// A concrete block state, e.g. `minecraft:iron_block` or
/// `compactcrafting:field_projector[facing=north]`.
///
/// Block types are opaque to the engine; only equality, the id and the
/// property list are ever inspected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockState(String);

impl BlockState {
    pub fn new(state: impl Into<String>) -> Self {
        Self(state.into())
    }

    pub fn air() -> Self {
        Self::new(AIR_BLOCKS[0])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Block id without the property list
    pub fn block_id(&self) -> &str {
        match self.0.find('[') {
            Some(idx) => &self.0[..idx],
            None => &self.0,
        }
    }

    /// Look up a single property value
    pub fn property(&self, name: &str) -> Option<&str> {
        let start = self.0.find('[')?;
        let props = self.0[start + 1..].strip_suffix(']')?;
        props.split(',').find_map(|kv| {
            let (key, value) = kv.split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
    }

    pub fn is_air(&self) -> bool {
        AIR_BLOCKS.contains(&self.block_id())
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_count() -> u32 {
    1
}

/// Item id plus count, used for catalysts and craft outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: impl Into<String>, count: u32) -> Self {
        Self {
            item: item.into(),
            count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0 || self.item.is_empty()
    }

    /// Same item and at least as many as `required`
    pub fn satisfies(&self, required: &ItemStack) -> bool {
        self.item == required.item && self.count >= required.count
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x {}", self.count, self.item)
    }
}
