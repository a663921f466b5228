//! Land/sea masking.
//!
//! Two sources drive masking: a quad-tree index that classifies whole tiles
//! as sea, land or mixed, and mask tile images whose chosen channel marks
//! sea pixels (value >= 128) for the mixed tiles.
//!
//! The quad-tree is serialized depth-first, one character per node. A
//! node's character is `'0' + bits` where bit `(ybit << 1) | xbit` is set
//! when the child in that quadrant is present; present children follow
//! their parent in bit order. An absent child is land, a node without
//! children is sea.

use tracing::debug;
use wx_common::style::MaskMode;
use wx_common::{SubCoord, TileCoord};

use crate::codec::PixelBuffer;
use crate::error::{GridProcessorError, Result};
use crate::raster::{RasterGrid, DATA_SIZE, GRID_SIZE, NO_DATA};

/// Character of a node without children.
const BASE_CHAR: u8 = b'0';

/// Marker for an absent node.
const NULL_NODE: i32 = -1;

/// Mask channel values at or above this are sea.
pub const SEA_THRESHOLD: u8 = 128;

/// Deepest tree accepted by the parser.
const MAX_TREE_DEPTH: u32 = 30;

/// Classification of a tile against the quad-tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileClass {
    /// Entirely sea.
    Sea,
    /// Entirely land.
    Land,
    /// Both; needs a per-pixel mask.
    Mixed,
}

impl TileClass {
    /// Whether a tile of this class is fully hidden by `mode`.
    pub fn is_cut_by(self, mode: MaskMode) -> bool {
        matches!(
            (self, mode),
            (TileClass::Land, MaskMode::Land) | (TileClass::Sea, MaskMode::Sea)
        )
    }
}

/// Arena-backed quad-tree of sea/land coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QTree {
    /// Child indices per node, in quadrant bit order, `-1` when absent.
    nodes: Vec<[i32; 4]>,
    root: i32,
    depth: u32,
}

impl QTree {
    /// Parse a serialized tree.
    pub fn parse(text: &str) -> Result<Self> {
        let bytes = text.trim().as_bytes();
        let mut tree = QTree {
            nodes: Vec::with_capacity(bytes.len()),
            root: NULL_NODE,
            depth: 0,
        };
        if bytes.is_empty() {
            return Ok(tree);
        }

        let mut pos = 0;
        tree.root = tree.parse_node(bytes, &mut pos, 0)?;
        if pos != bytes.len() {
            return Err(GridProcessorError::mask_load_failure(format!(
                "trailing characters after quad-tree at offset {}",
                pos
            )));
        }

        debug!(nodes = tree.nodes.len(), depth = tree.depth, "Parsed mask quad-tree");
        Ok(tree)
    }

    fn parse_node(&mut self, bytes: &[u8], pos: &mut usize, level: u32) -> Result<i32> {
        if level > MAX_TREE_DEPTH {
            return Err(GridProcessorError::mask_load_failure(
                "quad-tree is deeper than supported",
            ));
        }
        let c = *bytes.get(*pos).ok_or_else(|| {
            GridProcessorError::mask_load_failure("quad-tree ended before all nodes were read")
        })?;
        let bits = c
            .checked_sub(BASE_CHAR)
            .filter(|b| *b < 16)
            .ok_or_else(|| {
                GridProcessorError::mask_load_failure(format!(
                    "invalid quad-tree character {:?} at offset {}",
                    c as char, *pos
                ))
            })?;
        *pos += 1;

        let index = self.nodes.len();
        self.nodes.push([NULL_NODE; 4]);
        self.depth = self.depth.max(level);

        for quadrant in 0..4 {
            if bits & (1 << quadrant) != 0 {
                let child = self.parse_node(bytes, pos, level + 1)?;
                self.nodes[index][quadrant] = child;
            }
        }

        Ok(index as i32)
    }

    /// Build a tree of the given depth from a classifier of the deepest tiles.
    ///
    /// `is_sea` is called with every tile at zoom `depth`.
    pub fn from_leaves(depth: u32, is_sea: impl Fn(TileCoord) -> bool) -> Self {
        let mut tree = QTree {
            nodes: Vec::new(),
            root: NULL_NODE,
            depth: 0,
        };
        tree.root = tree.build(TileCoord::new(0, 0, 0), depth, &is_sea);
        // Collapsed subtrees leave shallower leaves, so measure what survived.
        tree.depth = tree.deepest_level(tree.root, 0);
        tree
    }

    fn deepest_level(&self, node: i32, level: u32) -> u32 {
        if node == NULL_NODE {
            return level;
        }
        self.nodes[node as usize]
            .iter()
            .filter(|&&c| c != NULL_NODE)
            .map(|&c| self.deepest_level(c, level + 1))
            .max()
            .unwrap_or(level)
    }

    fn build(&mut self, tile: TileCoord, depth: u32, is_sea: &impl Fn(TileCoord) -> bool) -> i32 {
        if tile.z == depth {
            return if is_sea(tile) { self.push_leaf() } else { NULL_NODE };
        }

        let mark = self.nodes.len();
        let children = tile.children().map(|child| self.build(child, depth, is_sea));
        let all_land = children.iter().all(|&c| c == NULL_NODE);
        let all_sea = children
            .iter()
            .all(|&c| c != NULL_NODE && self.nodes[c as usize] == [NULL_NODE; 4]);

        if all_land {
            self.nodes.truncate(mark);
            NULL_NODE
        } else if all_sea {
            self.nodes.truncate(mark);
            self.push_leaf()
        } else {
            let index = self.nodes.len();
            self.nodes.push(children);
            index as i32
        }
    }

    fn push_leaf(&mut self) -> i32 {
        self.nodes.push([NULL_NODE; 4]);
        (self.nodes.len() - 1) as i32
    }

    /// Serialize the tree depth-first.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        if self.root != NULL_NODE {
            self.encode_node(self.root, &mut out);
        }
        out
    }

    fn encode_node(&self, node: i32, out: &mut String) {
        let children = self.nodes[node as usize];
        let bits = children
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != NULL_NODE)
            .fold(0u8, |acc, (q, _)| acc | (1 << q));
        out.push((BASE_CHAR + bits) as char);
        for child in children.iter().filter(|&&c| c != NULL_NODE) {
            self.encode_node(*child, out);
        }
    }

    /// Deepest level holding a node.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> usize {
        fn count(tree: &QTree, node: i32) -> usize {
            if node == NULL_NODE {
                return 0;
            }
            1 + tree.nodes[node as usize]
                .iter()
                .map(|&c| count(tree, c))
                .sum::<usize>()
        }
        count(self, self.root)
    }

    /// Classify a tile.
    ///
    /// Tiles deeper than the tree use the ancestor at the tree's depth.
    pub fn check(&self, tile: TileCoord) -> TileClass {
        let (mut x, mut y, mut z) = (tile.x, tile.y, tile.z);
        if z > self.depth {
            let shift = z - self.depth;
            x = x.checked_shr(shift).unwrap_or(0);
            y = y.checked_shr(shift).unwrap_or(0);
            z = self.depth;
        }

        let mut node = self.root;
        for level in (0..z).rev() {
            if node == NULL_NODE {
                return TileClass::Land;
            }
            let children = &self.nodes[node as usize];
            if *children == [NULL_NODE; 4] {
                return TileClass::Sea;
            }
            let quadrant = ((((y >> level) & 1) << 1) | ((x >> level) & 1)) as usize;
            node = children[quadrant];
        }

        if node == NULL_NODE {
            TileClass::Land
        } else if self.nodes[node as usize] == [NULL_NODE; 4] {
            TileClass::Sea
        } else {
            TileClass::Mixed
        }
    }
}

/// One channel of a decoded mask tile.
#[derive(Debug, Clone)]
pub struct MaskImage {
    width: usize,
    height: usize,
    values: Vec<u8>,
}

impl MaskImage {
    /// Decode a PNG mask tile and keep one channel.
    pub fn decode(bytes: &[u8], channel: usize) -> Result<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| GridProcessorError::mask_load_failure(e.to_string()))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        let pixels = PixelBuffer::new(width as usize, height as usize, image.into_raw())?;
        Self::from_pixels(&pixels, channel)
    }

    /// Keep one channel of an RGBA buffer.
    pub fn from_pixels(pixels: &PixelBuffer, channel: usize) -> Result<Self> {
        if channel > 3 {
            return Err(GridProcessorError::mask_load_failure(format!(
                "mask channel {} out of range",
                channel
            )));
        }
        if pixels.is_empty() {
            return Err(GridProcessorError::mask_load_failure("mask image is empty"));
        }
        Ok(Self {
            width: pixels.width(),
            height: pixels.height(),
            values: (0..pixels.len()).map(|i| pixels.channel(i, channel)).collect(),
        })
    }

    /// Whether the pixel at `(x, y)` is sea. Coordinates are clamped.
    pub fn is_sea(&self, x: i64, y: i64) -> bool {
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.values[y * self.width + x] >= SEA_THRESHOLD
    }
}

/// Clear the samples that `mode` hides, in place.
///
/// The mask image covers the parent tile when `sub` is set, the tile itself
/// otherwise, and is sampled nearest-neighbour. Halo pixels use the nearest
/// mask pixel inside the tile.
pub fn apply_mask(grid: &mut RasterGrid, mask: &MaskImage, sub: Option<SubCoord>, mode: MaskMode) {
    let hide_sea = match mode {
        MaskMode::None => return,
        MaskMode::Land => false,
        MaskMode::Sea => true,
    };

    let (shift, off_x, off_y) = match sub {
        Some(sub) => (sub.z, sub.x as i64 * DATA_SIZE as i64, sub.y as i64 * DATA_SIZE as i64),
        None => (0, 0, 0),
    };
    let scale_x = mask.width as f64 / DATA_SIZE as f64;
    let scale_y = mask.height as f64 / DATA_SIZE as f64;

    for y in 0..GRID_SIZE {
        let dy = (y as i64 - 1).clamp(0, DATA_SIZE as i64 - 1);
        let my = ((off_y + dy).checked_shr(shift).unwrap_or(0) as f64 * scale_y) as i64;
        for x in 0..GRID_SIZE {
            let idx = RasterGrid::index(x, y);
            if grid.raw[idx] == NO_DATA {
                continue;
            }
            let dx = (x as i64 - 1).clamp(0, DATA_SIZE as i64 - 1);
            let mx = ((off_x + dx).checked_shr(shift).unwrap_or(0) as f64 * scale_x) as i64;
            if mask.is_sea(mx, my) == hide_sea {
                grid.raw[idx] = NO_DATA;
            }
        }
    }
}
