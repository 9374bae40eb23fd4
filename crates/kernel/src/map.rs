use roomtrace_common::{CellCode, GridCoord, PASSABLE};
use serde::{Deserialize, Serialize};

/// Which of the three parallel map layers a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Wall,
    Floor,
    Ceiling,
}

impl std::fmt::Display for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Layer::Wall => "wall",
            Layer::Floor => "floor",
            Layer::Ceiling => "ceiling",
        };
        f.write_str(name)
    }
}

/// Errors from map validation. A map that fails here never reaches the partitioner.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map has no cells")]
    Empty,
    #[error("{layer} layer row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        layer: Layer,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{layer} layer is {found_rows}x{found_cols}, wall layer is {rows}x{cols}")]
    DimensionMismatch {
        layer: Layer,
        rows: usize,
        cols: usize,
        found_rows: usize,
        found_cols: usize,
    },
}

/// Reserved cell codes of the map vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellVocabulary {
    /// Wall-layer code marking a door cell.
    pub door_code: CellCode,
}

impl Default for CellVocabulary {
    fn default() -> Self {
        Self { door_code: 7 }
    }
}

impl CellVocabulary {
    pub fn is_door(&self, code: CellCode) -> bool {
        code == self.door_code
    }

    /// Cells the observer may stand in: empty cells and doors.
    pub fn is_walkable(&self, code: CellCode) -> bool {
        code == PASSABLE || self.is_door(code)
    }
}

/// The static level: wall, floor and ceiling codes for every cell, row-major.
///
/// All three layers share the same dimensions; this is checked once at
/// construction and the map is immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GridMap {
    rows: usize,
    cols: usize,
    walls: Vec<CellCode>,
    floors: Vec<CellCode>,
    ceilings: Vec<CellCode>,
}

impl GridMap {
    /// Validate and flatten three layers of equal dimensions.
    pub fn new(
        walls: Vec<Vec<CellCode>>,
        floors: Vec<Vec<CellCode>>,
        ceilings: Vec<Vec<CellCode>>,
    ) -> Result<Self, MapError> {
        let rows = walls.len();
        let cols = walls.first().map_or(0, Vec::len);
        if rows == 0 || cols == 0 {
            return Err(MapError::Empty);
        }

        let walls = flatten(Layer::Wall, walls, rows, cols)?;
        let floors = flatten(Layer::Floor, floors, rows, cols)?;
        let ceilings = flatten(Layer::Ceiling, ceilings, rows, cols)?;

        Ok(Self {
            rows,
            cols,
            walls,
            floors,
            ceilings,
        })
    }

    /// Build a map from a wall layer alone. Passable cells get the given floor and
    /// ceiling codes; solid cells get none.
    pub fn from_walls(
        walls: Vec<Vec<CellCode>>,
        floor: CellCode,
        ceiling: CellCode,
    ) -> Result<Self, MapError> {
        let layer = |code: CellCode| -> Vec<Vec<CellCode>> {
            walls
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|&w| if w == PASSABLE { code } else { 0 })
                        .collect()
                })
                .collect()
        };
        let floors = layer(floor);
        let ceilings = layer(ceiling);
        Self::new(walls, floors, ceilings)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn contains(&self, coord: GridCoord) -> bool {
        coord.row >= 0
            && coord.col >= 0
            && (coord.row as usize) < self.rows
            && (coord.col as usize) < self.cols
    }

    fn offset(&self, coord: GridCoord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.row as usize * self.cols + coord.col as usize)
    }

    pub fn wall(&self, coord: GridCoord) -> Option<CellCode> {
        self.offset(coord).map(|i| self.walls[i])
    }

    pub fn floor(&self, coord: GridCoord) -> Option<CellCode> {
        self.offset(coord).map(|i| self.floors[i])
    }

    pub fn ceiling(&self, coord: GridCoord) -> Option<CellCode> {
        self.offset(coord).map(|i| self.ceilings[i])
    }

    /// Out-of-bounds cells are never passable.
    pub fn is_passable(&self, coord: GridCoord) -> bool {
        self.wall(coord) == Some(PASSABLE)
    }

    /// Every coordinate of the map in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| GridCoord::new(r as i32, c as i32)))
    }

    pub fn passable_count(&self) -> usize {
        self.walls.iter().filter(|&&w| w == PASSABLE).count()
    }
}

fn flatten(
    layer: Layer,
    grid: Vec<Vec<CellCode>>,
    rows: usize,
    cols: usize,
) -> Result<Vec<CellCode>, MapError> {
    let found_rows = grid.len();
    if found_rows != rows {
        return Err(MapError::DimensionMismatch {
            layer,
            rows,
            cols,
            found_rows,
            found_cols: grid.first().map_or(0, Vec::len),
        });
    }
    let mut out = Vec::with_capacity(rows * cols);
    for (row, cells) in grid.into_iter().enumerate() {
        if cells.len() != cols {
            // A wall row that disagrees with row 0 is ragged; any other layer
            // disagreeing with the wall width is a dimension mismatch.
            return Err(match layer {
                Layer::Wall => MapError::RaggedRow {
                    layer,
                    row,
                    expected: cols,
                    found: cells.len(),
                },
                _ => MapError::DimensionMismatch {
                    layer,
                    rows,
                    cols,
                    found_rows,
                    found_cols: cells.len(),
                },
            });
        }
        out.extend(cells);
    }
    Ok(out)
}
