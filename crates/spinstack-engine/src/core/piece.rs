use serde::{Deserialize, Serialize};

use super::board::Board;

/// A falling tetromino with anchor, orientation, kind and special-move flag.
///
/// Pieces are values: every movement or rotation returns a new `Piece`.
///
/// # Coordinate System
///
/// - The anchor is the top-left corner of the piece's square bounding box
/// - X grows rightward, Y grows downward, both relative to the board
/// - The anchor may be negative (spawn above the board, or an I piece hugging
///   the left wall)
///
/// # Example
///
/// ```
/// use spinstack_engine::{Board, Piece, PieceKind, RotationDirection, attempt_rotate};
///
/// let board = Board::EMPTY;
/// let piece = Piece::new(PieceKind::T);
/// let rotated = attempt_rotate(piece, &board, RotationDirection::Clockwise);
/// assert_ne!(rotated, piece);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    position: PiecePosition,
    rotation: PieceRotation,
    kind: PieceKind,
    special_move: bool,
}

impl Serialize for Piece {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Format: "kind#rotation@x,y" with a trailing '*' for special moves (e.g., "T#2@4,17*")
        let marker = if self.special_move { "*" } else { "" };
        let s = format!(
            "{}#{}@{},{}{marker}",
            self.kind.as_char(),
            self.rotation.0,
            self.position.x,
            self.position.y
        );
        serializer.serialize_str(&s)
    }
}

impl<'de> Deserialize<'de> for Piece {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let (body, special_move) = match s.strip_suffix('*') {
            Some(body) => (body, true),
            None => (s.as_str(), false),
        };

        let (kind_str, rest) = body.split_once('#').ok_or_else(|| {
            serde::de::Error::custom(format!("expected format 'kind#rotation@x,y', got '{s}'"))
        })?;
        let mut kind_chars = kind_str.chars();
        let kind = match (kind_chars.next(), kind_chars.next()) {
            (Some(c), None) => PieceKind::from_char(c)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid piece kind: {c}")))?,
            _ => {
                return Err(serde::de::Error::custom(format!(
                    "piece kind must be single character, got '{kind_str}'"
                )));
            }
        };

        let (rotation_str, position_str) = rest.split_once('@').ok_or_else(|| {
            serde::de::Error::custom(format!(
                "missing '@' in format 'kind#rotation@x,y', got '{s}'"
            ))
        })?;
        let rotation_num = rotation_str.parse::<u8>().map_err(|e| {
            serde::de::Error::custom(format!("invalid rotation: {rotation_str} ({e})"))
        })?;
        if rotation_num > 3 {
            return Err(serde::de::Error::custom(format!(
                "rotation must be 0-3, got {rotation_num}"
            )));
        }

        let (x_str, y_str) = position_str.split_once(',').ok_or_else(|| {
            serde::de::Error::custom(format!(
                "missing ',' in format 'kind#rotation@x,y', got '{s}'"
            ))
        })?;
        let x = x_str
            .parse::<i8>()
            .map_err(|e| serde::de::Error::custom(format!("invalid x position: {x_str} ({e})")))?;
        let y = y_str
            .parse::<i8>()
            .map_err(|e| serde::de::Error::custom(format!("invalid y position: {y_str} ({e})")))?;

        Ok(Piece {
            position: PiecePosition { x, y },
            rotation: PieceRotation(rotation_num),
            kind,
            special_move,
        })
    }
}

impl Piece {
    /// Creates a piece of the given kind at its spawn position with orientation 0.
    #[must_use]
    pub fn new(kind: PieceKind) -> Self {
        Self {
            position: kind.spawn_position(),
            rotation: PieceRotation::default(),
            kind,
            special_move: false,
        }
    }

    /// Creates a piece at an explicit anchor and orientation.
    #[must_use]
    pub fn with_placement(kind: PieceKind, rotation: PieceRotation, position: PiecePosition) -> Self {
        Self {
            position,
            rotation,
            kind,
            special_move: false,
        }
    }

    #[must_use]
    pub fn position(&self) -> PiecePosition {
        self.position
    }

    #[must_use]
    pub fn rotation(&self) -> PieceRotation {
        self.rotation
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    /// Returns whether the last successful move of this piece was a spin.
    #[must_use]
    pub fn is_special_move(&self) -> bool {
        self.special_move
    }

    #[must_use]
    pub fn mask(&self) -> PieceMask {
        self.kind.mask(self.rotation)
    }

    /// Returns the board coordinates of the occupied cells.
    pub fn occupied_positions(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.kind
            .occupied_positions(self.rotation)
            .map(move |(dx, dy)| (self.position.x() + dx, self.position.y() + dy))
    }

    /// Returns the piece shifted by `(dx, dy)` without any collision check.
    ///
    /// Any movement clears the special-move flag.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            position: self.position.offset(dx, dy),
            rotation: self.rotation,
            kind: self.kind,
            special_move: false,
        }
    }

    /// Returns the piece rotated in place without any collision check.
    #[must_use]
    pub fn rotated(&self, direction: RotationDirection) -> Self {
        let rotation = match direction {
            RotationDirection::Clockwise => self.rotation.rotated_right(),
            RotationDirection::CounterClockwise => self.rotation.rotated_left(),
        };
        Self {
            position: self.position,
            rotation,
            kind: self.kind,
            special_move: false,
        }
    }

    #[must_use]
    pub fn with_special_move(&self, special_move: bool) -> Self {
        Self {
            special_move,
            ..*self
        }
    }

    /// Returns the piece moved straight down until it rests on the stack.
    #[must_use]
    pub fn simulate_drop_position(&self, board: &Board) -> Self {
        let mut dropped = *self;
        loop {
            let next = dropped.translated(0, 1);
            if board.is_colliding(&next) {
                return dropped;
            }
            dropped = next;
        }
    }
}

/// Rotation direction for [`attempt_rotate`](super::movement::attempt_rotate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

/// Anchor of a piece on the board.
///
/// Coordinates are signed: the anchor is the top-left of the bounding box,
/// which can lie outside the board while the occupied cells are inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PiecePosition {
    x: i8,
    y: i8,
}

impl PiecePosition {
    #[must_use]
    pub const fn new(x: i8, y: i8) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn x(self) -> i32 {
        i32::from(self.x)
    }

    #[must_use]
    pub fn y(self) -> i32 {
        i32::from(self.y)
    }

    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: (self.x() + dx) as i8,
            y: (self.y() + dy) as i8,
        }
    }
}

/// Rotation state of a piece.
///
/// - `0`: spawn orientation
/// - `1`: 90° clockwise
/// - `2`: 180°
/// - `3`: 270° clockwise
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PieceRotation(u8);

impl PieceRotation {
    pub const ALL: [Self; 4] = [Self(0), Self(1), Self(2), Self(3)];

    #[must_use]
    pub const fn new(index: u8) -> Self {
        Self(index % 4)
    }

    #[must_use]
    pub fn rotated_right(self) -> Self {
        PieceRotation((self.0 + 1) % 4)
    }

    #[must_use]
    pub fn rotated_left(self) -> Self {
        PieceRotation((self.0 + 3) % 4)
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

/// The seven canonical tetromino shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// S-piece.
    S = 2,
    /// Z-piece.
    Z = 3,
    /// J-piece.
    J = 4,
    /// L-piece.
    L = 5,
    /// T-piece, the only kind that can score special moves.
    T = 6,
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    pub const ALL: [Self; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
        PieceKind::T,
    ];

    /// Side length of the square bounding box.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            PieceKind::I => 4,
            PieceKind::O => 2,
            _ => 3,
        }
    }

    /// Spawn anchor: horizontally centered, with the topmost occupied row on row 0.
    #[must_use]
    pub const fn spawn_position(self) -> PiecePosition {
        #[expect(clippy::cast_possible_truncation)]
        let x = ((Board::WIDTH - self.size()) / 2) as i8;
        let y = match self {
            PieceKind::I => -1,
            _ => 0,
        };
        PiecePosition::new(x, y)
    }

    #[must_use]
    pub fn mask(self, rotation: PieceRotation) -> PieceMask {
        PIECE_MASKS[self as usize][rotation.as_usize()]
    }

    /// Returns the mask with empty leading rows and columns stripped.
    ///
    /// Two rotations with the same signature reach exactly the same set of
    /// final placements.
    #[must_use]
    pub fn shape_signature(self, rotation: PieceRotation) -> PieceMask {
        let mask = self.mask(rotation);
        let first_row = mask.iter().position(|row| *row != 0).unwrap_or(0);
        let min_x = mask
            .iter()
            .filter(|row| **row != 0)
            .map(|row| row.trailing_zeros())
            .min()
            .unwrap_or(0);
        let mut signature = [0; 4];
        for (dst, src) in signature.iter_mut().zip(&mask[first_row..]) {
            *dst = *src >> min_x;
        }
        signature
    }

    /// Returns an iterator of occupied offsets within the bounding box.
    pub fn occupied_positions(self, rotation: PieceRotation) -> impl Iterator<Item = (i32, i32)> {
        const OFFSETS: [i32; 4] = [0, 1, 2, 3];
        let mask = self.mask(rotation);
        (0..4).flat_map(move |dy| {
            (0..4).filter_map(move |dx| {
                if mask[dy] & (1 << dx) == 0 {
                    None
                } else {
                    Some((OFFSETS[dx], OFFSETS[dy]))
                }
            })
        })
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use spinstack_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
            PieceKind::T => 'T',
        }
    }

    /// Parses a piece kind from a single character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            'T' => Some(PieceKind::T),
            _ => None,
        }
    }
}

/// Bit representation of a piece within its bounding box.
///
/// Element `dy` holds row `dy` of the box; bit `dx` is set when cell `(dx, dy)`
/// is occupied.
pub type PieceMask = [u16; 4];

/// Generates all 4 rotation states of a piece mask by rotating 90° clockwise.
///
/// # Arguments
///
/// * `size` - Side of the bounding box (4 for I, 2 for O, 3 otherwise)
/// * `mask` - Initial piece mask at 0° rotation
const fn mask_rotations(size: usize, mask: PieceMask) -> [PieceMask; 4] {
    let mut rotates = [mask; 4];
    let mut i = 1;
    while i < 4 {
        let mut new_mask = [0; 4];
        let mut y = 0;
        while y < size {
            let mut x = 0;
            while x < size {
                if (rotates[i - 1][size - 1 - x] & (1 << y)) != 0 {
                    new_mask[y] |= 1 << x;
                }
                x += 1;
            }
            y += 1;
        }
        rotates[i] = new_mask;
        i += 1;
    }
    rotates
}

const PIECE_MASKS: [[PieceMask; 4]; PieceKind::LEN] = {
    const fn m(bits: [bool; 4]) -> u16 {
        let mut mask = 0;
        let mut i = 0;
        while i < 4 {
            if bits[i] {
                mask |= 1 << i;
            }
            i += 1;
        }
        mask
    }

    const C: bool = true;
    const E: bool = false;
    const EEEE: u16 = m([E; 4]);

    [
        // I-piece
        mask_rotations(4, [EEEE, m([C, C, C, C]), EEEE, EEEE]),
        // O-piece
        mask_rotations(2, [m([C, C, E, E]), m([C, C, E, E]), EEEE, EEEE]),
        // S-piece
        mask_rotations(3, [m([E, C, C, E]), m([C, C, E, E]), EEEE, EEEE]),
        // Z-piece
        mask_rotations(3, [m([C, C, E, E]), m([E, C, C, E]), EEEE, EEEE]),
        // J-piece
        mask_rotations(3, [m([C, E, E, E]), m([C, C, C, E]), EEEE, EEEE]),
        // L-piece
        mask_rotations(3, [m([E, E, C, E]), m([C, C, C, E]), EEEE, EEEE]),
        // T-piece
        mask_rotations(3, [m([E, C, E, E]), m([C, C, C, E]), EEEE, EEEE]),
    ]
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_serialization() {
        let piece = Piece::with_placement(
            PieceKind::S,
            PieceRotation::new(1),
            PiecePosition::new(4, 17),
        );

        let serialized = serde_json::to_string(&piece).unwrap();
        assert_eq!(serialized, "\"S#1@4,17\"");

        let deserialized: Piece = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, piece);
    }

    #[test]
    fn test_piece_serialization_negative_anchor_and_special_move() {
        let piece = Piece::with_placement(
            PieceKind::T,
            PieceRotation::new(2),
            PiecePosition::new(-1, 17),
        )
        .with_special_move(true);

        let serialized = serde_json::to_string(&piece).unwrap();
        assert_eq!(serialized, "\"T#2@-1,17*\"");

        let deserialized: Piece = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, piece);
        assert!(deserialized.is_special_move());
    }

    #[test]
    fn test_piece_deserialization_error_cases() {
        assert!(serde_json::from_str::<Piece>("\"S1@4,18\"").is_err());
        assert!(serde_json::from_str::<Piece>("\"S#1#4,18\"").is_err());
        assert!(serde_json::from_str::<Piece>("\"S#1@4\"").is_err());
        assert!(serde_json::from_str::<Piece>("\"X#1@4,18\"").is_err());
        assert!(serde_json::from_str::<Piece>("\"SS#1@4,18\"").is_err());
        assert!(serde_json::from_str::<Piece>("\"S#4@4,18\"").is_err());
        assert!(serde_json::from_str::<Piece>("\"S#1@abc,18\"").is_err());
    }

    #[test]
    fn test_every_rotation_has_four_cells() {
        for kind in PieceKind::ALL {
            for rotation in PieceRotation::ALL {
                assert_eq!(kind.occupied_positions(rotation).count(), 4, "{kind:?} {rotation:?}");
            }
        }
    }

    #[test]
    fn test_occupied_cells_stay_inside_bounding_box() {
        for kind in PieceKind::ALL {
            let size = i32::try_from(kind.size()).unwrap();
            for rotation in PieceRotation::ALL {
                for (dx, dy) in kind.occupied_positions(rotation) {
                    assert!((0..size).contains(&dx) && (0..size).contains(&dy));
                }
            }
        }
    }

    #[test]
    fn test_shape_signature_distinct_states() {
        let distinct = |kind: PieceKind| {
            let mut signatures: Vec<PieceMask> = PieceRotation::ALL
                .iter()
                .map(|r| kind.shape_signature(*r))
                .collect();
            signatures.sort_unstable();
            signatures.dedup();
            signatures.len()
        };
        assert_eq!(distinct(PieceKind::O), 1);
        assert_eq!(distinct(PieceKind::I), 2);
        assert_eq!(distinct(PieceKind::S), 2);
        assert_eq!(distinct(PieceKind::Z), 2);
        assert_eq!(distinct(PieceKind::T), 4);
        assert_eq!(distinct(PieceKind::J), 4);
        assert_eq!(distinct(PieceKind::L), 4);
    }

    #[test]
    fn test_spawn_position_is_centered() {
        assert_eq!(PieceKind::T.spawn_position(), PiecePosition::new(3, 0));
        assert_eq!(PieceKind::O.spawn_position(), PiecePosition::new(4, 0));
        assert_eq!(PieceKind::I.spawn_position(), PiecePosition::new(3, -1));

        let cells: Vec<_> = Piece::new(PieceKind::I).occupied_positions().collect();
        assert_eq!(cells, vec![(3, 0), (4, 0), (5, 0), (6, 0)]);
    }

    #[test]
    fn test_translation_clears_special_move() {
        let piece = Piece::new(PieceKind::T).with_special_move(true);
        assert!(!piece.translated(1, 0).is_special_move());
        assert!(!piece.rotated(RotationDirection::Clockwise).is_special_move());
    }

    #[test]
    fn test_piece_kind_char_conversion() {
        for kind in PieceKind::ALL {
            assert_eq!(PieceKind::from_char(kind.as_char()), Some(kind));
        }
        assert_eq!(PieceKind::from_char('X'), None);
        assert_eq!(PieceKind::from_char('t'), None);
    }
}
