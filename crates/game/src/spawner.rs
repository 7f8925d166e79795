//! Spawn layout and player colors.
//!
//! Avatars are lined up in the smallest square-ish grid that fits the roster,
//! centred on an origin. Players are known by their code name (`1P`, `2P`, ...)
//! which also picks their color.

use engine_core::{Tint, Vec3};

/// Plane a spawn grid is laid out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plane {
    Xy,
    #[default]
    Xz,
    Yz,
}

impl Plane {
    /// Map grid `(col, row)` offsets onto world axes.
    fn place(self, col: f32, row: f32) -> Vec3 {
        match self {
            Plane::Xy => Vec3::new(col, row, 0.0),
            Plane::Xz => Vec3::new(col, 0.0, row),
            Plane::Yz => Vec3::new(0.0, col, row),
        }
    }
}

/// `len` positions `gap` apart, filled row by row and centred on `origin`.
///
/// The grid has `ceil(sqrt(len))` columns.
pub fn square_matrix_positions(gap: f32, len: usize, origin: Vec3, plane: Plane) -> Vec<Vec3> {
    if len == 0 {
        return Vec::new();
    }
    let max_col = (len as f32).sqrt().ceil() as usize;
    let max_row = len.div_ceil(max_col);
    let center = plane.place((max_col - 1) as f32 * gap / 2.0, (max_row - 1) as f32 * gap / 2.0);

    (0..len)
        .map(|index| {
            let col = (index % max_col) as f32;
            let row = (index / max_col) as f32;
            plane.place(col * gap, row * gap) - center + origin
        })
        .collect()
}

/// Code name for the player at `index` (0-based): `1P`, `2P`, ...
pub fn code_name(index: usize) -> String {
    format!("{}P", index + 1)
}

/// Named palette slots, in seat order.
const PLAYER_COLORS: [(&str, &str); 8] = [
    ("red", "#f44336"),
    ("deep-purple", "#673ab7"),
    ("light-blue", "#03a9f4"),
    ("green", "#4caf50"),
    ("amber", "#ffc107"),
    ("deep-orange", "#ff5722"),
    ("blue-grey", "#607d8b"),
    ("brown", "#795548"),
];

const FALLBACK_COLOR: (&str, &str) = ("grey", "#9e9e9e");

fn palette_entry(code_name: &str) -> (&'static str, &'static str) {
    if !code_name.contains('P') {
        return FALLBACK_COLOR;
    }
    code_name
        .replace('P', "")
        .parse::<usize>()
        .ok()
        .and_then(|seat| seat.checked_sub(1))
        .and_then(|index| PLAYER_COLORS.get(index).copied())
        .unwrap_or(FALLBACK_COLOR)
}

/// Palette name for a code name; anything unrecognised is `grey`.
pub fn player_color_name(code_name: &str) -> &'static str {
    palette_entry(code_name).0
}

pub fn player_color(code_name: &str) -> Tint {
    let (name, hex) = palette_entry(code_name);
    Tint::from_hex(hex).unwrap_or_else(|| {
        log::warn!("bad palette entry for {name}: {hex}");
        Tint::WHITE
    })
}
