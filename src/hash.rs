/// Fixed palette for categorical layers; picked by `palette_color`
pub const PALETTE: [&str; 25] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231",
    "#911eb4", "#46f0f0", "#f032e6", "#bcf60c", "#fabebe",
    "#008080", "#e6beff", "#9a6324", "#fffac8", "#800000",
    "#aaffc3", "#808000", "#ffd8b1", "#000075", "#808080",
    "#E65100", "#1B5E20", "#0D47A1", "#FF6F00", "#006064",
];

/// Fallback when a categorical key is empty
pub const PALETTE_DEFAULT: &str = "#2E7D32";

/// 31-multiplier string hash over UTF-16 code units.
/// The shift wraps to 32 bits while the running sum does not, so the value
/// for a given name stays stable across sessions and data reloads.
#[inline(always)]
pub fn string_hash(s: &str) -> i64 {
    let mut hash: i64 = 0;
    for unit in s.encode_utf16() {
        let shifted = (hash as i32).wrapping_shl(5) as i64;
        hash = unit as i64 + (shifted - hash);
    }
    hash
}

/// Deterministic palette colour for a category name
pub fn palette_color(name: &str) -> &'static str {
    if name.is_empty() {
        return PALETTE_DEFAULT;
    }
    let idx = string_hash(name).unsigned_abs() % PALETTE.len() as u64;
    PALETTE[idx as usize]
}
