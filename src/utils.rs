//! Small helpers shared by the front-ends (name formatting, sprite decoding).

use image::imageops::FilterType;

/// Uppercase the first character and leave the rest untouched.
///
/// Examples: `squirtle` -> `Squirtle`, `mr-mime` -> `Mr-mime`.
pub fn capitalize_first(name: &str) -> String {
    let mut chs = name.chars();
    match chs.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chs.as_str(),
    }
}

/// Decode an encoded sprite and resize it to `w` x `h` RGB rows.
///
/// Transparent pixels are blended onto `background` so they render as empty
/// cells rather than black ones.
pub fn sprite_pixels(
    bytes: &[u8],
    w: u32,
    h: u32,
    background: (u8, u8, u8),
) -> Option<Vec<Vec<(u8, u8, u8)>>> {
    let img = image::load_from_memory(bytes).ok()?.to_rgba8();
    let resized = image::imageops::resize(&img, w.max(1), h.max(1), FilterType::Nearest);
    let mut rows: Vec<Vec<(u8, u8, u8)>> = Vec::with_capacity(resized.height() as usize);
    for y in 0..resized.height() {
        let mut row = Vec::with_capacity(resized.width() as usize);
        for x in 0..resized.width() {
            let p = resized.get_pixel(x, y);
            row.push(blend(p[0], p[1], p[2], p[3], background));
        }
        rows.push(row);
    }
    Some(rows)
}

fn blend(r: u8, g: u8, b: u8, a: u8, bg: (u8, u8, u8)) -> (u8, u8, u8) {
    let mix = |c: u8, under: u8| -> u8 {
        ((c as u16 * a as u16 + under as u16 * (255 - a as u16)) / 255) as u8
    };
    (mix(r, bg.0), mix(g, bg.1), mix(b, bg.2))
}
