use image::{Rgb, RgbImage, RgbaImage};

/// Flatten an RGBA frame over a solid background for sinks without alpha
pub fn flatten_over(frame: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let (width, height) = frame.dimensions();
    let mut out = RgbImage::new(width, height);

    for (dst, src) in out.pixels_mut().zip(frame.pixels()) {
        let a = u32::from(src[3]);
        for c in 0..3 {
            let fg = u32::from(src[c]) * a;
            let bg = u32::from(background[c]) * (255 - a);
            dst[c] = ((fg + bg + 127) / 255) as u8;
        }
    }

    out
}

/// Parse `#RRGGBB` (leading `#` optional)
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>, String> {
    let hex = value.strip_prefix('#').unwrap_or(value);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("expected a colour like #00ff00, got '{value}'"));
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| e.to_string());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
