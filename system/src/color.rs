//! Deterministic display colour per connection identity.

use crate::message::ColorConfig;

const SATURATION: (u32, u32) = (50, 70);
const LIGHTNESS: (u32, u32) = (30, 60);

// Perceived brightness above which a colour counts as light.
const LIGHTNESS_THRESHOLD: f64 = 0.5;

fn hash_identity(identity: &str) -> u32 {
    identity.chars().fold(0u32, |hash, c| {
        (c as u32).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}

fn pick(hash: u32, (min, max): (u32, u32)) -> u32 {
    min + hash % (max - min + 1)
}

fn hsl_to_rgb(hue: u32, saturation: u32, lightness: u32) -> (u8, u8, u8) {
    let h = hue as f64 / 360.0;
    let s = saturation as f64 / 100.0;
    let l = lightness as f64 / 100.0;

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let channel = |mut t: f64| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        let v = if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        };
        (v * 255.0).round() as u8
    };

    (channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0))
}

fn is_light(r: u8, g: u8, b: u8) -> bool {
    let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
    luminance > LIGHTNESS_THRESHOLD
}

/// Same identity, same colour.
pub fn assign_color(identity: &str) -> ColorConfig {
    let hash = hash_identity(identity);
    let hue = hash % 360;
    let saturation = pick(hash, SATURATION);
    let lightness = pick(hash, LIGHTNESS);
    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);

    ColorConfig {
        color: format!("#{:02x}{:02x}{:02x}", r, g, b),
        is_light: is_light(r, g, b),
    }
}
