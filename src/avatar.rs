//! Avatar color and initials derived from a display name.
//!
//! Colors are persisted next to every message, so the hash has to stay
//! compatible with the one older clients used: a JavaScript style
//! `hash = c + ((hash << 5) - hash)` over UTF-16 code units, where only the
//! shift operates on 32 bits.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const SATURATION: u8 = 70;
pub const LIGHTNESS: u8 = 60;

static CAMEL_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[A-Z][a-z]+").expect("static pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvatarColor {
    hue: u16,
    saturation: u8,
    lightness: u8,
}

impl AvatarColor {
    #[cfg(test)]
    pub fn hue(&self) -> u16 {
        self.hue
    }

    #[cfg(test)]
    pub fn saturation(&self) -> u8 {
        self.saturation
    }

    #[cfg(test)]
    pub fn lightness(&self) -> u8 {
        self.lightness
    }

    pub fn to_rgb(&self) -> [u8; 3] {
        let sector = f32::from(self.hue % 360) / 60.0;
        let saturation = f32::from(self.saturation) / 100.0;
        let lightness = f32::from(self.lightness) / 100.0;

        let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let (r, g, b) = match sector as u8 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = lightness - chroma / 2.0;

        [r, g, b].map(|channel| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8)
    }

    pub fn to_color32(&self) -> egui::Color32 {
        let [r, g, b] = self.to_rgb();
        egui::Color32::from_rgb(r, g, b)
    }
}

impl fmt::Display for AvatarColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hsl({}, {}%, {}%)",
            self.hue, self.saturation, self.lightness
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("not an hsl color: `{0}`")]
pub struct ParseAvatarColorError(String);

impl FromStr for AvatarColor {
    type Err = ParseAvatarColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseAvatarColorError(s.to_string());
        let body = s
            .trim()
            .strip_prefix("hsl(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(invalid)?;

        let mut parts = body.split(',').map(str::trim);
        let hue: u16 = parts
            .next()
            .and_then(|part| part.parse().ok())
            .filter(|hue| *hue < 360)
            .ok_or_else(invalid)?;
        let mut percent = || {
            parts
                .next()
                .and_then(|part| part.strip_suffix('%'))
                .and_then(|part| part.trim().parse::<u8>().ok())
                .filter(|value| *value <= 100)
        };
        let saturation = percent().ok_or_else(invalid)?;
        let lightness = percent().ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self {
            hue,
            saturation,
            lightness,
        })
    }
}

/// Rolling hash over the UTF-16 code units of `name`.
///
/// Exact (no precision loss) for any name shorter than a few million units.
pub fn name_hash(name: &str) -> i64 {
    name.encode_utf16().fold(0i64, |hash, unit| {
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        i64::from(unit) + shifted - hash
    })
}

pub fn color_for(name: &str) -> AvatarColor {
    let hue = (name_hash(name) % 360).unsigned_abs() as u16;
    AvatarColor {
        hue,
        saturation: SATURATION,
        lightness: LIGHTNESS,
    }
}

/// Two letters for the avatar circle.
///
/// Tuned for generated names such as `HappyPenguin42`; anything without two
/// CamelCase words falls back to its first two characters.
pub fn initials_for(name: &str) -> String {
    let mut words = CAMEL_WORD.find_iter(name);
    if let (Some(first), Some(second)) = (words.next(), words.next()) {
        return first.as_str()[..1].to_string() + &second.as_str()[..1];
    }
    name.chars().take(2).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_deterministic() {
        for name in ["HappyPenguin42", "", "ü", "BraveFox7", "日本語"] {
            assert_eq!(color_for(name), color_for(name));
        }
    }

    #[test]
    fn empty_name_maps_to_hue_zero() {
        let color = color_for("");
        assert_eq!(color.hue(), 0);
        assert_eq!(color.to_string(), "hsl(0, 70%, 60%)");
    }

    #[test]
    fn hash_matches_reference_vectors() {
        assert_eq!(name_hash("A"), 65);
        assert_eq!(name_hash("AB"), 2081);
        assert_eq!(color_for("A").hue(), 65);
        assert_eq!(color_for("AB").hue(), 281);
    }

    #[test]
    fn hue_stays_in_range_for_long_names() {
        let long = "EnergeticDolphin999".repeat(64);
        let color = color_for(&long);
        assert!(color.hue() < 360);
        assert_eq!(color.saturation(), 70);
        assert_eq!(color.lightness(), 60);
    }

    #[test]
    fn parses_what_it_formats() {
        let color = color_for("CuriousKoala512");
        let parsed: AvatarColor = color.to_string().parse().unwrap();
        assert_eq!(parsed, color);

        assert!("rgb(1, 2, 3)".parse::<AvatarColor>().is_err());
        assert!("hsl(400, 70%, 60%)".parse::<AvatarColor>().is_err());
        assert!("hsl(10, 70%)".parse::<AvatarColor>().is_err());
    }

    #[test]
    fn converts_to_rgb() {
        let red: AvatarColor = "hsl(0, 70%, 60%)".parse().unwrap();
        assert_eq!(red.to_rgb(), [224, 82, 82]);

        let green: AvatarColor = "hsl(120, 70%, 60%)".parse().unwrap();
        assert_eq!(green.to_rgb(), [82, 224, 82]);
    }

    #[test]
    fn initials_from_camel_case_words() {
        assert_eq!(initials_for("HappyPenguin42"), "HP");
        assert_eq!(initials_for("42BraveFox"), "BF");
    }

    #[test]
    fn initials_fall_back_to_prefix() {
        assert_eq!(initials_for("ab"), "ab");
        assert_eq!(initials_for("happypenguin"), "ha");
        assert_eq!(initials_for("Happy"), "Ha");
        assert_eq!(initials_for("123"), "12");
        assert_eq!(initials_for("x"), "x");
        assert_eq!(initials_for(""), "");
    }
}
