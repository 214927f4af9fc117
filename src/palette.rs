use std::fmt::Write as _;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::colorspace::{rgb_to_cmyk, rgb_to_hsv, Cmyk, Hsv};
use crate::error::{Error, Result};

/// Largest palette addressable by a `u8` index.
pub const MAX_ENTRIES: usize = 256;

/// Distance metric used by nearest-color search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMetric {
    /// Squared Euclidean distance on 0..=255 RGB.
    #[default]
    Rgb,
    /// HSV with circular hue.
    Hsv,
    /// Euclidean CMYK.
    Cmyk,
}

impl FromStr for ColorMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "hsv" => Ok(Self::Hsv),
            "cmyk" => Ok(Self::Cmyk),
            _ => Err(Error::UnknownMethod(s.to_string())),
        }
    }
}

/// An ordered color table loaded from (or destined for) a GIMP palette file.
///
/// Entry order is display order and also the index space of quantized images.
/// HSV and CMYK views are computed once at construction so nearest-color
/// search never converts palette entries per pixel.
#[derive(Debug, Clone)]
pub struct Palette {
    name: Option<String>,
    columns: Option<u32>,
    entries: Vec<[u8; 4]>,
    names: Vec<Option<String>>,
    entries_hsv: Vec<Hsv>,
    entries_cmyk: Vec<Cmyk>,
}

impl Palette {
    /// Build a palette from opaque RGB entries.
    pub fn from_rgb(entries: &[[u8; 3]]) -> Result<Self> {
        Self::from_named(entries.iter().map(|&rgb| (rgb, None)).collect())
    }

    fn from_named(entries: Vec<([u8; 3], Option<String>)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::EmptyPalette);
        }
        if entries.len() > MAX_ENTRIES {
            return Err(Error::PaletteTooLarge(entries.len()));
        }

        let mut palette = Self {
            name: None,
            columns: None,
            entries: Vec::with_capacity(entries.len()),
            names: Vec::with_capacity(entries.len()),
            entries_hsv: Vec::with_capacity(entries.len()),
            entries_cmyk: Vec::with_capacity(entries.len()),
        };
        for (rgb, name) in entries {
            palette.push([rgb[0], rgb[1], rgb[2], 255], name);
        }
        Ok(palette)
    }

    fn push(&mut self, rgba: [u8; 4], name: Option<String>) {
        let (r, g, b) = (rgba[0] as f32, rgba[1] as f32, rgba[2] as f32);
        self.entries.push(rgba);
        self.names.push(name);
        self.entries_hsv.push(rgb_to_hsv(r, g, b));
        self.entries_cmyk.push(rgb_to_cmyk(r, g, b));
    }

    /// Load a `.gpl` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let palette = parse_gpl(&text, &path.display().to_string())?;
        debug!(path = %path.display(), colors = palette.len(), "loaded palette");
        Ok(palette)
    }

    /// Parse GIMP palette text.
    pub fn parse(text: &str) -> Result<Self> {
        parse_gpl(text, "<palette>")
    }

    /// Serialize as GIMP palette text.
    ///
    /// With `named_colors`, every entry is labelled with the name of the
    /// closest color in that table instead of its own name.
    pub fn to_gpl_string(
        &self,
        name: &str,
        columns: u32,
        named_colors: Option<&Palette>,
    ) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "GIMP Palette");
        let _ = writeln!(out, "Name: {name}");
        let _ = writeln!(out, "Columns: {columns}");
        let _ = writeln!(out, "#");

        for (i, rgba) in self.entries.iter().enumerate() {
            let label = match named_colors {
                Some(table) => table.nearest_name(*rgba),
                None => self.names[i].clone(),
            }
            .unwrap_or_else(|| format!("Index {i}"));
            let _ = writeln!(out, "{:3} {:3} {:3}\t{}", rgba[0], rgba[1], rgba[2], label);
        }
        out
    }

    /// Write a `.gpl` file.
    pub fn save(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        columns: u32,
        named_colors: Option<&Palette>,
    ) -> Result<()> {
        std::fs::write(path, self.to_gpl_string(name, columns, named_colors))?;
        Ok(())
    }

    fn nearest_name(&self, rgba: [u8; 4]) -> Option<String> {
        let idx = self.nearest([rgba[0] as f32, rgba[1] as f32, rgba[2] as f32], ColorMetric::Rgb);
        self.names[idx as usize].clone()
    }

    /// RGBA entries. Alpha is always 255.
    pub fn entries_rgba(&self) -> &[[u8; 4]] {
        &self.entries
    }

    /// RGB view of the entries.
    pub fn entries(&self) -> Vec<[u8; 3]> {
        self.entries.iter().map(|e| [e[0], e[1], e[2]]).collect()
    }

    pub fn entries_hsv(&self) -> &[Hsv] {
        &self.entries_hsv
    }

    pub fn entries_cmyk(&self) -> &[Cmyk] {
        &self.entries_cmyk
    }

    pub fn entry_name(&self, index: usize) -> Option<&str> {
        self.names.get(index).and_then(|n| n.as_deref())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Grid width hint from the `Columns:` header.
    pub fn columns(&self) -> Option<u32> {
        self.columns
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest entry to an RGB color (0..=255 floats, may carry dither error).
    ///
    /// Linear scan; the lowest index wins ties.
    pub fn nearest(&self, color: [f32; 3], metric: ColorMetric) -> u8 {
        let mut best_idx = 0;
        let mut best_dist = f32::MAX;

        match metric {
            ColorMetric::Rgb => {
                for (i, e) in self.entries.iter().enumerate() {
                    let dr = color[0] - e[0] as f32;
                    let dg = color[1] - e[1] as f32;
                    let db = color[2] - e[2] as f32;
                    let d = dr * dr + dg * dg + db * db;
                    if d < best_dist {
                        best_dist = d;
                        best_idx = i;
                    }
                }
            }
            ColorMetric::Hsv => {
                let query = rgb_to_hsv(color[0], color[1], color[2]);
                for (i, e) in self.entries_hsv.iter().enumerate() {
                    let d = query.distance_sq(*e);
                    if d < best_dist {
                        best_dist = d;
                        best_idx = i;
                    }
                }
            }
            ColorMetric::Cmyk => {
                let query = rgb_to_cmyk(color[0], color[1], color[2]);
                for (i, e) in self.entries_cmyk.iter().enumerate() {
                    let d = query.distance_sq(*e);
                    if d < best_dist {
                        best_dist = d;
                        best_idx = i;
                    }
                }
            }
        }

        best_idx as u8
    }
}

/// Read only the `Columns:` header of a palette file.
///
/// Stops at the first color line; returns `None` when the header is absent or
/// not a number.
pub fn get_columns(path: impl AsRef<Path>) -> Result<Option<u32>> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if let Some(value) = line.strip_prefix("Columns:") {
            return Ok(value.trim().parse().ok());
        }
        if line.starts_with(|c: char| c.is_ascii_digit()) {
            break;
        }
    }
    Ok(None)
}

fn parse_gpl(text: &str, origin: &str) -> Result<Palette> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());

    if lines.next() != Some("GIMP Palette") {
        return Err(Error::PaletteHeader {
            path: origin.to_string(),
        });
    }

    let mut name = None;
    let mut columns = None;
    let mut entries = Vec::new();

    for line in lines {
        if line.starts_with('#') {
            continue;
        }
        if let Some(value) = line.strip_prefix("Name:") {
            name = Some(value.trim().to_string());
            continue;
        }
        if let Some(value) = line.strip_prefix("Columns:") {
            match value.trim().parse::<u32>() {
                Ok(n) => columns = Some(n),
                Err(_) => warn!(origin, line, "ignoring malformed Columns header"),
            }
            continue;
        }

        match parse_color_line(line) {
            Some(entry) => entries.push(entry),
            None => warn!(origin, line, "skipping malformed palette line"),
        }
    }

    let mut palette = Palette::from_named(entries)?;
    palette.name = name;
    palette.columns = columns;
    Ok(palette)
}

fn parse_color_line(line: &str) -> Option<([u8; 3], Option<String>)> {
    let mut fields = line.split_whitespace();
    let r = fields.next()?.parse::<u8>().ok()?;
    let g = fields.next()?.parse::<u8>().ok()?;
    let b = fields.next()?.parse::<u8>().ok()?;
    let rest: Vec<&str> = fields.collect();
    let name = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };
    Some(([r, g, b], name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "GIMP Palette
Name: Sample
Columns: 4
#
  0   0   0\tBlack
255 255 255\tWhite
255   0   0 Bright Red
";

    #[test]
    fn parses_headers_and_names() {
        let p = Palette::parse(SAMPLE).unwrap();
        assert_eq!(p.name(), Some("Sample"));
        assert_eq!(p.columns(), Some(4));
        assert_eq!(p.len(), 3);
        assert_eq!(p.entries()[2], [255, 0, 0]);
        assert_eq!(p.entry_name(2), Some("Bright Red"));
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "GIMP Palette\n#\n1 2 3\n300 0 0 Overflow\nx y z\n4 5\n6 7 8 ok\n";
        let p = Palette::parse(text).unwrap();
        assert_eq!(p.entries(), vec![[1, 2, 3], [6, 7, 8]]);
    }

    #[test]
    fn missing_header_is_rejected() {
        assert!(matches!(
            Palette::parse("0 0 0\n"),
            Err(Error::PaletteHeader { .. })
        ));
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert!(matches!(
            Palette::parse("GIMP Palette\nName: none\n#\n"),
            Err(Error::EmptyPalette)
        ));
        assert!(matches!(Palette::from_rgb(&[]), Err(Error::EmptyPalette)));
    }

    #[test]
    fn nearest_prefers_first_on_ties() {
        let p = Palette::from_rgb(&[[10, 10, 10], [30, 30, 30], [10, 10, 10]]).unwrap();
        assert_eq!(p.nearest([20.0, 20.0, 20.0], ColorMetric::Rgb), 0);
        assert_eq!(p.nearest([10.0, 10.0, 10.0], ColorMetric::Hsv), 0);
    }

    #[test]
    fn exact_match_under_every_metric() {
        let colors = [[0, 0, 0], [255, 255, 255], [255, 0, 0], [0, 170, 85], [85, 85, 255]];
        let p = Palette::from_rgb(&colors).unwrap();
        for metric in [ColorMetric::Rgb, ColorMetric::Hsv, ColorMetric::Cmyk] {
            for (i, c) in colors.iter().enumerate() {
                let q = [c[0] as f32, c[1] as f32, c[2] as f32];
                assert_eq!(p.nearest(q, metric) as usize, i, "{metric:?} {c:?}");
            }
        }
    }

    #[test]
    fn full_palette_is_addressable() {
        let colors: Vec<[u8; 3]> = (0..=255u8).map(|v| [v, v, v]).collect();
        let p = Palette::from_rgb(&colors).unwrap();
        assert_eq!(p.len(), MAX_ENTRIES);
        assert_eq!(p.nearest([255.0, 255.0, 255.0], ColorMetric::Rgb), 255);
        assert!(matches!(
            Palette::from_rgb(&[colors.as_slice(), &[[1, 2, 3]]].concat()),
            Err(Error::PaletteTooLarge(257))
        ));
    }

    #[test]
    fn save_uses_nearest_names() {
        let p = Palette::from_rgb(&[[250, 5, 5], [1, 1, 1]]).unwrap();
        let names = Palette::parse(SAMPLE).unwrap();
        let text = p.to_gpl_string("Renamed", 8, Some(&names));
        assert!(text.starts_with("GIMP Palette\nName: Renamed\nColumns: 8\n#\n"));
        assert!(text.contains("250   5   5\tBright Red"));
        assert!(text.contains("  1   1   1\tBlack"));

        let plain = p.to_gpl_string("Plain", 2, None);
        assert!(plain.contains("\tIndex 0"));
    }

    #[test]
    fn gpl_text_round_trips() {
        let p = Palette::parse(SAMPLE).unwrap();
        let again = Palette::parse(&p.to_gpl_string("Sample", 4, None)).unwrap();
        assert_eq!(again.entries(), p.entries());
        assert_eq!(again.entry_name(0), Some("Black"));
        assert_eq!(again.columns(), Some(4));
    }
}
