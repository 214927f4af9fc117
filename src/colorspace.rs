/// HSV color representation.
///
/// All components are in [0, 1]. Hue is normalized to [0, 1) rather than
/// degrees so it shares a scale with saturation and value when measuring
/// distances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f32,
    pub s: f32,
    pub v: f32,
}

impl Hsv {
    pub const fn new(h: f32, s: f32, v: f32) -> Self {
        Self { h, s, v }
    }

    /// Squared distance with hue treated as an angle: 0.95 and 0.05 are 0.1 apart.
    pub fn distance_sq(self, other: Self) -> f32 {
        let raw = (self.h - other.h).abs();
        let dh = raw.min(1.0 - raw);
        let ds = self.s - other.s;
        let dv = self.v - other.v;
        dh * dh + ds * ds + dv * dv
    }
}

/// CMYK color representation, all components in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cmyk {
    pub c: f32,
    pub m: f32,
    pub y: f32,
    pub k: f32,
}

impl Cmyk {
    pub const fn new(c: f32, m: f32, y: f32, k: f32) -> Self {
        Self { c, m, y, k }
    }

    /// Squared Euclidean distance over all four components.
    pub fn distance_sq(self, other: Self) -> f32 {
        let dc = self.c - other.c;
        let dm = self.m - other.m;
        let dy = self.y - other.y;
        let dk = self.k - other.k;
        dc * dc + dm * dm + dy * dy + dk * dk
    }
}

#[inline]
fn unit(c: f32) -> f32 {
    c.clamp(0.0, 255.0) / 255.0
}

#[inline]
fn to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// RGB (0..=255 per channel, clamped) to HSV.
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> Hsv {
    let (r, g, b) = (unit(r), unit(g), unit(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    if max <= 0.0 {
        return Hsv::new(0.0, 0.0, 0.0);
    }
    let s = delta / max;
    if delta <= 0.0 {
        return Hsv::new(0.0, 0.0, v);
    }

    let sector = if max == r {
        (g - b) / delta
    } else if max == g {
        2.0 + (b - r) / delta
    } else {
        4.0 + (r - g) / delta
    };
    let h = (sector / 6.0).rem_euclid(1.0);
    // rem_euclid can return exactly 1.0 for tiny negative inputs
    let h = if h >= 1.0 { 0.0 } else { h };

    Hsv::new(h, s, v)
}

/// HSV to RGB. Hue wraps, saturation and value are clamped.
pub fn hsv_to_rgb(hsv: Hsv) -> [u8; 3] {
    let h = hsv.h.rem_euclid(1.0);
    let s = hsv.s.clamp(0.0, 1.0);
    let v = hsv.v.clamp(0.0, 1.0);

    if s <= 0.0 {
        let c = to_u8(v);
        return [c, c, c];
    }

    let scaled = h * 6.0;
    let sector = (scaled.floor() as i32).rem_euclid(6);
    let f = scaled - scaled.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match sector {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    [to_u8(r), to_u8(g), to_u8(b)]
}

/// RGB (0..=255 per channel, clamped) to CMYK. Black is `K = 1` with no ink.
pub fn rgb_to_cmyk(r: f32, g: f32, b: f32) -> Cmyk {
    let (r, g, b) = (unit(r), unit(g), unit(b));
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 {
        return Cmyk::new(0.0, 0.0, 0.0, 1.0);
    }
    let inv = 1.0 - k;
    Cmyk::new((inv - r) / inv, (inv - g) / inv, (inv - b) / inv, k)
}

/// CMYK to RGB, components clamped to [0, 1].
pub fn cmyk_to_rgb(cmyk: Cmyk) -> [u8; 3] {
    let k = cmyk.k.clamp(0.0, 1.0);
    let channel = |ink: f32| to_u8((1.0 - ink.clamp(0.0, 1.0)) * (1.0 - k));
    [channel(cmyk.c), channel(cmyk.m), channel(cmyk.y)]
}
