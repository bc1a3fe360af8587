/// Linear RGB radiance.
pub type Radiance = rgb::RGB<f32>;

pub const BLACK: Radiance = Radiance {
    r: 0.0,
    g: 0.0,
    b: 0.0,
};

pub const WHITE: Radiance = Radiance {
    r: 1.0,
    g: 1.0,
    b: 1.0,
};

/// Componentwise product, used for filtering radiance through an albedo.
pub fn modulate(a: Radiance, b: Radiance) -> Radiance {
    Radiance {
        r: a.r * b.r,
        g: a.g * b.g,
        b: a.b * b.b,
    }
}

pub fn is_black(c: Radiance) -> bool {
    c.r == 0.0 && c.g == 0.0 && c.b == 0.0
}

/// Largest channel, used as the luminance proxy for emission tests.
pub fn max_channel(c: Radiance) -> f32 {
    c.r.max(c.g).max(c.b)
}
