use crate::{descriptor::MaskDescriptor, random::BufferedRandom, raster::Raster};

/// One particle placement, fixed for the lifetime of a mask.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Particle {
    /// Start time within the loop, in milliseconds.
    pub start: i64,
    pub sprite_index: usize,
    pub x: i32,
    pub y: i32,
}

pub(crate) fn generate_particle(
    descriptor: &MaskDescriptor,
    index: i32,
    random: &mut BufferedRandom,
) -> Particle {
    Particle {
        start: i64::from(index) * descriptor.loop_duration()
            / i64::from(descriptor.particles_count),
        sprite_index: random.index(descriptor.particle_sprites_count) as usize,
        x: random.index(descriptor.canvas_size),
        y: random.index(descriptor.canvas_size),
    }
}

/// Sprite canvas edge: the maximum particle size plus a margin so the
/// anti-aliased rounded-rect edge is not clipped.
pub(crate) fn sprite_canvas_size(descriptor: &MaskDescriptor) -> i32 {
    2 + descriptor.particle_size_max.ceil() as i32
}

/// Width/height of one sprite variant. Variants below the midpoint taper
/// width from max toward min while height stays at min; variants above the
/// midpoint taper height while width stays at min.
pub(crate) fn sprite_dimensions(descriptor: &MaskDescriptor, index: i32) -> (f64, f64) {
    let count = descriptor.particle_sprites_count;
    let middle = count / 2;
    let min = descriptor.particle_size_min;
    let delta = descriptor.particle_size_max - min;
    let width = if index < middle {
        min + delta * f64::from(middle - index) / f64::from(middle)
    } else {
        min
    };
    let height = if index > middle {
        min + delta * f64::from(index - middle) / f64::from(count - 1 - middle)
    } else {
        min
    };
    (width, height)
}

pub(crate) fn render_sprite(descriptor: &MaskDescriptor, index: i32, size: i32) -> Raster {
    assert!(
        index >= 0 && index < descriptor.particle_sprites_count,
        "sprite variant index out of range"
    );

    let (width, height) = sprite_dimensions(descriptor, index);
    let radius = descriptor.particle_size_min / 2.0;

    let mut raster = Raster::new(size, size);
    for y in 0..size {
        for x in 0..size {
            let alpha = coverage(f64::from(x), f64::from(y), 1.0, 1.0, width, height, radius);
            if alpha > 0 {
                raster.put_pixel(x, y, [alpha, alpha, alpha, alpha]); // premultiplied white
            }
        }
    }
    raster
}

const SUBSAMPLES: i32 = 4;

/// Anti-aliased coverage of one pixel against a rounded rect, by uniform
/// subsampling of the pixel area.
fn coverage(px: f64, py: f64, x0: f64, y0: f64, width: f64, height: f64, radius: f64) -> u8 {
    let step = 1.0 / f64::from(SUBSAMPLES);
    let mut hits = 0u32;
    for sy in 0..SUBSAMPLES {
        for sx in 0..SUBSAMPLES {
            let sample_x = px + (f64::from(sx) + 0.5) * step;
            let sample_y = py + (f64::from(sy) + 0.5) * step;
            if inside_rounded_rect(sample_x, sample_y, x0, y0, width, height, radius) {
                hits += 1;
            }
        }
    }
    let total = (SUBSAMPLES * SUBSAMPLES) as u32;
    ((hits * 255 + total / 2) / total) as u8
}

fn inside_rounded_rect(
    px: f64,
    py: f64,
    x0: f64,
    y0: f64,
    width: f64,
    height: f64,
    radius: f64,
) -> bool {
    if px < x0 || px > x0 + width || py < y0 || py > y0 + height {
        return false;
    }
    // Closest point of the radius-inset inner rect; corner test is a circle.
    let cx = px.clamp(x0 + radius, x0 + width - radius);
    let cy = py.clamp(y0 + radius, y0 + height - radius);
    let dx = px - cx;
    let dy = py - cy;
    dx * dx + dy * dy <= radius * radius
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(sprites: i32, min: f64, max: f64) -> MaskDescriptor {
        MaskDescriptor {
            particle_sprites_count: sprites,
            particle_size_min: min,
            particle_size_max: max,
            ..MaskDescriptor::default_mask()
        }
    }

    #[test]
    fn variant_extremes_taper_in_opposite_axes() {
        let descriptor = descriptor(5, 2.0, 6.0);

        let (w0, h0) = sprite_dimensions(&descriptor, 0);
        assert_eq!((w0, h0), (6.0, 2.0)); // widest

        let (w2, h2) = sprite_dimensions(&descriptor, 2);
        assert_eq!((w2, h2), (2.0, 2.0)); // midpoint is min x min

        let (w4, h4) = sprite_dimensions(&descriptor, 4);
        assert_eq!((w4, h4), (2.0, 6.0)); // tallest
    }

    #[test]
    fn single_variant_is_min_square() {
        let descriptor = descriptor(1, 2.0, 6.0);
        assert_eq!(sprite_dimensions(&descriptor, 0), (2.0, 2.0));
    }

    #[test]
    fn sprite_center_is_opaque_and_corners_clear() {
        let descriptor = descriptor(1, 4.0, 4.0);
        let size = sprite_canvas_size(&descriptor);
        assert_eq!(size, 6);

        let sprite = render_sprite(&descriptor, 0, size);
        // Rect spans (1,1)..(5,5) with radius 2: the center is covered, the
        // canvas corners are outside the shape entirely.
        assert_eq!(sprite.pixel(3, 3)[3], 255);
        assert_eq!(sprite.pixel(0, 0)[3], 0);
        assert_eq!(sprite.pixel(5, 5)[3], 0);
    }

    #[test]
    fn sprite_is_grayscale_premultiplied() {
        let descriptor = descriptor(3, 2.0, 4.0);
        let size = sprite_canvas_size(&descriptor);
        let sprite = render_sprite(&descriptor, 1, size);
        for px in sprite.pixels() {
            assert!(px[0] == px[1] && px[1] == px[2] && px[2] == px[3]);
        }
    }

    #[test]
    fn phase_starts_are_evenly_spaced() {
        let descriptor = MaskDescriptor {
            particles_count: 4,
            frames_count: 8,
            frame_duration: 50,
            ..MaskDescriptor::default_mask()
        };
        let mut random = BufferedRandom::from_words(vec![0; 12]);
        let starts: Vec<i64> = (0..4)
            .map(|i| generate_particle(&descriptor, i, &mut random).start)
            .collect();
        assert_eq!(starts, vec![0, 100, 200, 300]);
    }
}
