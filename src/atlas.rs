use std::time::Instant;

use crate::{
    descriptor::MaskDescriptor,
    mask::{CachedMask, atlas_grid},
    random::BufferedRandom,
    raster::{Raster, over},
    sprite::{Particle, generate_particle, render_sprite, sprite_canvas_size},
};

/// Generate a mask from a descriptor, drawing placements from a fresh
/// buffered random source sized for exactly `particles_count * 3` draws.
pub fn generate(descriptor: &MaskDescriptor) -> CachedMask {
    let mut random = BufferedRandom::new(descriptor.particles_count.max(0) as usize * 3);
    generate_with(descriptor, &mut random)
}

/// Generate a mask using the supplied random source.
///
/// Descriptor preconditions are asserted: a malformed descriptor here is a
/// caller bug, not a runtime condition.
#[tracing::instrument(skip(descriptor, random))]
pub fn generate_with(descriptor: &MaskDescriptor, random: &mut BufferedRandom) -> CachedMask {
    assert!(descriptor.frames_count > 0, "frames_count must be positive");
    assert!(
        descriptor.frame_duration > 0,
        "frame_duration must be positive"
    );
    assert!(
        descriptor.particles_count > 0,
        "particles_count must be positive"
    );
    assert!(descriptor.canvas_size > 0, "canvas_size must be positive");
    assert!(
        descriptor.particle_sprites_count > 0,
        "particle_sprites_count must be positive"
    );
    assert!(
        descriptor.particle_size_min > 0.0,
        "particle_size_min must be positive"
    );
    assert!(
        descriptor.particle_size_max >= descriptor.particle_size_min,
        "particle_size_max must be >= particle_size_min"
    );

    let frames = descriptor.frames_count;
    let (columns, rows) = atlas_grid(frames);
    let size = descriptor.canvas_size;
    let sprite_size = sprite_canvas_size(descriptor);
    let single = descriptor.single_lifetime();
    let full = descriptor.loop_duration();
    assert!(
        full > single,
        "loop duration must exceed the single-particle lifetime"
    );

    let started = Instant::now();

    let particles: Vec<Particle> = (0..descriptor.particles_count)
        .map(|index| generate_particle(descriptor, index, random))
        .collect();
    let sprites: Vec<Raster> = (0..descriptor.particle_sprites_count)
        .map(|index| render_sprite(descriptor, index, sprite_size))
        .collect();

    let mut image = Raster::new(columns * size, rows * size);
    let mut frame = 0;
    'grid: for row in 0..rows {
        for column in 0..columns {
            let origin = (column * size, row * size);
            let time = i64::from(frame) * descriptor.frame_duration;
            for particle in &particles {
                let sprite = &sprites[particle.sprite_index];
                // Paint the particle's current appearance and, additively
                // wrapped by the loop duration, the appearance that crosses
                // the loop boundary back into early frames.
                paint_at(&mut image, origin, size, descriptor, sprite, particle, time - particle.start);
                paint_at(&mut image, origin, size, descriptor, sprite, particle, time + full - particle.start);
            }
            frame += 1;
            if frame == frames {
                break 'grid;
            }
        }
    }

    tracing::debug!(
        frames,
        particles = descriptor.particles_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generated noise mask atlas"
    );

    CachedMask::new(image, frames, descriptor.frame_duration, size)
}

fn paint_at(
    image: &mut Raster,
    origin: (i32, i32),
    size: i32,
    descriptor: &MaskDescriptor,
    sprite: &Raster,
    particle: &Particle,
    local: i64,
) {
    let single = descriptor.single_lifetime();
    if local <= 0 || local >= single {
        return;
    }
    let opacity = opacity_at(descriptor, local, single) as f32;

    let sprite_size = sprite.width();
    blit(image, origin, size, sprite, particle.x, particle.y, opacity);
    // Toroidal duplication: a footprint crossing the right or bottom tile
    // edge repeats shifted by -size on the crossed axis (both at a corner),
    // so the tile stays seamless edge-to-edge.
    if particle.x + sprite_size > size {
        blit(image, origin, size, sprite, particle.x - size, particle.y, opacity);
        if particle.y + sprite_size > size {
            blit(image, origin, size, sprite, particle.x, particle.y - size, opacity);
            blit(image, origin, size, sprite, particle.x - size, particle.y - size, opacity);
        }
    } else if particle.y + sprite_size > size {
        blit(image, origin, size, sprite, particle.x, particle.y - size, opacity);
    }
}

/// Linear envelope over a particle's lifetime: rises across the fade-in,
/// holds at 1 while shown, falls across the fade-out.
fn opacity_at(descriptor: &MaskDescriptor, local: i64, single: i64) -> f64 {
    if local < descriptor.particle_fade_in {
        local as f64 / descriptor.particle_fade_in as f64
    } else if local > single - descriptor.particle_fade_out {
        (single - local) as f64 / descriptor.particle_fade_out as f64
    } else {
        1.0
    }
}

/// Composite `sprite` into the frame tile at `origin`, clipped to the tile.
fn blit(
    image: &mut Raster,
    origin: (i32, i32),
    size: i32,
    sprite: &Raster,
    dx: i32,
    dy: i32,
    opacity: f32,
) {
    for sy in 0..sprite.height() {
        let ty = dy + sy;
        if ty < 0 || ty >= size {
            continue;
        }
        for sx in 0..sprite.width() {
            let tx = dx + sx;
            if tx < 0 || tx >= size {
                continue;
            }
            let src = sprite.pixel(sx, sy);
            if src[3] == 0 {
                continue;
            }
            let x = origin.0 + tx;
            let y = origin.1 + ty;
            let dst = image.pixel(x, y);
            image.put_pixel(x, y, over(dst, src, opacity));
        }
    }
}
