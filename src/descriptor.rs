use crate::error::{VeilError, VeilResult};

/// Parameters for procedural mask generation. Durations are in milliseconds,
/// sizes in pixels.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MaskDescriptor {
    pub frames_count: i32,
    pub frame_duration: i64,
    pub canvas_size: i32, // square frame tile
    pub particles_count: i32,
    pub particle_sprites_count: i32,
    pub particle_size_min: f64,
    pub particle_size_max: f64,
    pub particle_fade_in: i64,
    pub particle_shown: i64,
    pub particle_fade_out: i64,
}

impl MaskDescriptor {
    /// The fixed descriptor behind the process-wide default mask.
    pub fn default_mask() -> Self {
        Self {
            frames_count: 60,
            frame_duration: 33,
            canvas_size: 100,
            particles_count: 2000,
            particle_sprites_count: 5,
            particle_size_min: 1.5,
            particle_size_max: 2.0,
            particle_fade_in: 200,
            particle_shown: 0,
            particle_fade_out: 200,
        }
    }

    /// One full animation loop, `frames_count * frame_duration`.
    pub fn loop_duration(&self) -> i64 {
        i64::from(self.frames_count) * self.frame_duration
    }

    /// Lifetime of a single particle appearance.
    pub fn single_lifetime(&self) -> i64 {
        self.particle_fade_in + self.particle_shown + self.particle_fade_out
    }

    /// Boundary validation for descriptors arriving from configuration.
    /// The generator itself asserts the same conditions: a malformed
    /// descriptor reaching it is a caller bug, not a runtime condition.
    pub fn validate(&self) -> VeilResult<()> {
        if self.frames_count <= 0 {
            return Err(VeilError::validation("frames_count must be positive"));
        }
        if self.frame_duration <= 0 {
            return Err(VeilError::validation("frame_duration must be positive"));
        }
        if self.canvas_size <= 0 {
            return Err(VeilError::validation("canvas_size must be positive"));
        }
        if self.particles_count <= 0 {
            return Err(VeilError::validation("particles_count must be positive"));
        }
        if self.particle_sprites_count <= 0 {
            return Err(VeilError::validation(
                "particle_sprites_count must be positive",
            ));
        }
        if self.particle_size_min <= 0.0 {
            return Err(VeilError::validation("particle_size_min must be positive"));
        }
        if self.particle_size_max < self.particle_size_min {
            return Err(VeilError::validation(
                "particle_size_max must be >= particle_size_min",
            ));
        }
        if self.particle_fade_in < 0 || self.particle_shown < 0 || self.particle_fade_out < 0 {
            return Err(VeilError::validation(
                "particle durations must not be negative",
            ));
        }
        if self.loop_duration() <= self.single_lifetime() {
            return Err(VeilError::validation(
                "loop duration must exceed the single-particle lifetime",
            ));
        }
        Ok(())
    }
}
