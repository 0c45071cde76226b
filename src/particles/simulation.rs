use super::config::{ParticleSimConfig, PARTICLE_PALETTE};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: [f32; 2],
    pub velocity: [f32; 2],
    pub size: f32,
    pub color: &'static str,
}

impl Particle {
    /// Advance one frame. A component whose projected position would leave
    /// `[0, extent)` is reflected before the move, so the particle stays
    /// inside the canvas.
    pub fn update(&mut self, width: f32, height: f32) {
        let extents = [width, height];
        for axis in 0..2 {
            let extent = extents[axis];
            let projected = self.position[axis] + self.velocity[axis];
            if projected < 0.0 || projected >= extent {
                self.velocity[axis] = -self.velocity[axis];
            }
            let reflected = self.position[axis] + self.velocity[axis];
            // A canvas narrower than one step leaves nowhere to move.
            if (0.0..extent).contains(&reflected) {
                self.position[axis] = reflected;
            }
        }
    }
}

/// Seeded uniform source in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct ParticleRng {
    seed: u32,
    counter: u32,
}

impl ParticleRng {
    pub fn new(seed: u32) -> Self {
        Self { seed, counter: 0 }
    }

    pub fn next_f32(&mut self) -> f32 {
        let value = hash01(self.seed.wrapping_add(self.counter.wrapping_mul(0x9E37_79B9)));
        self.counter = self.counter.wrapping_add(1);
        value
    }
}

#[derive(Debug, Clone)]
pub struct ParticleBatch {
    pub particles: Vec<Particle>,
    width: f32,
    height: f32,
}

impl ParticleBatch {
    /// Scatter `config.particle_count` particles uniformly over the canvas.
    pub fn seed(config: ParticleSimConfig, width: f32, height: f32, rng: &mut ParticleRng) -> Self {
        let particles = (0..config.particle_count)
            .map(|_| {
                let x = inside(rng.next_f32() * width, width);
                let y = inside(rng.next_f32() * height, height);
                let size = rng.next_f32() * config.size_range + config.min_size;
                let vx = rng.next_f32() * config.max_speed * 2.0 - config.max_speed;
                let vy = rng.next_f32() * config.max_speed * 2.0 - config.max_speed;
                let pick = (rng.next_f32() * PARTICLE_PALETTE.len() as f32) as usize;
                Particle {
                    position: [x, y],
                    velocity: [vx, vy],
                    size,
                    color: PARTICLE_PALETTE[pick.min(PARTICLE_PALETTE.len() - 1)],
                }
            })
            .collect();
        Self {
            particles,
            width,
            height,
        }
    }

    pub fn step(&mut self) {
        for particle in &mut self.particles {
            particle.update(self.width, self.height);
        }
    }

    pub fn bounds(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

/// `value` can round up to `extent` in f32.
fn inside(value: f32, extent: f32) -> f32 {
    if value < extent {
        value
    } else {
        0.0
    }
}

fn hash01(seed: u32) -> f32 {
    let mut x = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    x ^= x >> 16;
    x = x.wrapping_mul(2_246_822_519);
    x ^= x >> 13;
    // 24 bits keep the result strictly below 1.0.
    (x >> 8) as f32 / (1u32 << 24) as f32
}
