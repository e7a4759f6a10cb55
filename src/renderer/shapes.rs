//! Primitive generation per entity

use std::f32::consts::{PI, TAU};

use glam::Vec2;

use super::primitives::{Color, Fill, Outline, Primitive};
use crate::Viewport;
use crate::sim::{DrainHazard, FogShape, FogSpot, GravityWell, Particle, Shape, Stripe};

const ACCRETION_RINGS: usize = 3;
const ACCRETION_RING_SPACING: f32 = 15.0;
const PARTICLE_GLOW: f32 = 10.0;

/// Void at the well plus its rotating stripe field
pub fn vortex(well: &GravityWell, stripes: &[Stripe], rotation: f32) -> Vec<Primitive> {
    let mut out = Vec::with_capacity(stripes.len() + 1);
    out.push(Primitive::Void {
        center: well.pos,
        radius: well.radius,
    });
    out.extend(stripes.iter().map(|s| {
        let start = s.angle + rotation;
        Primitive::Arc {
            center: well.pos,
            radius: s.radius,
            start,
            end: start + s.length,
            width: s.width,
            color: Color::Hsla {
                h: s.hue(),
                s: 100.0,
                l: 70.0,
                a: s.alpha,
            },
        }
    }));
    out
}

/// Three partial rings around the horizon, outer rings spin faster
pub fn accretion_disk(well: &GravityWell, angle: f32) -> impl Iterator<Item = Primitive> + '_ {
    (0..ACCRETION_RINGS).map(move |i| {
        let i = i as f32;
        let start = angle * (1.0 + i * 0.5);
        Primitive::Arc {
            center: well.pos,
            radius: well.radius + 5.0 + i * ACCRETION_RING_SPACING,
            start,
            end: start + PI * 1.5,
            width: 1.0 + i * 0.5,
            color: Color::Rgba {
                r: 255,
                g: 255,
                b: 255,
                a: 0.05 + i * 0.03,
            },
        }
    })
}

/// Area-denial well: void plus a warning rim
pub fn hazard_well(well: &GravityWell) -> [Primitive; 2] {
    [
        Primitive::Void {
            center: well.pos,
            radius: well.radius,
        },
        Primitive::Arc {
            center: well.pos,
            radius: well.radius + 4.0,
            start: 0.0,
            end: TAU,
            width: 2.0,
            color: Color::Rgba {
                r: 255,
                g: 60,
                b: 60,
                a: 0.6,
            },
        },
    ]
}

pub fn drain_marker(drain: &DrainHazard) -> Primitive {
    let core = Color::Rgba {
        r: 180,
        g: 0,
        b: 255,
        a: 0.9,
    };
    Primitive::Shape {
        outline: Outline::Circle,
        center: drain.pos,
        extent: drain.radius * 2.0,
        rotation: 0.0,
        fill: Fill::Radial {
            inner: core,
            outer: Color::Transparent,
            radius: drain.radius,
        },
        alpha: 1.0,
        glow: PARTICLE_GLOW,
    }
}

pub fn fog_spot(spot: &FogSpot) -> Primitive {
    let outline = match spot.shape {
        FogShape::Circle => Outline::Circle,
        FogShape::Triangle => Outline::Triangle,
        FogShape::Rectangle => Outline::Rectangle,
    };
    Primitive::Shape {
        outline,
        center: spot.pos,
        extent: spot.size,
        rotation: spot.rotation,
        fill: Fill::Radial {
            inner: Color::Hex(spot.color),
            outer: Color::Transparent,
            radius: spot.size / 2.0,
        },
        alpha: spot.alpha.max(0.0),
        glow: 0.0,
    }
}

/// Projected particle; `None` when nothing would show
pub fn particle(p: &Particle, viewport: &Viewport) -> Option<Primitive> {
    if p.alpha <= 0.0 {
        return None;
    }
    let projected = p.project(viewport);
    if projected.size <= 0.0 {
        return None;
    }
    // Circles are sized by radius, polygons by side
    let (outline, extent) = match p.shape.unwrap_or_default() {
        Shape::Circle => (Outline::Circle, projected.size * 2.0),
        Shape::Square => (Outline::Square, projected.size),
        Shape::Triangle => (Outline::Triangle, projected.size),
    };
    Some(Primitive::Shape {
        outline,
        center: projected.pos,
        extent,
        rotation: 0.0,
        fill: Fill::Solid(Color::Hex(p.color)),
        alpha: p.alpha.min(1.0),
        glow: PARTICLE_GLOW,
    })
}

/// Screen-space centers of every shape primitive
pub fn centers(primitives: &[Primitive]) -> impl Iterator<Item = Vec2> + '_ {
    primitives.iter().filter_map(|p| match p {
        Primitive::Shape { center, .. } => Some(*center),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_vortex_starts_with_void() {
        let mut rng = Pcg32::seed_from_u64(1);
        let well = GravityWell::new(Vec2::new(10.0, 20.0), 50.0, Vec2::ZERO);
        let stripes: Vec<Stripe> = (0..5).map(|_| Stripe::new(&mut rng, 100.0)).collect();
        let prims = vortex(&well, &stripes, 0.25);
        assert_eq!(prims.len(), 6);
        assert_eq!(
            prims[0],
            Primitive::Void {
                center: Vec2::new(10.0, 20.0),
                radius: 50.0
            }
        );
        let Primitive::Arc { start, .. } = prims[1] else {
            panic!("expected arc");
        };
        assert!((start - (stripes[0].angle + 0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_accretion_rings_spread_out() {
        let well = GravityWell::new(Vec2::ZERO, 50.0, Vec2::ZERO);
        let radii: Vec<f32> = accretion_disk(&well, 0.0)
            .map(|p| match p {
                Primitive::Arc { radius, .. } => radius,
                _ => 0.0,
            })
            .collect();
        assert_eq!(radii, vec![55.0, 70.0, 85.0]);
    }

    #[test]
    fn test_particle_projection() {
        let mut rng = Pcg32::seed_from_u64(2);
        let vp = Viewport::new(800.0, 600.0);
        let mut p = Particle::ambient(&mut rng, &vp);
        p.pos = Vec3::new(400.0, 300.0, 500.0);
        p.base_size = 4.0;
        let Some(Primitive::Shape { center, extent, outline, .. }) = particle(&p, &vp) else {
            panic!("expected shape");
        };
        assert_eq!(center, Vec2::new(400.0, 300.0));
        assert_eq!(outline, Outline::Circle);
        // Half scale at z = focal length, doubled for a circle's extent
        assert!((extent - 4.0).abs() < 1e-5);

        p.alpha = 0.0;
        assert!(particle(&p, &vp).is_none());
    }
}
