//! Rendering boundary
//!
//! The crate draws nothing. Each frame the host asks for a [`Frame`] and
//! replays its primitives on whatever 2D surface it owns.

pub mod primitives;
pub mod shapes;

pub use primitives::{Color, Fill, Frame, Hud, Outline, Primitive};

use crate::session::Session;

/// Background wash, low alpha so moving particles leave trails
const WASH: Color = Color::Rgba {
    r: 10,
    g: 14,
    b: 39,
    a: 0.1,
};

/// Snapshot the session as draw primitives, back to front: vortex, accretion
/// disk, hazards, fog, particles
pub fn build_frame(session: &Session) -> Frame {
    let field = session.field();
    let well = session.well();
    let viewport = *session.viewport();
    let hazards = session.hazards();

    let mut primitives = shapes::vortex(well, field.stripes(), field.vortex_angle);
    primitives.extend(shapes::accretion_disk(well, field.accretion_angle));
    for hazard in hazards.wells() {
        primitives.extend(shapes::hazard_well(hazard));
    }
    if let Some(drain) = hazards.drain() {
        primitives.push(shapes::drain_marker(drain));
    }
    primitives.extend(field.fog_spots().iter().map(shapes::fog_spot));
    primitives.extend(
        field
            .particles()
            .iter()
            .filter_map(|p| shapes::particle(p, &viewport)),
    );

    let progression = session.progression();
    Frame {
        width: viewport.width,
        height: viewport.height,
        wash: WASH,
        primitives,
        combo_text: session.combo_text().cloned(),
        hud: Hud {
            phase: session.phase(),
            countdown: session.countdown(),
            score: progression.score(),
            level: progression.level(),
            progress_fraction: progression.progress_fraction(),
            remaining_secs: progression.remaining_secs(),
            ultimate_meter: progression.ultimate_meter(),
            ultimate_ready: progression.is_ultimate_ready(),
            show_level_up: progression.show_level_up(),
            currency: session.wallet().currency,
        },
    }
}
