//! Collision geometry and resolution.
//!
//! This module handles the pairwise rules between cells:
//! - Soft overlap correction between siblings (same owner)
//! - Merge eligibility between siblings
//! - Absorption between cells of different owners

use glam::DVec2;

/// Distance substituted for coincident centers so the contact normal stays finite.
pub const MIN_CONTACT_DISTANCE: f64 = 0.0001;

/// Geometry of a pair of circles.
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Unit vector from the first center toward the second (zero if coincident).
    pub normal: DVec2,
    /// Center distance, never below `MIN_CONTACT_DISTANCE`.
    pub distance: f64,
    /// Sum of radii.
    pub reach: f64,
}

impl Contact {
    /// How far the circles interpenetrate (0 when apart).
    #[inline]
    pub fn overlap(&self) -> f64 {
        (self.reach - self.distance).max(0.0)
    }

    #[inline]
    pub fn is_colliding(&self) -> bool {
        self.distance < self.reach
    }
}

/// Check contact between two circles.
#[inline]
pub fn check_contact(a_pos: DVec2, a_radius: f64, b_pos: DVec2, b_radius: f64) -> Contact {
    let delta = b_pos - a_pos;
    let raw = delta.length();
    let distance = if raw > 0.0 { raw } else { MIN_CONTACT_DISTANCE };
    Contact {
        normal: delta / distance,
        distance,
        reach: a_radius + b_radius,
    }
}

/// Position and velocity corrections for a sibling contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Added to the second cell's position and subtracted from the first's.
    pub push: DVec2,
    /// Added to the second cell's velocity and subtracted from the first's.
    pub impulse: DVec2,
}

/// Soft separation of two overlapping siblings.
///
/// Each cell moves half of `overlap * stiffness` along the contact normal, and
/// `1 - damping` of the relative speed along the normal is cancelled, split
/// evenly between the two.
pub fn separate(
    contact: &Contact,
    a_vel: DVec2,
    b_vel: DVec2,
    stiffness: f64,
    damping: f64,
) -> Option<Separation> {
    if !contact.is_colliding() {
        return None;
    }
    let overlap = contact.overlap() * stiffness;
    let push = contact.normal * overlap * 0.5;

    // Negative while the pair is closing
    let rel_normal = (b_vel - a_vel).dot(contact.normal);
    let correction = rel_normal * (1.0 - damping);
    let impulse = -contact.normal * correction * 0.5;

    Some(Separation { push, impulse })
}

/// Whether `attacker` absorbs `victim` (different owners).
///
/// The attacker's own radius is compared against the raw center distance,
/// not the sum of radii, and it must exceed the victim by `ratio`.
#[inline]
pub fn can_absorb(attacker_radius: f64, victim_radius: f64, distance: f64, ratio: f64) -> bool {
    distance < attacker_radius && attacker_radius > victim_radius * ratio
}

/// Whether two siblings may merge: both past the merge cooldown and overlapping.
#[inline]
pub fn can_merge(a_age_ms: f64, b_age_ms: f64, merge_time_ms: f64, distance: f64, reach: f64) -> bool {
    a_age_ms > merge_time_ms && b_age_ms > merge_time_ms && distance < reach
}
