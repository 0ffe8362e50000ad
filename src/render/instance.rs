use bytemuck::{Pod, Zeroable};
use glam::Vec2;

use crate::boid::ScoutGroup;

/// Unbiased boids.
pub const NEUTRAL_COLOR: u32 = 0xFFFF_FFFF;
/// Scouts leaning right.
pub const RIGHT_COLOR: u32 = 0xFF00_00FF;
/// Scouts leaning left.
pub const LEFT_COLOR: u32 = 0x0000_FFFF;

/// Per-instance data uploaded to GPU each frame.
/// Stride = 12 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BoidInstance {
    /// World position (x, y).
    pub position: [f32; 2],
    /// RGBA color packed as u32.
    pub color: u32,
}

impl BoidInstance {
    pub fn new(pos: Vec2, group: ScoutGroup) -> Self {
        Self {
            position: pos.into(),
            color: group_color(group),
        }
    }
}

pub fn group_color(group: ScoutGroup) -> u32 {
    match group {
        ScoutGroup::None => NEUTRAL_COLOR,
        ScoutGroup::Right => RIGHT_COLOR,
        ScoutGroup::Left => LEFT_COLOR,
    }
}
