use tracing::trace;

use crate::entity::{Entity, EntityId, EntityKind, EntityStore};
use crate::world::{GridMap, GridRay, SpatialIndex, TileKey, Vec2, SMALL};

use super::occlusion::SlopeRanges;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFilter {
    /// Living bodies that take damage.
    Attackable,
    /// Pickups, for interaction.
    Items,
}

/// Parameters of one attack or interaction sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackQuery {
    pub range: f32,
    /// Full vertical cone, in degrees.
    pub field: f32,
    /// When set, the nearest target whose centre lies this close to the aim
    /// line is accepted if nothing is struck directly.
    pub autoaim_radius: Option<f32>,
    pub targets: TargetFilter,
    /// Whether tiles hide the targets behind them.
    pub occlusion: bool,
}

impl Default for AttackQuery {
    fn default() -> Self {
        Self {
            range: 1.0,
            field: 60.0,
            autoaim_radius: None,
            targets: TargetFilter::Attackable,
            occlusion: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackHit {
    pub target: EntityId,
    /// 3D distance between the attacker's and the target's centres.
    pub distance: f32,
    /// Selected by autoaim rather than by the aim line.
    pub soft: bool,
}

/// Marches the attacker's aim line through the grid and picks the nearest
/// target it reaches.
///
/// Each tile entered adds the band of vertical slopes it hides to an occlusion
/// set. Candidates are the entities around the tile being left, tested before
/// the entered tile is merged, so a body standing in a wall's tile can still be
/// struck. A candidate is hit when its slope is inside the field, not occluded,
/// and its attack box touches the stretch of aim line marched this step.
pub fn resolve_attack(
    attacker: &Entity,
    query: &AttackQuery,
    grid: &GridMap,
    spatial: &SpatialIndex,
    entities: &EntityStore,
) -> Option<AttackHit> {
    let origin = attacker.pos;
    let forward = attacker.forward();
    let eye = attacker.center_elevation();
    let slope_limit = (query.field.to_radians() / 2.0).tan().abs();
    let mut ray = GridRay::new(origin, forward)?;
    let mut occluded = SlopeRanges::new();
    let mut best: Option<AttackHit> = None;
    let mut soft: Option<AttackHit> = None;
    let mut last_point = origin;

    while let Some(step) = ray.next() {
        let segment_end = ray.point_at(step.t.min(query.range));
        let segment = (last_point, segment_end);
        for id in spatial.around(step.previous) {
            consider(
                attacker, id, query, entities, &occluded, segment, eye, slope_limit, &mut best,
                &mut soft,
            );
        }
        last_point = segment_end;

        if step.t >= query.range || best.is_some_and(|hit| step.t >= hit.distance) {
            break;
        }
        if query.occlusion {
            occlude_tile(grid, &ray, step.tile, step.t, eye, &mut occluded);
        }
    }

    let hit = best.or_else(|| query.autoaim_radius.and(soft));
    trace!(
        attacker = attacker.id.0,
        target = hit.map(|hit| hit.target.0),
        soft = hit.is_some_and(|hit| hit.soft),
        "attack_resolved"
    );
    hit
}

#[allow(clippy::too_many_arguments)]
fn consider(
    attacker: &Entity,
    id: EntityId,
    query: &AttackQuery,
    entities: &EntityStore,
    occluded: &SlopeRanges,
    segment: (Vec2, Vec2),
    eye: f32,
    slope_limit: f32,
    best: &mut Option<AttackHit>,
    soft: &mut Option<AttackHit>,
) {
    if id == attacker.id {
        return;
    }
    let Some(other) = entities.get(&id) else {
        return;
    };
    let eligible = match query.targets {
        TargetFilter::Attackable => other.kind.attackable() && !other.is_dead(),
        TargetFilter::Items => matches!(other.kind, EntityKind::Item(_)),
    };
    if !eligible {
        return;
    }

    let plane_distance = attacker.pos.distance(other.pos);
    // A target sharing the attacker's position has no direction to aim along.
    if plane_distance <= SMALL {
        return;
    }
    let slope = match query.targets {
        TargetFilter::Attackable => center_slope(eye, other.center_elevation(), plane_distance),
        TargetFilter::Items => extent_slope(eye, other.attack_span(), plane_distance),
    };
    if slope.abs() > slope_limit {
        return;
    }
    if query.occlusion && occluded.contains(slope) {
        return;
    }

    let distance = attacker.center3().distance(other.center3());
    let candidate = AttackHit {
        target: id,
        distance,
        soft: false,
    };
    if other
        .attack_rect()
        .clip_segment(segment.0, segment.1)
        .is_some()
    {
        if best.map_or(true, |hit| distance < hit.distance) {
            *best = Some(candidate);
        }
        return;
    }

    let Some(radius) = query.autoaim_radius else {
        return;
    };
    let aim_end = attacker.pos + attacker.forward() * query.range;
    if point_segment_distance(other.pos, attacker.pos, aim_end) <= radius
        && soft.map_or(true, |hit| distance < hit.distance)
    {
        *soft = Some(AttackHit {
            soft: true,
            ..candidate
        });
    }
}

fn center_slope(eye: f32, target: f32, distance: f32) -> f32 {
    (target - eye) / distance
}

/// Slope of least magnitude that still meets the vertical span.
fn extent_slope(eye: f32, (bottom, top): (f32, f32), distance: f32) -> f32 {
    if (bottom..=top).contains(&eye) {
        return 0.0;
    }
    let distance = distance.max(SMALL);
    let low = (bottom - eye) / distance;
    let high = (top - eye) / distance;
    if low.abs() < high.abs() {
        low
    } else {
        high
    }
}

fn occlude_tile(
    grid: &GridMap,
    ray: &GridRay,
    key: TileKey,
    near: f32,
    eye: f32,
    occluded: &mut SlopeRanges,
) {
    let Some(tile) = grid.get(key) else {
        return;
    };
    if tile.semitile.is_some() {
        return;
    }
    let far = ray.next_t();
    if tile.rect.is_some()
        && tile
            .collision_rect(key)
            .clip_segment(ray.point_at(near), ray.point_at(far))
            .is_none()
    {
        return;
    }
    let near = near.max(SMALL);
    let low = ((tile.elevation - eye) / near).min((tile.elevation - eye) / far);
    let high = ((tile.top() - eye) / near).max((tile.top() - eye) / far);
    occluded.insert(low, high);
}

fn point_segment_distance(point: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let length_squared = ab.length_squared();
    if length_squared <= f32::EPSILON {
        return point.distance(a);
    }
    let t = ((point - a).dot(ab) / length_squared).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}
