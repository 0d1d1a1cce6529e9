use tracing::debug;

use crate::config::Config;
use crate::feature::{Candidate, Role, TrackerState};
use crate::my_types::*;

/// Outcome of one assignment pass
#[derive(Clone, Debug, PartialEq)]
pub enum Assignment {
    /// Too few candidates this frame, the state was left as it was
    InsufficientCandidates { found: usize },
    /// Roles that took a candidate, with the candidate index
    Updated(Vec<(Role, usize)>),
}

/// Greedy per-role assignment of candidates against the previous estimates.
///
/// Each role independently takes its cheapest candidate, so one candidate
/// may serve several roles. This is a single scan, not an optimal matching,
/// and exact ties go to the earlier candidate.
pub struct RoleTracker {
    width: f64,
    sentinel: f64,
    min_candidates: usize,
    refine_hands: bool,
}

impl RoleTracker {
    pub fn new(shape: ImageShape, config: &Config) -> Self {
        let (w, h) = (shape.0 as f64, shape.1 as f64);
        RoleTracker {
            width: w,
            sentinel: (w * w + h * h) / config.sentinel_divisor,
            // a single region can never be told apart from its role
            min_candidates: config.min_candidates.max(2),
            refine_hands: config.refine_hands,
        }
    }

    /// Cost above which a candidate never takes a role
    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// Distance to the previous estimate plus a side bias. Wide regions are
    /// cheaper, which keeps small noise blobs from stealing a role.
    pub fn cost(&self, role: Role, candidate: &Candidate, state: &TrackerState) -> f64 {
        let p = candidate.location;
        let distance = (p - state.get(role).location).norm();
        let bias = match role {
            Role::Face => p.y,
            Role::LeftHand => p.x,
            Role::RightHand => self.width - p.x,
        };
        distance + bias - candidate.extent()
    }

    /// Rows are candidates, columns follow `Role::ALL`
    pub fn cost_matrix(&self, candidates: &[Candidate], state: &TrackerState) -> Vec<[f64; 3]> {
        candidates
            .iter()
            .map(|candidate| Role::ALL.map(|role| self.cost(role, candidate, state)))
            .collect()
    }

    pub fn assign(&self, candidates: &[Candidate], state: &mut TrackerState) -> Assignment {
        if candidates.len() < self.min_candidates {
            debug!(found = candidates.len(), "too few candidates, keeping previous estimates");
            return Assignment::InsufficientCandidates {
                found: candidates.len(),
            };
        }

        let costs = self.cost_matrix(candidates, state);
        let mut best_cost = [self.sentinel; 3];
        let mut best_index: [Option<usize>; 3] = [None; 3];
        for (i, row) in costs.iter().enumerate() {
            for role in Role::ALL {
                let r = role.index();
                if row[r] < best_cost[r] {
                    best_cost[r] = row[r];
                    best_index[r] = Some(i);
                }
            }
        }

        // the face goes first, the hands are refined against fresh shoulders
        let mut updated = vec![];
        for role in Role::ALL {
            let Some(i) = best_index[role.index()] else {
                continue;
            };
            let candidate = &candidates[i];
            let location = match state.shoulder_for(role) {
                Some(shoulder) if self.refine_hands => farthest_point(&candidate.region, shoulder)
                    .unwrap_or(candidate.location),
                _ => candidate.location,
            };
            state.set(role, location, candidate.bounds);
            updated.push((role, i));
        }
        debug!(?updated, "role assignment");
        Assignment::Updated(updated)
    }
}

/// Point of `points` farthest from `from`, the first one on ties
fn farthest_point(points: &[Vector2d], from: Vector2d) -> Option<Vector2d> {
    let mut best: Option<(Vector2d, f64)> = None;
    for &p in points {
        let d = (p - from).norm_squared();
        match best {
            Some((_, b)) if d <= b => {}
            _ => best = Some((p, d)),
        }
    }
    best.map(|(p, _)| p)
}
