use serde::Serialize;

use crate::error::PoseError;
use crate::my_types::*;
use crate::regions::Region;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BoundingBox {
    pub top_left: Vector2d,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn point(location: Vector2d) -> Self {
        BoundingBox {
            top_left: location,
            width: 0.,
            height: 0.,
        }
    }

    pub fn midpoint(&self) -> Vector2d {
        self.top_left + Vector2d::new(self.width, self.height) * 0.5
    }
}

/// A detected region of the current frame, a hypothesis for some role
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Midpoint of the bounding box
    pub location: Vector2d,
    pub bounds: BoundingBox,
    /// Ordered outer boundary, may be empty
    pub region: Vec<Vector2d>,
}

impl Candidate {
    /// Bounding size used to favour large regions
    pub fn extent(&self) -> f64 {
        self.bounds.width
    }
}

impl TryFrom<&Region> for Candidate {
    type Error = PoseError;

    fn try_from(region: &Region) -> Result<Self, PoseError> {
        let (width, height) = (region.width(), region.height());
        if region.area == 0 || width == 0 || height == 0 {
            return Err(PoseError::DegenerateRegion {
                area: region.area,
                width,
                height,
            });
        }
        let bounds = BoundingBox {
            top_left: Vector2d::new(region.x_min as f64, region.y_min as f64),
            width: width as f64,
            height: height as f64,
        };
        Ok(Candidate {
            location: bounds.midpoint(),
            bounds,
            region: region
                .boundary
                .iter()
                .map(|&(x, y)| Vector2d::new(x as f64, y as f64))
                .collect(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Face,
    LeftHand,
    RightHand,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Face, Role::LeftHand, Role::RightHand];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Persistent location of one role
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RoleEstimate {
    pub role: Role,
    pub location: Vector2d,
    /// Bounds of the region last assigned to the role
    pub bounds: BoundingBox,
}

/// Points that follow from the face estimate
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DerivedPoints {
    pub neck: Vector2d,
    pub left_shoulder: Vector2d,
    pub right_shoulder: Vector2d,
}

impl DerivedPoints {
    /// The neck hangs two face widths below the face box corner, the
    /// shoulders sit half a face width outside the face box on either side.
    pub fn from_face(face: &RoleEstimate) -> Self {
        let w = face.bounds.width;
        let neck = face.bounds.top_left + Vector2d::new(0., 2. * w);
        DerivedPoints {
            neck,
            left_shoulder: neck + Vector2d::new(-w / 2., 0.),
            right_shoulder: neck + Vector2d::new(3. * w / 2., 0.),
        }
    }
}

/// Everything the tracker carries from one frame to the next
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrackerState {
    estimates: [RoleEstimate; 3],
    derived: DerivedPoints,
}

impl TrackerState {
    /// Face at the top centre, hands at the left and right edges
    pub fn new(shape: ImageShape) -> Self {
        let (w, h) = (shape.0 as f64, shape.1 as f64);
        let face_width = w / 8.;
        let face = RoleEstimate {
            role: Role::Face,
            location: Vector2d::new(w / 2., 0.),
            bounds: BoundingBox {
                top_left: Vector2d::new((w - face_width) / 2., 0.),
                width: face_width,
                height: face_width,
            },
        };
        let hand = |role, location| RoleEstimate {
            role,
            location,
            bounds: BoundingBox::point(location),
        };
        TrackerState {
            estimates: [
                face,
                hand(Role::LeftHand, Vector2d::new(0., h / 2.)),
                hand(Role::RightHand, Vector2d::new(w, h / 2.)),
            ],
            derived: DerivedPoints::from_face(&face),
        }
    }

    pub fn get(&self, role: Role) -> &RoleEstimate {
        &self.estimates[role.index()]
    }

    pub fn face(&self) -> &RoleEstimate {
        self.get(Role::Face)
    }

    pub fn left_hand(&self) -> &RoleEstimate {
        self.get(Role::LeftHand)
    }

    pub fn right_hand(&self) -> &RoleEstimate {
        self.get(Role::RightHand)
    }

    pub fn derived(&self) -> &DerivedPoints {
        &self.derived
    }

    /// Replace the estimate of `role`, keeping the derived points in step
    /// with the face.
    pub fn set(&mut self, role: Role, location: Vector2d, bounds: BoundingBox) {
        self.estimates[role.index()] = RoleEstimate {
            role,
            location,
            bounds,
        };
        if role == Role::Face {
            self.derived = DerivedPoints::from_face(&self.estimates[role.index()]);
        }
    }

    /// Shoulder on the same side of the image as the hand
    pub fn shoulder_for(&self, role: Role) -> Option<Vector2d> {
        match role {
            Role::Face => None,
            Role::LeftHand => Some(self.derived.left_shoulder),
            Role::RightHand => Some(self.derived.right_shoulder),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_from_region() {
        let region = Region {
            area: 200,
            x_min: 60,
            y_min: 10,
            x_max: 99,
            y_max: 39,
            boundary: vec![(60, 10), (99, 10)],
        };
        let candidate = Candidate::try_from(&region).unwrap();
        assert_eq!(candidate.location, Vector2d::new(80., 25.));
        assert_eq!(candidate.extent(), 40.);
        assert_eq!(candidate.region[1], Vector2d::new(99., 10.));
    }

    #[test]
    fn test_empty_region_is_degenerate() {
        let region = Region {
            area: 0,
            x_min: 3,
            y_min: 3,
            x_max: 3,
            y_max: 3,
            boundary: vec![],
        };
        assert!(matches!(
            Candidate::try_from(&region),
            Err(PoseError::DegenerateRegion { area: 0, .. })
        ));
    }

    #[test]
    fn test_derived_points_follow_face() {
        let mut state = TrackerState::new((160, 120));
        let bounds = BoundingBox {
            top_left: Vector2d::new(60., 10.),
            width: 40.,
            height: 30.,
        };
        state.set(Role::Face, bounds.midpoint(), bounds);
        let derived = state.derived();
        assert_eq!(derived.neck, Vector2d::new(60., 90.));
        assert_eq!(derived.left_shoulder, Vector2d::new(40., 90.));
        assert_eq!(derived.right_shoulder, Vector2d::new(120., 90.));

        // zero width collapses everything onto the neck
        let bounds = BoundingBox::point(Vector2d::new(7., 9.));
        state.set(Role::Face, bounds.midpoint(), bounds);
        let derived = state.derived();
        assert_eq!(derived.neck, Vector2d::new(7., 9.));
        assert_eq!(derived.left_shoulder, derived.neck);
        assert_eq!(derived.right_shoulder, derived.neck);
    }

    #[test]
    fn test_hand_update_keeps_derived_points() {
        let mut state = TrackerState::new((160, 120));
        let before = *state.derived();
        let location = Vector2d::new(3., 4.);
        state.set(Role::LeftHand, location, BoundingBox::point(location));
        assert_eq!(*state.derived(), before);
        assert_eq!(state.left_hand().location, location);
    }

    #[test]
    fn test_initial_state() {
        let state = TrackerState::new((160, 120));
        assert_eq!(state.face().location, Vector2d::new(80., 0.));
        assert_eq!(state.left_hand().location, Vector2d::new(0., 60.));
        assert_eq!(state.right_hand().location, Vector2d::new(160., 60.));
    }
}
