//! Core scene types shared across all modules.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn one() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }

    /// Drop the vertical component.
    pub fn xz(&self) -> Point {
        Point::new(self.x, self.z)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// A point on the floor plane.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.z)
    }
}

/// A directed floor-plane segment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(&self.end)
    }

    /// Point at parameter `t` in `[0, 1]`.
    pub fn lerp(&self, t: f64) -> Point {
        Point::new(
            self.start.x + (self.end.x - self.start.x) * t,
            self.start.z + (self.end.z - self.start.z) * t,
        )
    }
}

/// Footprint of a placed object: four floor corners plus its height.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OrientedBox {
    pub corners: [Point; 4],
    pub height: f64,
}

impl OrientedBox {
    pub fn new(corners: [Point; 4], height: f64) -> Self {
        Self { corners, height }
    }

    pub fn center(&self) -> Point {
        let (sx, sz) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sz), p| (sx + p.x, sz + p.z));
        Point::new(sx / 4.0, sz / 4.0)
    }
}

// ---------------------------------------------------------------------------
// Room and performer
// ---------------------------------------------------------------------------

/// Axis-aligned room. Every placed footprint must stay inside it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Room {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
    pub height: f64,
}

impl Default for Room {
    fn default() -> Self {
        Self {
            min_x: -4.95,
            max_x: 4.95,
            min_z: -4.95,
            max_z: 4.95,
            height: 3.0,
        }
    }
}

impl Room {
    pub fn new(min_x: f64, max_x: f64, min_z: f64, max_z: f64, height: f64) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
            height,
        }
    }

    pub fn centroid(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_z + self.max_z) / 2.0,
        )
    }

    /// The room shrunk by `margin` on every side.
    pub fn inset(&self, margin: f64) -> Room {
        Room {
            min_x: self.min_x + margin,
            max_x: self.max_x - margin,
            min_z: self.min_z + margin,
            max_z: self.max_z - margin,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PerformerPose {
    pub position: Vec3,
    /// Yaw in degrees, clockwise from +Z.
    pub rotation_y: f64,
}

impl Default for PerformerPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -4.5),
            rotation_y: 0.0,
        }
    }
}

impl PerformerPose {
    pub fn new(x: f64, z: f64, rotation_y: f64) -> Self {
        Self {
            position: Vec3::new(x, 0.0, z),
            rotation_y,
        }
    }

    /// Unit vector the performer is facing.
    pub fn forward(&self) -> Point {
        let rad = self.rotation_y.to_radians();
        Point::new(rad.sin(), rad.cos())
    }
}

// ---------------------------------------------------------------------------
// Catalog definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Moveable,
    Pickupable,
    Receptacle,
    Openable,
}

/// One precomputed push table: where the object is after each step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementOption {
    pub start_y: f64,
    pub force: Vec3,
    pub position_by_step: Vec<f64>,
}

impl MovementOption {
    /// Speed ranking used by the trajectory ordering rule.
    pub fn acceleration(&self, mass: f64) -> f64 {
        self.force.x.abs() / mass
    }
}

/// Internal volume of a receptacle, relative to its origin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Cavity {
    pub position: Vec3,
    pub dimensions: Vec3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectDefinition {
    pub shape: String,
    pub size: String,
    pub mass: f64,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub materials: Vec<String>,
    pub dimensions: Vec3,
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub position_y: f64,
    #[serde(default = "Vec3::one")]
    pub scale: Vec3,
    #[serde(default)]
    pub rotation: Vec3,
    #[serde(default)]
    pub movement_options: Vec<MovementOption>,
    #[serde(default)]
    pub cavities: Vec<Cavity>,
}

impl ObjectDefinition {
    /// A plain box definition with no attributes.
    pub fn boxed(shape: &str, dimensions: Vec3) -> Self {
        Self {
            shape: shape.to_string(),
            size: "custom".to_string(),
            mass: 1.0,
            attributes: Vec::new(),
            materials: Vec::new(),
            dimensions,
            offset: Vec3::zero(),
            position_y: dimensions.y / 2.0,
            scale: Vec3::one(),
            rotation: Vec3::zero(),
            movement_options: Vec::new(),
            cavities: Vec::new(),
        }
    }

    pub fn has(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }

    pub fn is_receptacle(&self) -> bool {
        !self.cavities.is_empty()
    }

    /// Human-readable label for logs and error messages.
    pub fn label(&self) -> String {
        format!("{} ({})", self.shape, self.size)
    }
}

// ---------------------------------------------------------------------------
// Placed instances and their schedules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Target,
    Distractor,
    Confusor,
    Receptacle,
    Occluder,
    Background,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShowEvent {
    pub step_begin: u32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<OrientedBox>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HideEvent {
    pub step_begin: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TeleportEvent {
    pub step_begin: u32,
    pub step_end: u32,
    pub position: Vec3,
}

/// A vector applied every step in `[step_begin, step_end]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StepVector {
    pub step_begin: u32,
    pub step_end: u32,
    pub vector: Vec3,
}

/// The trajectory a moving object was given.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChosenMovement {
    pub start_y: f64,
    pub force: Vec3,
    /// Absolute X per step, truncated at the visible cutoff.
    pub position_by_step: Vec<f64>,
    /// Trajectory indices at which a paired occluder hides the object.
    #[serde(default)]
    pub occluder_indices: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectInstance {
    pub id: String,
    pub shape: String,
    pub size: String,
    pub role: Role,
    pub mass: f64,
    pub dimensions: Vec3,
    pub offset: Vec3,
    /// Y of the object's origin when resting on the floor.
    pub resting_y: f64,
    #[serde(default)]
    pub materials: Vec<String>,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub kinematic: bool,
    #[serde(default)]
    pub structure: bool,
    pub shows: Vec<ShowEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hides: Vec<HideEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teleports: Vec<TeleportEvent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub moves: Vec<StepVector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rotates: Vec<StepVector>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forces: Vec<StepVector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement: Option<ChosenMovement>,
}

impl ObjectInstance {
    /// Copy a definition into the scene at `position`/`rotation_y`.
    pub fn from_definition(
        id: String,
        definition: &ObjectDefinition,
        role: Role,
        position: Vec3,
        rotation_y: f64,
        bounds: Option<OrientedBox>,
    ) -> Self {
        let rotation = Vec3::new(
            definition.rotation.x,
            definition.rotation.y + rotation_y,
            definition.rotation.z,
        );
        Self {
            id,
            shape: definition.shape.clone(),
            size: definition.size.clone(),
            role,
            mass: definition.mass,
            dimensions: definition.dimensions,
            offset: definition.offset,
            resting_y: definition.position_y,
            materials: definition.materials.iter().take(1).cloned().collect(),
            attributes: definition.attributes.clone(),
            kinematic: false,
            structure: false,
            shows: vec![ShowEvent {
                step_begin: 0,
                position,
                rotation,
                scale: definition.scale,
                bounds,
            }],
            hides: Vec::new(),
            teleports: Vec::new(),
            moves: Vec::new(),
            rotates: Vec::new(),
            forces: Vec::new(),
            parent: None,
            children: Vec::new(),
            movement: None,
        }
    }

    /// The first show event. Every instance has at least one.
    pub fn first_show(&self) -> &ShowEvent {
        &self.shows[0]
    }

    pub fn first_show_mut(&mut self) -> &mut ShowEvent {
        &mut self.shows[0]
    }

    pub fn position(&self) -> Vec3 {
        self.first_show().position
    }

    pub fn bounds(&self) -> Option<&OrientedBox> {
        self.first_show().bounds.as_ref()
    }

    pub fn step_begin(&self) -> u32 {
        self.first_show().step_begin
    }
}

// ---------------------------------------------------------------------------
// Generator configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base seed for every scene set.
    pub seed: u64,
    /// Whole-attempt restarts before construction aborts.
    pub max_attempts: u32,
    /// Candidate samples per placement.
    pub placement_tries: u32,
    pub room: Room,
    /// Half-width of the performer's collision square.
    pub performer_radius: f64,
    /// Chance that a forward teleport is a hide-then-reappear.
    pub teleport_delay_chance: f64,
    /// Chance that similar-adjacent pairs share a receptacle.
    pub containment_chance: f64,
    /// Keep background furniture out of intuitive-physics scenes.
    pub skip_background: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_attempts: 20,
            placement_tries: 100,
            room: Room::default(),
            performer_radius: 0.05,
            teleport_delay_chance: 0.5,
            containment_chance: 0.5,
            skip_background: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Statistics (for monitoring)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GeneratorStats {
    pub sets_built: u64,
    pub variants_emitted: u64,
    pub attempts: u64,
    pub placement_failures: u64,
    pub containment_failures: u64,
    pub occluder_conflicts: u64,
    pub event_failures: u64,
    pub aborted: u64,
}
