//! Per-pass ray accounting and optional ray-tree recording.
//!
//! A `RayStore` lives for exactly one pass invocation. It counts rays by
//! category and, when recording is enabled, keeps every cast ray as a node
//! in an arena-backed tree rooted at an origin ray (one root per eye pixel
//! or surface cell). The recursion threads an explicit `Option<NodeId>`
//! parent down each call; the arena owns all nodes, so there is no shared
//! cursor to save and restore around recursive calls.
//!
//! With recording disabled every `record_*` call is a no-op that allocates
//! nothing.

use std::fmt::Write as _;
use std::time::Duration;

use lux_core::RenderOptions;
use lux_math::Vec3;

/// Terminal state of a recorded ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayStatus {
    NoHit,
    Valid,
    Invisible,
    Overflow,
}

/// How a recorded ray was spawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayKind {
    Origin,
    Reflection,
    Refraction,
    Diffuse,
}

impl RayKind {
    fn label(self) -> &'static str {
        match self {
            RayKind::Origin => "orig",
            RayKind::Reflection => "reflect",
            RayKind::Refraction => "refract",
            RayKind::Diffuse => "diffuse",
        }
    }
}

/// Handle into a `RayStore`'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// One recorded ray. Not mutated once its subtree has finished recursing.
#[derive(Debug, Clone)]
pub struct RayNode {
    pub kind: RayKind,
    pub status: RayStatus,
    pub origin: Vec3,
    pub direction: Vec3,
    /// Remaining intensity carried by forward rays.
    pub intensity: Option<Vec3>,
    /// Whether the ray travels inside the hit object.
    pub inside: bool,
    pub hit_object: Option<String>,
    pub hit_point: Option<Vec3>,
    pub reflection: Vec<NodeId>,
    pub refraction: Vec<NodeId>,
    pub diffuse: Vec<NodeId>,
}

impl RayNode {
    fn new(kind: RayKind, origin: Vec3, direction: Vec3, intensity: Option<Vec3>) -> Self {
        Self {
            kind,
            status: RayStatus::NoHit,
            origin,
            direction,
            intensity,
            inside: false,
            hit_object: None,
            hit_point: None,
            reflection: Vec::new(),
            refraction: Vec::new(),
            diffuse: Vec::new(),
        }
    }
}

/// Identifies the origin ray a recorded tree hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootKey {
    EyePixel { x: u32, y: u32 },
    SurfaceCell { object: usize, v: u32, h: u32 },
}

/// Ray counters for one pass. Overflowed branches are not included in
/// `total`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RayCounters {
    pub total: u64,
    pub origin: u64,
    pub reflection: u64,
    pub refraction: u64,
    pub diffuse: u64,
    pub nohit: u64,
    pub invisible: u64,
    pub weak: u64,
    pub overflow: u64,
    pub valid: u64,
}

impl RayCounters {
    /// Fold another worker's counters into this one (commutative sums).
    pub fn merge(&mut self, other: &RayCounters) {
        self.total += other.total;
        self.origin += other.origin;
        self.reflection += other.reflection;
        self.refraction += other.refraction;
        self.diffuse += other.diffuse;
        self.nohit += other.nohit;
        self.invisible += other.invisible;
        self.weak += other.weak;
        self.overflow += other.overflow;
        self.valid += other.valid;
    }
}

/// Pass-local mutable context: configuration snapshot, counters and the
/// optional recording arena. Not shared across concurrently running
/// passes.
pub struct RayStore {
    pub options: RenderOptions,
    pub counters: RayCounters,
    /// Bytes spent on recorded nodes.
    pub recorded_bytes: u64,
    recording: bool,
    nodes: Vec<RayNode>,
    roots: Vec<(RootKey, NodeId)>,
}

impl RayStore {
    /// Store with recording disabled; `record_*` calls are no-ops.
    pub fn new(options: &RenderOptions) -> Self {
        Self {
            options: options.clone(),
            counters: RayCounters::default(),
            recorded_bytes: 0,
            recording: false,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Store that records the full ray tree of every origin ray.
    pub fn with_recording(options: &RenderOptions) -> Self {
        Self {
            recording: true,
            ..Self::new(options)
        }
    }

    pub fn recording(&self) -> bool {
        self.recording
    }

    fn push_node(&mut self, node: RayNode) -> NodeId {
        self.recorded_bytes += std::mem::size_of::<RayNode>() as u64;
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Record an origin ray, returning its node when recording is on.
    pub fn record_root(
        &mut self,
        key: RootKey,
        origin: Vec3,
        direction: Vec3,
        intensity: Option<Vec3>,
    ) -> Option<NodeId> {
        if !self.recording {
            return None;
        }
        let id = self.push_node(RayNode::new(RayKind::Origin, origin, direction, intensity));
        self.roots.push((key, id));
        Some(id)
    }

    /// Record a child ray under `parent`, attached to the list matching its
    /// kind. No-op when recording is off or the parent was not recorded.
    pub fn record_child(
        &mut self,
        parent: Option<NodeId>,
        kind: RayKind,
        origin: Vec3,
        direction: Vec3,
        intensity: Option<Vec3>,
        inside: bool,
    ) -> Option<NodeId> {
        if !self.recording {
            return None;
        }
        let parent = parent?;
        let mut node = RayNode::new(kind, origin, direction, intensity);
        node.inside = inside;
        let id = self.push_node(node);
        let parent_node = &mut self.nodes[parent.0 as usize];
        match kind {
            RayKind::Reflection => parent_node.reflection.push(id),
            RayKind::Refraction => parent_node.refraction.push(id),
            RayKind::Origin | RayKind::Diffuse => parent_node.diffuse.push(id),
        }
        Some(id)
    }

    pub fn mark_status(&mut self, id: Option<NodeId>, status: RayStatus) {
        if let Some(id) = id {
            self.nodes[id.0 as usize].status = status;
        }
    }

    /// Mark a recorded ray as a valid hit on `object` at `point`.
    pub fn mark_hit(&mut self, id: Option<NodeId>, object: &str, point: Vec3) {
        if let Some(id) = id {
            let node = &mut self.nodes[id.0 as usize];
            node.status = RayStatus::Valid;
            node.hit_object = Some(object.to_string());
            node.hit_point = Some(point);
        }
    }

    pub fn node(&self, id: NodeId) -> &RayNode {
        &self.nodes[id.0 as usize]
    }

    /// First recorded root for a key, if any.
    pub fn root(&self, key: RootKey) -> Option<NodeId> {
        self.roots
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, id)| *id)
    }

    /// Fold a finished worker store's counters into this one.
    pub fn merge_counters(&mut self, other: &RayStore) {
        self.counters.merge(&other.counters);
        self.recorded_bytes += other.recorded_bytes;
    }

    /// Render a recorded tree as indented text for debugging.
    pub fn dump_tree(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, id, 0);
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let node = self.node(id);
        let indent = depth * 2;
        let _ = write!(
            out,
            "{:indent$}{} {:?} from({:.3},{:.3},{:.3}) dir({:.3},{:.3},{:.3})",
            "",
            node.kind.label(),
            node.status,
            node.origin.x,
            node.origin.y,
            node.origin.z,
            node.direction.x,
            node.direction.y,
            node.direction.z,
        );
        if let Some(intensity) = node.intensity {
            let _ = write!(
                out,
                " intensity({:.4},{:.4},{:.4})",
                intensity.x, intensity.y, intensity.z
            );
        }
        match (&node.hit_object, node.hit_point) {
            (Some(name), Some(point)) => {
                let _ = writeln!(
                    out,
                    " hit[{}]({:.3},{:.3},{:.3})",
                    name, point.x, point.y, point.z
                );
            }
            _ => {
                let _ = writeln!(out, " nohit");
            }
        }
        for &child in node
            .reflection
            .iter()
            .chain(&node.refraction)
            .chain(&node.diffuse)
        {
            self.dump_node(out, child, depth + 1);
        }
    }

    /// One-line counter table for the pass statistics log.
    pub fn summary(&self, elapsed: Duration) -> String {
        let c = &self.counters;
        format!(
            "origin={} reflect={} refract={} diffuse={} nohit={} invis={} weak={} overflow={} total={} time={:.1}s mem={:.2}MB",
            c.origin,
            c.reflection,
            c.refraction,
            c.diffuse,
            c.nohit,
            c.invisible,
            c.weak,
            c.overflow,
            c.total,
            elapsed.as_secs_f64(),
            self.recorded_bytes as f64 / (1024.0 * 1024.0),
        )
    }
}
