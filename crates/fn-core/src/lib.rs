pub mod anchor;
pub mod config;
pub mod geometry;
pub mod id;
pub mod mapper;
pub mod page;
pub mod reconcile;
pub mod record;
pub mod resolver;

pub use anchor::{Anchor, Corners, Projection, SizeLocks, capture_anchor};
pub use config::{JumpThresholds, ReconcileConfig};
pub use geometry::{DiagramPoint, ScreenMatrix};
pub use id::{DiagramId, NoteId, OverlayId};
pub use mapper::CoordinateMapper;
pub use reconcile::{
    JumpKind, OverlayState, Placement, Reconciler, Sizing, StaleReason, TickOutcome, TickReport,
};
pub use record::{NoteDraft, NoteRecord};
pub use resolver::{ResolvedTransform, TransformResolver};

// Re-export kurbo primitives so downstream crates agree on one version
pub use kurbo::{Point, Rect, Size, Vec2};
