//! Constrained dragging: restricters, snappers and the drag lifecycle.

mod policy;
mod restricter;
mod snapper;

pub use policy::{
    DragInfo, DragResult, DragState, DragUpdate, RestrictedDrag, RestrictedDragPolicy, RestrictedDragTracker,
};
pub use restricter::{CircleRestricter, DragRestricter, LineRestricter, PlaneRestricter, SurfaceRestricter};
pub use snapper::{
    AbsoluteSnapper, CircleSnapper, DeltaSnapper, DragSnapper, HitNormalPlane, IdentitySnapper, LineSnapMode,
    LineSnapper, MultiSnapper, SurfacePlane, SurfaceSnapper,
};
