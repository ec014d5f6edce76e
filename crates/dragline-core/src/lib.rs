//! Dragline Core Library
//!
//! Tool dispatch and constrained dragging for interactive 3D/2D editors:
//! tools compete for one stream of view events through an ordered chain, and
//! drag-based tools share a restricter + snapper pipeline.

pub mod chain;
pub mod config;
pub mod connector;
pub mod controller;
pub mod drag;
pub mod grid;
pub mod input;
pub mod math;
pub mod notifier;
pub mod pick;
pub mod tool;
pub mod toolbox;

pub use chain::ToolChain;
pub use config::{ConfigError, ConfigResult, DraglineConfig, SuppressionConfig};
pub use connector::{ConnectorSettings, Picker, ViewConnector};
pub use controller::{
    DragPolicy, DropPolicy, DropTracker, GestureTracker, GroupHooks, KeyPolicy, MousePolicy, PickingPolicy,
    RenderBatch, RenderContext, RenderPolicy, ToolController, ToolControllerGroup,
};
pub use drag::{
    DragInfo, DragRestricter, DragResult, DragSnapper, DragState, DragUpdate, RestrictedDrag, RestrictedDragPolicy,
    RestrictedDragTracker,
};
pub use grid::{Grid, GridSettings};
pub use input::{InputState, Modifiers, MouseButton};
pub use math::{Line3, Plane3, Ray3};
pub use notifier::{Notifier, Subscription};
pub use pick::{Hit, HitQuery, HitType, PickResult};
pub use tool::{Tool, ToolContext, ToolId, ToolRequest};
pub use toolbox::{ToolBox, ToolBoxEvent};
