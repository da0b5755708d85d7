//! Interactive 3D manipulation handles for grouped scene nodes.
//!
//! The crate owns the full lifecycle of a handle drag: hit-testing the handle
//! overlay, turning 2D pointer motion into a 3D translation or rotation,
//! fanning that delta out to every handle of the affected groups, and writing
//! parent-space-corrected local transforms back to the scene. The host is
//! responsible only for wiring pointer events to the [`engine::Manipulator`]
//! and for providing the scene, picking, viewport and overlay collaborators.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | The manipulation controller and its apply-and-propagate step |
//! | [`registry`] | Group/handle arena and hierarchical handle fan-out |
//! | [`handle`] | Handle kinds, handle instances and overlay placements |
//! | [`input`] | Controller state machine, drag sessions and deltas |
//! | [`math`] | Rays, planes, signed angles and pivot rotations |
//! | [`scene`] | Scene store trait and the in-memory reference store |
//! | [`viewport`] | Screen points, unprojection and camera viewports |
//! | [`pick`] | Handle picking trait and a queued test picker |
//! | [`overlay`] | Fire-and-forget handle visual commands |
//! | [`tracked`] | Caller-registered points that follow the transform |
//! | [`events`] | Started/updated/ended notifications and subscribers |
//! | [`snapshot`] | Serializable manipulation session state |
//! | [`config`] | Controller tuning loaded from the environment |
//! | [`error`] | Error enums and the shared [`error::ErrorCode`] trait |
//! | [`consts`] | Shared numeric constants |

pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod events;
pub mod handle;
pub mod input;
pub mod math;
pub mod overlay;
pub mod pick;
pub mod registry;
pub mod scene;
pub mod snapshot;
pub mod tracked;
pub mod viewport;

pub use engine::Manipulator;
pub use error::ManipulationError;
