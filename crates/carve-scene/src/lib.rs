//! # Carve Scene
//!
//! JSON persistence for [`SceneTree`](carve_core::tree::SceneTree)s.
//!
//! A scene file holds one node object or an array of them. Documents are
//! validated in full, and `ref` nodes resolved, before a single node is
//! built, so a bad file never leaves a half-imported tree behind.
//!
//! ## Example
//!
//! ```rust
//! use carve_scene::{load_str, to_json_string};
//!
//! let tree = load_str(
//!     r#"{
//!         "type": "difference",
//!         "subtractIndices": [1],
//!         "children": [
//!             { "type": "box", "size": 2.0 },
//!             { "type": "sphere", "radius": 1.3 }
//!         ]
//!     }"#,
//!     ".",
//! )?;
//! assert_eq!(tree.len(), 4);
//!
//! let json = to_json_string(&tree)?;
//! assert!(json.contains("subtractIndices"));
//! # Ok::<(), carve_scene::SceneError>(())
//! ```

pub mod export;
pub mod load;
pub mod schema;

mod error;

pub use error::{Result, SceneError};
pub use export::{export_document, save_file, to_json_string};
pub use load::{import_into, load_file, load_str};
pub use schema::{Extent, NodeDoc, NodeType, RotationDoc, TransformDoc};
