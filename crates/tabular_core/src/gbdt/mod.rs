//! Gradient boosted decision tree inference
//!
//! Models are serialized as canonical JSON:
//!
//! ```json
//! {
//!   "bias": 4504.3,
//!   "feature_names": ["season_1", "temp"],
//!   "trees": [
//!     {
//!       "nodes": [
//!         {"id": 0, "left": 1, "right": 2, "feature_idx": 1, "threshold": 0.41, "leaf": null},
//!         {"id": 1, "left": -1, "right": -1, "feature_idx": -1, "threshold": 0.0, "leaf": -812.5},
//!         {"id": 2, "left": -1, "right": -1, "feature_idx": -1, "threshold": 0.0, "leaf": 640.0}
//!       ],
//!       "weight": 0.1
//!     }
//!   ],
//!   "version": 1
//! }
//! ```

pub mod model;
pub mod tree;

pub use model::{GbdtModel, MODEL_VERSION};
pub use tree::{Node, Tree};
