//! Multiclass GBDT (Gradient Boosted Decision Tree) inference
//!
//! - **One tree per class per round**: trees are stored round-major and each
//!   carries the class it scores
//! - **Softmax output**: raw class scores start from per-class init scores
//! - **Canonical serialization**: sorted JSON keys for reproducible hashing
//! - **Blake3 hashing**: the artifact sidecar pins the exact file bytes
//!
//! # Usage
//!
//! ```rust,no_run
//! use disaster_severity_core::gbdt::Model;
//!
//! let model = Model::load("disaster_model.json").unwrap();
//! let class = model.predict(&[5.0, 1000.0, 200.0, 3.0, 10.0]).unwrap();
//! println!("severity: {}", u8::from(class));
//! ```

pub mod model;
pub mod tree;

pub use model::{argmax, hash_path, softmax, Model, ModelError, MODEL_VERSION, NUM_CLASSES};
pub use tree::{Node, Tree};
