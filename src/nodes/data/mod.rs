//! Data nodes: literal values, colors and image descriptors

pub mod color;
pub mod constant;
pub mod image;

pub use color::ColorNodeFactory;
pub use constant::ValueNodeFactory;
pub use image::{image_depth_def, NewImageBehavior, NewImageNodeFactory};
