pub mod palette;
pub mod presentation;
pub mod scale;

pub use presentation::{assemble_view, EdgeView, GraphView, NodeView, ViewInputs};
pub use scale::{scale_sizes, SizeBounds, SizeMap};
