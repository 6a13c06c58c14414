pub mod quadtree;

pub use quadtree::Plugin;
