pub mod id;
pub mod token;
pub mod tree;
