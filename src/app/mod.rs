pub mod engagement;
pub mod feed;
pub mod generation;
pub mod identity;
pub mod media;
pub mod posts;
pub mod social;
