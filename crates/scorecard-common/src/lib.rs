pub mod api;
pub mod classify;
pub mod dates;
pub mod error;
pub mod filters;
pub mod geo;
pub mod grades;
pub mod group;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod pac;
pub mod sentences;
pub mod sort;
pub mod upstream;
