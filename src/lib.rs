pub mod controller;
pub mod diff;
pub mod headers;
pub mod model;
pub mod resolver;
pub mod share;
