pub mod driver;
pub mod lifecycle;
pub mod model;
pub mod resolver;
