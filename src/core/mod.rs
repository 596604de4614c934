pub mod context;
pub mod goals;
pub mod leaves;
pub mod section;
pub mod step;
pub mod world;
