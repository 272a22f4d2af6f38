pub mod event;
pub mod guide;
pub mod level;
pub mod mode;
pub mod step;
pub mod tactical;
pub mod world;
