pub mod ai;
pub mod class;
pub mod combat;
pub mod entity;
pub mod geometry;
pub mod inventory;
pub mod physics;
pub mod rules;
pub mod tile;
