/// 41 Water: simulation core for a side-scrolling action game.
///
/// `sim::step::step` advances a `sim::world::WorldState` by one tick from
/// an `InputFrame`. Rendering and device input live in the binary's `ui`
/// module and only read the world.

pub mod config;
pub mod domain;
pub mod error;
pub mod sim;
