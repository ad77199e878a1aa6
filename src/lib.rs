//! Sideline - live game-session intelligence from console log output
//!
//! Rebuilds a consistent picture of "who is in my game, on which team,
//! doing what" from the one-directional stream of lines a game client
//! writes to its console log, and enriches that picture with Steam Web
//! API data (profile summaries, ban history, playtime, friends) fetched
//! in the background.
//!
//! The embedding application supplies the line parser and pushes raw
//! log chunks into [`world::World`]; it must also call
//! [`world::World::update`] regularly to drain completed API batches.

pub mod config;
pub mod steam;
pub mod util;
pub mod world;
