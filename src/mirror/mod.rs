pub mod audit;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod folders;
pub mod inbound;
pub mod index;
pub mod paths;
pub mod render;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;
pub mod warn;
pub mod watcher;
