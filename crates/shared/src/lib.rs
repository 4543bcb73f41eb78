mod favorites;
mod messages;

pub use favorites::FavoriteSet;
pub use messages::*;
