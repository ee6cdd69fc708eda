pub mod enemy;
pub mod node;
pub mod player;
