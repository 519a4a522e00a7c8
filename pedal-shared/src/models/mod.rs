pub mod events;
pub mod travel;
