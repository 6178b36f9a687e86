pub mod avatar_badge;
pub mod chat_area;
pub mod guidelines;
pub mod header;
pub mod input_bar;
