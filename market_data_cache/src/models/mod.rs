pub mod bar;
pub mod roster;
pub mod series;
pub mod window;
