pub mod parameters;
pub mod states;
pub mod structs;
