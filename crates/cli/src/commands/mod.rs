pub mod serve;
pub mod talk;
