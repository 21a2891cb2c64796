pub mod error;
pub mod observation_frame;
pub mod observation_table;
