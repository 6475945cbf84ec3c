pub mod backup;
pub mod columns;
pub mod core;
pub mod datasets;
pub mod exchange;
pub mod marks;
pub mod students;
pub mod tables;
