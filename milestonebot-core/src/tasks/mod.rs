// File: src/tasks/mod.rs

pub mod milestone_loop;
