//! different utility modules used throughout the project
/// integer prompts on stdin for the interactive run
pub mod console;
/// tiny module to save trajectories into csv files
pub mod csv_export;
/// terminal + file logger initialization
pub mod logging;
