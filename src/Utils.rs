//! different utility modules used throughout the project
/// logger initialisation (terminal + optional file)
pub mod logger;
