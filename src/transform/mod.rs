pub mod casing;
