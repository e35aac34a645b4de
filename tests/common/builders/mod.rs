pub mod computer;
