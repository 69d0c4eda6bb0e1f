pub mod pushup;
