pub mod integral;
