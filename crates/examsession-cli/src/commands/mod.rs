pub mod papers;
pub mod run;
