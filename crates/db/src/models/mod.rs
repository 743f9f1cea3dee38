pub mod artifact;
pub mod unit_run;
