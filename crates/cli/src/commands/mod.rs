pub mod breakpoint;
pub mod migrate;
pub mod rollback;
pub mod seed;
pub mod status;
