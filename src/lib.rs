pub mod cli;
pub mod database_ops;
pub mod dedup;
pub mod normalization;
pub mod product;

pub mod util {
    pub mod env;
}
