pub mod foreach;
pub mod package_set;
pub mod workspace;
