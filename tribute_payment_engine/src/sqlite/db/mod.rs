pub mod audit;
pub mod generations;
pub mod orders;
pub mod users;
