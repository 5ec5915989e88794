pub mod trainings;
pub mod users;
pub mod webhooks;
