pub mod alerts_controller;
pub mod check_controller;
pub mod home_controller;
